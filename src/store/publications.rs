use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Publication;

const DATABASE_FILE: &str = "news_database.json";

/// Append-only collection of article and message-analysis records, persisted
/// as a single JSON array.
///
/// The whole collection is rewritten on each append, via a temp file renamed
/// into place so a failed write never leaves a partially written database.
/// No two article records share a URL.
pub struct PublicationStore {
    path: PathBuf,
    records: Vec<Publication>,
    urls: HashSet<String>,
}

impl PublicationStore {
    pub fn open(publications_dir: &Path) -> Self {
        let path = publications_dir.join(DATABASE_FILE);
        let records = Self::load(&path);
        let urls = records
            .iter()
            .filter_map(|r| r.url().map(str::to_string))
            .collect();
        Self {
            path,
            records,
            urls,
        }
    }

    fn load(path: &Path) -> Vec<Publication> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("Could not read publications {:?}: {}", path, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Corrupt publications database {:?}, starting fresh: {}", path, e);
                Vec::new()
            }
        }
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Publication] {
        &self.records
    }

    /// Appends a message's record batch and rewrites the database in one
    /// durable operation. On failure the batch stays in memory (and the error
    /// is returned) but nothing partial reaches disk.
    pub fn append_batch(&mut self, batch: Vec<Publication>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        for record in batch {
            if let Some(url) = record.url() {
                self.urls.insert(url.to_string());
            }
            self.records.push(record);
        }

        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                AppError::Storage(format!("failed to write {:?}: {}", self.path, e))
            })
    }
}
