mod document;
mod report;

pub use document::{document_filename, write_document};
pub use report::print_report;
