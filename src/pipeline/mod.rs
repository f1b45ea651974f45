mod backfill;
mod coordinator;

pub use backfill::BackfillScanner;
pub use coordinator::{IngestionCoordinator, Outcome};
