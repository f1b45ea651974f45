mod checkpoint;
mod publications;

pub use checkpoint::CheckpointStore;
pub use publications::PublicationStore;
