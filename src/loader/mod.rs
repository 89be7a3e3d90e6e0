//! Batched, partial-failure tolerant loading of records into a backend.

mod bulk;
mod outcome;
mod resources;

pub use bulk::{BulkLoader, batch_count};
pub use outcome::LoadOutcome;
pub use resources::MemorySampler;
