//! Annotated dataset input: validated [`Record`]s read from CSV.

mod reader;
mod record;

pub use reader::{Dataset, REQUIRED_COLUMNS};
pub use record::{Record, Sentiment};
