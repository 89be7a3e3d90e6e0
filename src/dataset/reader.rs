use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{info, warn};

use crate::core::{BenchError, RunContext};

use super::record::{RawRow, Record};

pub const REQUIRED_COLUMNS: [&str; 14] = [
    "ids",
    "target",
    "date",
    "flag",
    "user",
    "text",
    "cleaned_text",
    "textblob_sentiment",
    "vader_sentiment",
    "textblob_polarity",
    "vader_compound",
    "original_sentiment",
    "comparison_textblob",
    "comparison_vader",
];

/// Records read from the annotated dataset, with row-level accounting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

impl Dataset {
    pub fn read(path: &Path, ctx: &RunContext) -> Result<Dataset, BenchError> {
        let file = File::open(path).map_err(|e| {
            BenchError::DatasetError(format!("opening {}: {}", path.display(), e))
        })?;
        let dataset = Self::from_reader(file, ctx)?;
        info!(
            run_id = ctx.run_id();
            "Loaded {} rows from {} ({} dropped)",
            dataset.rows_read,
            path.display(),
            dataset.rows_dropped
        );
        Ok(dataset)
    }

    /// Parse CSV from any reader. Rows failing validation are dropped and
    /// logged; a missing required column fails the whole read.
    pub fn from_reader<R: Read>(reader: R, ctx: &RunContext) -> Result<Dataset, BenchError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = rdr.headers()?.clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();
        if !missing.is_empty() {
            return Err(BenchError::DatasetError(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut dataset = Dataset::default();
        for (line, row) in rdr.deserialize::<RawRow>().enumerate() {
            dataset.rows_read += 1;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(run_id = ctx.run_id(); "Dropping row {}: {}", line + 1, e);
                    dataset.rows_dropped += 1;
                    continue;
                }
            };
            match Record::try_from(row) {
                Ok(record) => dataset.records.push(record),
                Err(reason) => {
                    warn!(run_id = ctx.run_id(); "Dropping row {}: {}", line + 1, reason);
                    dataset.rows_dropped += 1;
                }
            }
        }
        Ok(dataset)
    }
}
