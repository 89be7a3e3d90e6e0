use log::{debug, info, warn};

use crate::backend::Session;
use crate::core::{BenchError, RunContext};
use crate::dataset::Record;

use super::{LoadOutcome, MemorySampler};

/// How many rejected records of a partial batch are spelled out in the log.
const LOGGED_RECORD_ERRORS: usize = 5;

/// Number of batches `total` records split into at `batch_size` each.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        0
    } else {
        total.div_ceil(batch_size)
    }
}

/// Writes records to a session in fixed-size, independent batches.
pub struct BulkLoader<'a> {
    batch_size: usize,
    memory_sample_every: usize,
    ctx: &'a RunContext,
}

impl<'a> BulkLoader<'a> {
    pub fn new(batch_size: usize, ctx: &'a RunContext) -> Result<Self, BenchError> {
        if batch_size == 0 {
            return Err(BenchError::InvalidArgument(
                "batch_size must be a positive integer".into(),
            ));
        }
        Ok(Self {
            batch_size,
            memory_sample_every: 10,
            ctx,
        })
    }

    /// Sample memory on the first batch and every `every` batches after it.
    pub fn with_memory_sampling(mut self, every: usize) -> Self {
        self.memory_sample_every = every.max(1);
        self
    }

    /// Load `records` in order. Missing entries (`None`) are skipped and
    /// not counted as failures. Rejected records are counted and the load
    /// continues; a batch that cannot be submitted at all aborts the load.
    pub async fn load<S, I, R>(&self, session: &mut S, records: I) -> Result<LoadOutcome, BenchError>
    where
        S: Session + ?Sized,
        I: IntoIterator<Item = R>,
        R: Into<Option<Record>>,
    {
        let mut outcome = LoadOutcome::default();
        let mut valid = Vec::new();
        for record in records {
            match record.into() {
                Some(record) => valid.push(record),
                None => outcome.skipped += 1,
            }
        }

        let total_batches = batch_count(valid.len(), self.batch_size);
        info!(
            run_id = self.ctx.run_id();
            "Attempting to insert {} valid records in {} batches of up to {}",
            valid.len(),
            total_batches,
            self.batch_size
        );
        if valid.is_empty() {
            return Ok(outcome);
        }

        let mut sampler = MemorySampler::new();
        for (index, batch) in valid.chunks(self.batch_size).enumerate() {
            let number = index + 1;
            let write = session
                .insert_batch(batch)
                .await
                .map_err(|cause| BenchError::BatchFatal {
                    batch: number,
                    cause,
                })?;

            if write.inserted > batch.len() {
                warn!(
                    run_id = self.ctx.run_id();
                    "Batch {}/{} reported {} inserted for {} records, clamping",
                    number,
                    total_batches,
                    write.inserted,
                    batch.len()
                );
            }
            outcome.record_batch(batch.len(), write.inserted);
            if write.is_partial() || write.inserted < batch.len() {
                let failed = batch.len().saturating_sub(write.inserted);
                warn!(
                    run_id = self.ctx.run_id();
                    "Batch {}/{} partial failure: {} of {} records rejected",
                    number,
                    total_batches,
                    failed,
                    batch.len()
                );
                for err in write.errors.iter().take(LOGGED_RECORD_ERRORS) {
                    warn!(
                        run_id = self.ctx.run_id();
                        "  record {} (tweet {}): {}",
                        err.index,
                        err.tweet_id,
                        err.reason
                    );
                }
            } else {
                debug!(
                    run_id = self.ctx.run_id();
                    "Batch {}/{} inserted {} records",
                    number,
                    total_batches,
                    write.inserted
                );
            }

            if index % self.memory_sample_every == 0 {
                if let Some(mb) = sampler.resident_mb() {
                    info!(run_id = self.ctx.run_id(); "Memory usage: {:.2} MB", mb);
                }
            }
        }

        info!(
            run_id = self.ctx.run_id();
            "Import completed: {} records inserted, {} failed, {} skipped",
            outcome.inserted,
            outcome.failed,
            outcome.skipped
        );
        Ok(outcome)
    }
}
