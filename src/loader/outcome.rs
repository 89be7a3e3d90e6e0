/// Accounting for one whole load, accumulated batch by batch.
///
/// `inserted + failed <= submitted`; equality holds when the backend
/// accounts for every record it was sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Records handed to the backend.
    pub submitted: usize,
    pub inserted: usize,
    pub failed: usize,
    /// Records filtered out before batching for lacking an identifier.
    pub skipped: usize,
    pub batches: usize,
}

impl LoadOutcome {
    /// Counts one batch. An inserted count above `size` is clamped to it.
    pub(crate) fn record_batch(&mut self, size: usize, inserted: usize) {
        let inserted = inserted.min(size);
        self.batches += 1;
        self.submitted += size;
        self.inserted += inserted;
        self.failed += size.saturating_sub(inserted);
    }

    pub fn is_fully_accounted(&self) -> bool {
        self.inserted + self.failed == self.submitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_monotonically() {
        let mut outcome = LoadOutcome::default();
        outcome.record_batch(10, 10);
        outcome.record_batch(10, 7);
        outcome.record_batch(3, 3);
        assert_eq!(
            outcome,
            LoadOutcome {
                submitted: 23,
                inserted: 20,
                failed: 3,
                skipped: 0,
                batches: 3,
            }
        );
        assert!(outcome.is_fully_accounted());
    }

    #[test]
    fn test_over_reported_insert_is_clamped() {
        let mut outcome = LoadOutcome::default();
        outcome.record_batch(2, 5);
        outcome.record_batch(3, 1);
        assert_eq!(outcome.inserted, 3);
        assert_eq!(outcome.failed, 2);
        assert!(outcome.inserted + outcome.failed <= outcome.submitted);
        assert!(outcome.is_fully_accounted());
    }
}
