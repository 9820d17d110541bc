//! Source abstraction consumed by the scheduler.

use crate::tally::Batch;
use std::collections::VecDeque;

/// Supplies batches of raw lines on demand.
///
/// Only called from the scheduling thread, one call at a time, so
/// implementations need neither `Send` nor `Sync`.
pub trait SourceProvider {
    /// Next batch of raw lines. An empty batch is allowed, e.g. after a
    /// recoverable failure on one unit of input.
    fn next_batch(&mut self) -> Batch;

    /// True once no further batches will ever be produced.
    fn is_exhausted(&self) -> bool;
}

/// In-memory source: hands out pre-built batches in order.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    batches: VecDeque<Batch>,
    pulled: usize,
}

impl MemorySource {
    pub fn new<I, B, S>(batches: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let batches = batches
            .into_iter()
            .map(|b| b.into_iter().map(Into::into).collect())
            .collect();
        Self { batches, pulled: 0 }
    }

    pub fn push(&mut self, batch: Batch) {
        self.batches.push_back(batch);
    }

    /// Number of batches handed out so far.
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

impl SourceProvider for MemorySource {
    fn next_batch(&mut self) -> Batch {
        match self.batches.pop_front() {
            Some(b) => {
                self.pulled += 1;
                b
            }
            None => Vec::new(),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.batches.is_empty()
    }
}
