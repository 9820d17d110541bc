//! Bounded-concurrency scheduler: pull batches while slots are free, wait for any
//! parse task to finish, merge every finished local tally, repeat until drained.

use crate::record::RecordParser;
use crate::source::SourceProvider;
use crate::tally::{merge_tally, new_tally, Batch, Tally};
use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type Worker = Arc<dyn Fn(Batch) -> Tally + Send + Sync>;

/// Owns the worker pool and drives one source to completion per `run`.
///
/// The global tally lives on the calling thread and is only touched between
/// channel receives, so workers never share mutable state.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    max_concurrency: usize,
    worker: Worker,
}

/// Counters from the last run, for logging and statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub batches: u64,
    pub lost: u64, // batches whose task panicked
    pub peak_in_flight: usize,
}

impl Scheduler {
    /// Scheduler running `RecordParser::parse_batch` in at most `max_concurrency` slots.
    pub fn new(parser: RecordParser, max_concurrency: usize) -> Result<Self> {
        Self::with_worker(move |batch: Batch| parser.parse_batch(&batch), max_concurrency)
    }

    /// Scheduler running an arbitrary batch worker.
    pub fn with_worker<F>(worker: F, max_concurrency: usize) -> Result<Self>
    where
        F: Fn(Batch) -> Tally + Send + Sync + 'static,
    {
        let max_concurrency = max_concurrency.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_concurrency)
            .thread_name(|i| format!("citytally-parse-{i}"))
            .build()
            .context("building parse thread pool")?;
        Ok(Self { pool, max_concurrency, worker: Arc::new(worker) })
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Drive `source` until it is exhausted and every dispatched batch is merged.
    pub fn run<S: SourceProvider + ?Sized>(&self, source: &mut S) -> Tally {
        self.run_with(source, |_| {}).0
    }

    /// Like `run`, calling `on_merge(batches_merged_so_far)` after each merge.
    pub fn run_with<S, F>(&self, source: &mut S, mut on_merge: F) -> (Tally, SchedulerStats)
    where
        S: SourceProvider + ?Sized,
        F: FnMut(u64),
    {
        // `None` reports a task whose worker panicked, so its slot is still released.
        let (tx, rx) = unbounded::<Option<Tally>>();
        // Dropped once the source is exhausted, so the channel closes when the last task ends.
        let mut tx = Some(tx);
        let mut global = new_tally();
        let mut stats = SchedulerStats::default();
        let mut in_flight: usize = 0;

        loop {
            // Fill free slots.
            while in_flight < self.max_concurrency && !source.is_exhausted() {
                let Some(tx) = tx.clone() else { break };
                let batch = source.next_batch();
                let worker = Arc::clone(&self.worker);
                tracing::debug!(lines = batch.len(), in_flight, "dispatching batch");
                self.pool.spawn(move || {
                    let local = catch_unwind(AssertUnwindSafe(|| worker(batch))).ok();
                    let _ = tx.send(local);
                });
                in_flight += 1;
                stats.peak_in_flight = stats.peak_in_flight.max(in_flight);
            }

            if source.is_exhausted() {
                tx = None;
            }
            if in_flight == 0 {
                break;
            }

            // Wait for any task, then take everything else that is already done.
            let first = match rx.recv() {
                Ok(t) => t,
                Err(_) => {
                    // Every sender is gone but some tasks never reported.
                    tracing::warn!(lost = in_flight, "tasks ended without a result");
                    stats.lost += in_flight as u64;
                    break;
                }
            };
            self.merge_one(&mut global, first, &mut in_flight, &mut stats, &mut on_merge);
            drain_ready(&rx, |local| {
                self.merge_one(&mut global, local, &mut in_flight, &mut stats, &mut on_merge)
            });
        }

        tracing::info!(
            batches = stats.batches,
            lost = stats.lost,
            keys = global.len(),
            peak_in_flight = stats.peak_in_flight,
            max_concurrency = self.max_concurrency,
            "scheduler drained"
        );
        (global, stats)
    }

    fn merge_one(
        &self,
        global: &mut Tally,
        local: Option<Tally>,
        in_flight: &mut usize,
        stats: &mut SchedulerStats,
        on_merge: &mut impl FnMut(u64),
    ) {
        *in_flight -= 1;
        let Some(local) = local else {
            tracing::error!("parse task panicked; its batch is dropped");
            stats.lost += 1;
            return;
        };
        tracing::debug!(keys = local.len(), "merging local tally");
        merge_tally(global, local);
        stats.batches += 1;
        on_merge(stats.batches);
    }
}

fn drain_ready(rx: &Receiver<Option<Tally>>, mut f: impl FnMut(Option<Tally>)) {
    while let Ok(local) = rx.try_recv() {
        f(local);
    }
}
