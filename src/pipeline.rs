use crate::config::TallyOptions;
use crate::directory::DirectoryProvider;
use crate::output::{result_file_name, write_tally};
use crate::progress::make_count_progress;
use crate::record::{RecordLimits, RecordParser};
use crate::scheduler::Scheduler;
use crate::tally::Tally;
use crate::util::init_tracing_once;
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Builder facade: directory in, aggregated tally (and optionally a result file) out.
#[derive(Clone, Default)]
pub struct CityTally {
    pub(crate) opts: TallyOptions,
}

/// Statistics for one finished run.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub dir: PathBuf,
    pub files_total: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub batches: u64,
    pub batches_lost: u64,
    pub keys: usize,
    pub elapsed_ms: u64,
    pub max_concurrency: usize,
    pub peak_in_flight: usize,
    pub result_path: Option<PathBuf>,
}

impl CityTally {
    pub fn new() -> Self {
        Self { opts: TallyOptions::default() }
    }

    pub fn from_options(opts: TallyOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &TallyOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_dir(dir); self }
    pub fn max_concurrency(mut self, n: usize) -> Self { self.opts = self.opts.with_max_concurrency(n); self }
    pub fn limits(mut self, limits: RecordLimits) -> Self { self.opts = self.opts.with_limits(limits); self }
    pub fn result_stem(mut self, stem: impl Into<String>) -> Self { self.opts = self.opts.with_result_stem(stem); self }
    pub fn ignore_stem(mut self, stem: impl Into<String>) -> Self { self.opts = self.opts.with_ignored_stem(stem); self }
    pub fn write_result(mut self, yes: bool) -> Self { self.opts = self.opts.with_write_result(yes); self }
    pub fn output_path(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_path(path); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn io_read_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_read_buffer(bytes); self }

    /// Aggregate every file in the configured directory.
    ///
    /// Fails only before scheduling starts (bad directory, pool build) or when
    /// the result file cannot be written. Unreadable files are skipped.
    pub fn run(&self) -> Result<(Tally, RunSummary)> {
        init_tracing_once();
        let started = Instant::now();

        let mut provider = DirectoryProvider::open(&self.opts.dir, &self.opts.ignored_stems, self.opts.read_buffer_bytes)?;
        if provider.total_files() == 0 {
            tracing::warn!(dir = %provider.dir().display(), "no input files found");
        }

        let scheduler = Scheduler::new(RecordParser::new(self.opts.limits), self.opts.max_concurrency)?;
        let pb = if self.opts.progress {
            Some(make_count_progress(provider.total_files() as u64, "Aggregating files"))
        } else {
            None
        };

        let (tally, stats) = scheduler.run_with(&mut provider, |done| {
            if let Some(pb) = &pb { pb.set_position(done); }
        });
        if let Some(pb) = pb { pb.finish_with_message("done"); }

        let result_path = if self.opts.write_result {
            let dest = match &self.opts.output_path {
                Some(p) => p.clone(),
                None => provider.dir().join(result_file_name(&self.opts.result_stem, provider.file_extension())),
            };
            write_tally(&dest, &tally)?;
            Some(dest)
        } else {
            None
        };

        let summary = RunSummary {
            dir: provider.dir().to_path_buf(),
            files_total: provider.total_files(),
            files_processed: provider.processed_files(),
            files_skipped: provider.skipped_files(),
            batches: stats.batches,
            batches_lost: stats.lost,
            keys: tally.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            max_concurrency: scheduler.max_concurrency(),
            peak_in_flight: stats.peak_in_flight,
            result_path,
        };
        tracing::info!(
            processed = summary.files_processed,
            skipped = summary.files_skipped,
            keys = summary.keys,
            elapsed_ms = summary.elapsed_ms,
            "run complete"
        );
        Ok((tally, summary))
    }
}
