use crate::record::RecordLimits;
use std::path::{Path, PathBuf};

/// Stem of the result file; also ignored on input so reruns don't count it.
pub const RESULT_FILE_STEM: &str = "RESULT";

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct TallyOptions {
    pub dir: PathBuf,
    pub max_concurrency: usize,       // parse tasks in flight at once, >= 1
    pub limits: RecordLimits,
    pub result_stem: String,
    pub ignored_stems: Vec<String>,   // input files whose stem matches are skipped
    pub write_result: bool,
    pub output_path: Option<PathBuf>, // if None, dir/RESULT<ext>
    pub progress: bool,               // show progress bar

    // IO tuning
    pub read_buffer_bytes: usize,     // BufReader capacity
}

impl Default for TallyOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            max_concurrency: 1,
            limits: RecordLimits::default(),
            result_stem: RESULT_FILE_STEM.to_string(),
            ignored_stems: vec![RESULT_FILE_STEM.to_string()],
            write_result: true,
            output_path: None,
            progress: false,
            read_buffer_bytes: 64 * 1024,
        }
    }
}

impl TallyOptions {
    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }
    pub fn with_limits(mut self, limits: RecordLimits) -> Self {
        self.limits = limits;
        self
    }
    /// Rename the result file. The new stem is also ignored on input.
    pub fn with_result_stem(mut self, stem: impl Into<String>) -> Self {
        let stem = stem.into();
        if !self.ignored_stems.contains(&stem) {
            self.ignored_stems.push(stem.clone());
        }
        self.result_stem = stem;
        self
    }
    pub fn with_ignored_stem(mut self, stem: impl Into<String>) -> Self {
        let stem = stem.into();
        if !self.ignored_stems.contains(&stem) {
            self.ignored_stems.push(stem);
        }
        self
    }
    pub fn with_write_result(mut self, yes: bool) -> Self {
        self.write_result = yes;
        self
    }
    pub fn with_output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output_path = Some(path.as_ref().to_path_buf());
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
}

/// Lenient parse of a user-supplied concurrency value: missing, non-numeric,
/// negative or zero input falls back to a single slot.
pub fn concurrency_from_arg(raw: Option<&str>) -> usize {
    let Some(raw) = raw else { return 1 };
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => n,
        _ => {
            tracing::warn!(value = raw, "unusable max concurrency; running with 1");
            1
        }
    }
}
