//! Record validation and per-batch aggregation.
//!
//! A record is a single `<name>,<value>` line. Lines that fail any check are
//! dropped without a trace; this is a filter, not an error path.

use crate::tally::{add_to_tally, new_tally, Tally};

pub const DEFAULT_MIN_NAME_LENGTH: usize = 3;
pub const DEFAULT_MAX_NAME_LENGTH: usize = 30;
pub const DEFAULT_MIN_VALUE: i64 = 0;
pub const DEFAULT_MAX_VALUE: i64 = 100_000_000;

const SEPARATOR: char = ',';

/// Inclusive bounds applied to every parsed record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordLimits {
    pub min_name_len: usize, // in chars, after trim + uppercase
    pub max_name_len: usize,
    pub min_value: i64,
    pub max_value: i64,
}

impl Default for RecordLimits {
    fn default() -> Self {
        Self {
            min_name_len: DEFAULT_MIN_NAME_LENGTH,
            max_name_len: DEFAULT_MAX_NAME_LENGTH,
            min_value: DEFAULT_MIN_VALUE,
            max_value: DEFAULT_MAX_VALUE,
        }
    }
}

impl RecordLimits {
    #[inline]
    fn name_ok(&self, name: &str) -> bool {
        let n = name.chars().count();
        n >= self.min_name_len && n <= self.max_name_len
    }

    #[inline]
    fn value_ok(&self, v: i64) -> bool {
        v >= self.min_value && v <= self.max_value
    }
}

/// Stateless line parser; cheap to clone into worker tasks.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordParser {
    limits: RecordLimits,
}

impl RecordParser {
    pub fn new(limits: RecordLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RecordLimits {
        &self.limits
    }

    /// Validate one line and return `(normalized_key, value)` when it passes.
    ///
    /// Checks, in order: non-blank line; exactly one separator; both parts
    /// non-blank; integer value; key length within limits; value within limits.
    pub fn parse_line(&self, line: &str) -> Option<(String, i64)> {
        if line.trim().is_empty() {
            return None;
        }

        // Strict two-part split: "a,b,c" is a format error, not "a" + "b,c".
        let mut parts = line.split(SEPARATOR);
        let name = parts.next()?;
        let value = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            return None;
        }

        let value: i64 = value.parse().ok()?;
        let key = name.to_uppercase();

        if !self.limits.name_ok(&key) || !self.limits.value_ok(value) {
            return None;
        }
        Some((key, value))
    }

    /// Fold a whole batch into a fresh local tally.
    pub fn parse_batch<S: AsRef<str>>(&self, lines: &[S]) -> Tally {
        let mut tally = new_tally();
        for line in lines {
            if let Some((key, value)) = self.parse_line(line.as_ref()) {
                add_to_tally(&mut tally, key, value);
            }
        }
        tally
    }
}
