//! Tally map type plus the key-wise merge used to fold per-batch results into the global one.

use ahash::RandomState;
use std::collections::HashMap;

/// Normalized key -> accumulated value.
pub type Tally = HashMap<String, i64, RandomState>;

/// One batch of raw lines as handed out by a source.
pub type Batch = Vec<String>;

pub fn new_tally() -> Tally {
    Tally::default()
}

/// Add `value` to the accumulator for `key`, creating it if absent.
/// Sums saturate at the `i64` bounds instead of wrapping.
#[inline]
pub fn add_to_tally(tally: &mut Tally, key: String, value: i64) {
    let acc = tally.entry(key).or_insert(0);
    *acc = acc.saturating_add(value);
}

/// Key-wise sum of `part` into `total`. Commutative and associative, so the
/// order in which parts arrive does not change the result.
pub fn merge_tally(total: &mut Tally, part: Tally) {
    if total.is_empty() {
        *total = part;
        return;
    }
    for (k, v) in part {
        add_to_tally(total, k, v);
    }
}

/// Entries sorted by key, for deterministic output.
pub fn sorted_entries(tally: &Tally) -> Vec<(&str, i64)> {
    let mut v: Vec<(&str, i64)> = tally.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    v.sort_unstable_by(|a, b| a.0.cmp(b.0));
    v
}
