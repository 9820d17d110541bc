#![allow(dead_code)]

use citytally::Tally;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Tally as an ordered map with owned keys, for easy `assert_eq!`.
pub fn to_btree(t: &Tally) -> BTreeMap<String, i64> {
    t.iter().map(|(k, v)| (k.clone(), *v)).collect()
}

/// Expected map from `(key, value)` pairs.
pub fn expect(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Owned batch from string literals.
pub fn batch(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

/// Fresh scratch directory that outlives the test (caller owns cleanup).
pub fn scratch_dir() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

/// Write plain text lines (LF-terminated).
pub fn write_lines(path: &Path, lines: &[&str]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
}

/// Write a compressed `.zst` file containing the provided lines.
pub fn write_zst_lines(path: &Path, lines: &[&str]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// Read a text file line-by-line into strings (skips empty lines).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

/// Parse a `KEY,VALUE` result file.
pub fn read_result(path: &Path) -> BTreeMap<String, i64> {
    read_lines(path)
        .into_iter()
        .map(|line| {
            let (k, v) = line.split_once(',').unwrap();
            (k.to_string(), v.parse::<i64>().unwrap())
        })
        .collect()
}

/// Build a small city directory:
/// - `a.txt`: CITY_1 100, CITY_2 0, one malformed line
/// - `b.txt`: city_1 (lowercase) 900, Capital 5000
/// - `c.txt`: CRLF line endings, CITY_2 7
/// - `RESULT.txt`: stale output from an earlier run, must be ignored
pub fn make_city_dir() -> PathBuf {
    let base = scratch_dir();
    write_lines(&base.join("a.txt"), &["City_1, 100", "City_2, 0", "not a record"]);
    write_lines(&base.join("b.txt"), &["  city_1 ,900", "Capital,5000"]);
    fs::write(base.join("c.txt"), b"City_2,7\r\n\r\n").unwrap();
    write_lines(&base.join("RESULT.txt"), &["CITY_1,999999", "CAPITAL,1"]);
    base
}
