//! Whole-file line reading for one source unit, with transparent `.zst` decoding.

use anyhow::{Context, Result};
use std::io::{BufReader, Read};
use std::path::Path;
use zstd::stream::read::Decoder;

use crate::util::open_with_backoff;

/// True when the path carries a `.zst` extension (case-insensitive).
pub fn is_zst(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("zst"))
        .unwrap_or(false)
}

/// Read a file fully and split it into lines (`\n` or `\r\n`).
///
/// Invalid UTF-8 is replaced rather than rejected so one bad byte only spoils
/// its own line, which the record parser will then drop.
///
/// We request `window_log_max(31)` for `.zst` inputs to avoid "Frame requires
/// too much memory" on large frames.
pub fn read_lines(path: &Path, read_buf_bytes: usize) -> Result<Vec<String>> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let cap = read_buf_bytes.max(8 * 1024);

    let mut bytes = Vec::new();
    if is_zst(path) {
        let mut decoder = Decoder::new(file)?;
        decoder.window_log_max(31)?;
        BufReader::with_capacity(cap, decoder)
            .read_to_end(&mut bytes)
            .with_context(|| format!("decode {}", path.display()))?;
    } else {
        BufReader::with_capacity(cap, file)
            .read_to_end(&mut bytes)
            .with_context(|| format!("read {}", path.display()))?;
    }

    Ok(String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect())
}
