//! Result serialization: one `KEY,VALUE` line per entry, written atomically.

use crate::tally::{sorted_entries, Tally};
use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// `RESULT` + `.txt` -> `RESULT.txt`; no extension -> `RESULT`.
pub fn result_file_name(stem: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => {
            if ext.starts_with('.') { format!("{stem}{ext}") } else { format!("{stem}.{ext}") }
        }
        _ => stem.to_string(),
    }
}

/// Write `KEY,VALUE` lines (sorted by key) to any writer.
pub fn write_tally_to<W: Write>(w: &mut W, tally: &Tally) -> Result<()> {
    for (k, v) in sorted_entries(tally) {
        writeln!(w, "{k},{v}")?;
    }
    Ok(())
}

/// Sibling temp path sharing the result's stem (`RESULT.txt` -> `RESULT.tmp`),
/// so a leftover from a crashed run is still skipped as input.
fn tmp_path_for(dest: &Path) -> PathBuf {
    if dest.extension().is_some_and(|e| e == "tmp") {
        dest.with_extension("tmp.part")
    } else {
        dest.with_extension("tmp")
    }
}

/// Write the tally to `dest` via a sibling temp file, replacing any existing file.
/// On failure the temp file is removed.
pub fn write_tally(dest: &Path, tally: &Tally) -> Result<()> {
    let tmp = tmp_path_for(dest);
    if let Err(e) = write_via(&tmp, dest, tally) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    tracing::info!(path = %dest.display(), keys = tally.len(), "result written");
    Ok(())
}

fn write_via(tmp: &Path, dest: &Path, tally: &Tally) -> Result<()> {
    {
        let f = create_with_backoff(tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
        let mut w = BufWriter::new(f);
        write_tally_to(&mut w, tally)?;
        w.flush()?;
    }
    replace_file_atomic_backoff(tmp, dest)
}
