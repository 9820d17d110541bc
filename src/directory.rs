//! Directory-backed source: one batch per regular file directly inside a directory.

use crate::lines::{is_zst, read_lines};
use crate::source::SourceProvider;
use crate::tally::Batch;
use anyhow::{bail, Context, Result};
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct DirectoryProvider {
    dir: PathBuf,
    queue: VecDeque<PathBuf>,
    extension: Option<String>,
    read_buf_bytes: usize,
    total: usize,
    processed: usize,
    skipped: usize,
}

/// File stem with one `.zst` layer peeled off: `a.txt.zst` -> `a`.
fn logical_stem(path: &Path) -> Option<&OsStr> {
    if is_zst(path) {
        path.file_stem().map(Path::new).and_then(Path::file_stem)
    } else {
        path.file_stem()
    }
}

/// Extension with one `.zst` layer peeled off: `a.txt.zst` -> `.txt`, `a.zst` -> none.
fn logical_extension(path: &Path) -> Option<String> {
    let inner: &Path = if is_zst(path) { Path::new(path.file_stem()?) } else { path };
    inner.extension().and_then(|e| e.to_str()).map(|e| format!(".{e}"))
}

fn discover_files(dir: &Path, ignored_stems: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true).sort_by_file_name() {
        let ent = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !ent.file_type().is_file() {
            continue;
        }
        let ignored = logical_stem(ent.path())
            .and_then(|s| s.to_str())
            .map(|s| ignored_stems.iter().any(|i| i == s))
            .unwrap_or(false);
        if ignored {
            tracing::debug!(path = %ent.path().display(), "ignoring file");
            continue;
        }
        files.push(ent.into_path());
    }
    files
}

impl DirectoryProvider {
    /// Resolve `dir` and queue its files. Fails if the path cannot be resolved
    /// or is not a directory; nothing is read yet.
    pub fn open(dir: impl AsRef<Path>, ignored_stems: &[String], read_buf_bytes: usize) -> Result<Self> {
        let raw = dir.as_ref();
        let dir = fs::canonicalize(raw).with_context(|| format!("cannot resolve directory {}", raw.display()))?;
        if !dir.is_dir() {
            bail!("not a directory: {}", dir.display());
        }
        // Check readability up front so an unreadable root is fatal, not a silent empty run.
        fs::read_dir(&dir).with_context(|| format!("cannot read directory {}", dir.display()))?;

        let files = discover_files(&dir, ignored_stems);
        let extension = files.first().and_then(|p| logical_extension(p));
        tracing::info!(dir = %dir.display(), files = files.len(), "planned files for processing");

        Ok(Self {
            dir,
            total: files.len(),
            queue: files.into(),
            extension,
            read_buf_bytes,
            processed: 0,
            skipped: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Extension of the first queued file (e.g. `.txt`), if any.
    pub fn file_extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn total_files(&self) -> usize {
        self.total
    }

    pub fn processed_files(&self) -> usize {
        self.processed
    }

    pub fn skipped_files(&self) -> usize {
        self.skipped
    }
}

impl SourceProvider for DirectoryProvider {
    fn next_batch(&mut self) -> Batch {
        let Some(path) = self.queue.pop_front() else { return Vec::new() };
        match read_lines(&path, self.read_buf_bytes) {
            Ok(lines) => {
                self.processed += 1;
                tracing::debug!(path = %path.display(), lines = lines.len(), "read file");
                lines
            }
            Err(e) => {
                self.skipped += 1;
                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "skipping file after read error");
                Vec::new()
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}
