//! Project ingestion.
//!
//! Turns a flat batch of [`FileHandle`]s (relative path + byte size + a way
//! to read the bytes) into sorted [`ProjectFile`]s. Handles come either from
//! a folder walk ([`crate::connector_fs`]) or from in-memory uploads.
//!
//! Rules applied per handle:
//!
//! - leaf names starting with `.` and zero-byte files are dropped;
//! - content is read only when `size <= max_file_bytes`, otherwise it is
//!   empty and the file counts as 0 lines;
//! - unreadable files degrade to empty content instead of failing the batch.
//!
//! All reads of a batch run concurrently and are joined before the batch is
//! returned, so callers never see a partially read project.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::{ProjectFile, OTHER_EXTENSION};
use crate::progress::{IngestProgressEvent, IngestProgressReporter};

/// Upper bound on concurrently open files during a batch read.
const READ_CONCURRENCY: usize = 32;

/// Where a handle's bytes live.
#[derive(Debug, Clone)]
pub enum FileBody {
    Disk(PathBuf),
    Memory(Vec<u8>),
}

/// One entry of a directory-picker style file list.
#[derive(Debug, Clone)]
pub struct FileHandle {
    /// Leaf file name.
    pub name: String,
    /// Path relative to the picked folder, `/`-separated.
    pub relative_path: Option<String>,
    /// Size in bytes as reported by the picker or filesystem.
    pub size: u64,
    pub body: FileBody,
}

impl FileHandle {
    /// A handle backed by a file on disk.
    pub fn on_disk(relative_path: impl Into<String>, absolute: PathBuf, size: u64) -> Self {
        let relative_path = relative_path.into();
        Self {
            name: leaf_name(&relative_path).to_string(),
            relative_path: Some(relative_path),
            size,
            body: FileBody::Disk(absolute),
        }
    }

    /// A handle whose bytes are already in memory; size is the byte length.
    pub fn in_memory(relative_path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let relative_path = relative_path.into();
        let bytes = bytes.into();
        Self {
            name: leaf_name(&relative_path).to_string(),
            relative_path: Some(relative_path),
            size: bytes.len() as u64,
            body: FileBody::Memory(bytes),
        }
    }

    /// The relative path, or the bare name when the picker supplied none.
    pub fn path(&self) -> &str {
        match &self.relative_path {
            Some(p) if !p.is_empty() => p,
            _ => &self.name,
        }
    }

    async fn read_text(&self) -> String {
        match &self.body {
            FileBody::Memory(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            FileBody::Disk(path) => match tokio::fs::read(path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "unreadable file, using empty content");
                    String::new()
                }
            },
        }
    }
}

fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Hidden (leading `.`) and zero-byte entries never become [`ProjectFile`]s.
pub fn is_ignorable(handle: &FileHandle) -> bool {
    leaf_name(handle.path()).starts_with('.') || handle.size == 0
}

/// Lower-cased text after the last dot of the leaf name, or `"other"`.
pub fn extension_of(path: &str) -> String {
    let leaf = leaf_name(path);
    match leaf.rfind('.') {
        Some(idx) => leaf[idx + 1..].to_lowercase(),
        None => OTHER_EXTENSION.to_string(),
    }
}

/// Number of pieces after splitting on `\r\n` / `\n` (line breaks + 1).
/// A trailing newline opens an empty last line. Empty content counts as 0.
pub fn count_lines(content: &str) -> usize {
    if content.is_empty() {
        return 0;
    }
    content.split('\n').count()
}

async fn ingest_one(handle: &FileHandle, max_file_bytes: u64) -> ProjectFile {
    let path = handle.path().to_string();
    let content = if handle.size > max_file_bytes {
        String::new()
    } else {
        handle.read_text().await
    };
    let lines = count_lines(&content);
    ProjectFile {
        name: handle.name.clone(),
        extension: extension_of(&path),
        path,
        content,
        lines,
    }
}

/// Ingest a batch of handles into path-sorted [`ProjectFile`]s.
///
/// Never fails: per-file problems degrade to empty content.
pub async fn ingest_files(
    handles: &[FileHandle],
    max_file_bytes: u64,
    progress: &dyn IngestProgressReporter,
) -> Vec<ProjectFile> {
    let kept: Vec<&FileHandle> = handles.iter().filter(|h| !is_ignorable(h)).collect();
    let total = kept.len() as u64;
    let done = AtomicU64::new(0);

    let mut files: Vec<ProjectFile> = stream::iter(kept)
        .map(|handle| {
            let done = &done;
            async move {
                let file = ingest_one(handle, max_file_bytes).await;
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if n % 500 == 0 || n == total {
                    progress.report(IngestProgressEvent::Reading { n, total });
                }
                file
            }
        })
        .buffer_unordered(READ_CONCURRENCY)
        .collect()
        .await;

    files.sort_by(|a, b| a.path.cmp(&b.path));
    progress.report(IngestProgressEvent::Done {
        kept: files.len() as u64,
    });
    files
}
