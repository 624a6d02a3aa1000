//! Folder picker for local projects.
//!
//! Walks a directory and produces the same flat list a browser directory
//! picker would: one [`FileHandle`] per regular file, with a `/`-separated
//! relative path that starts with the picked folder's own name
//! (`myproj/src/main.rs`). Hidden-file and zero-byte filtering is left to
//! [`crate::ingest`]; this module only applies the folder-level excludes.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::aggregate::process_project;
use crate::config::IngestConfig;
use crate::ingest::{ingest_files, FileHandle};
use crate::models::ProcessedProject;
use crate::progress::{IngestProgressEvent, IngestProgressReporter};

/// Scan, ingest, and aggregate a local folder in one go.
pub async fn load_project(
    root: &Path,
    config: &IngestConfig,
    progress: &dyn IngestProgressReporter,
) -> Result<ProcessedProject> {
    let handles = scan_directory(root, config, progress)?;
    let files = ingest_files(&handles, config.max_file_bytes, progress).await;
    Ok(process_project(files, chrono::Utc::now()))
}

pub fn scan_directory(
    root: &Path,
    config: &IngestConfig,
    progress: &dyn IngestProgressReporter,
) -> Result<Vec<FileHandle>> {
    if !root.is_dir() {
        bail!("Project folder does not exist: {}", root.display());
    }

    let folder_name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_default();

    progress.report(IngestProgressEvent::Discovering {
        root: root.display().to_string(),
    });

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut handles = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let picked = if folder_name.is_empty() {
            rel_str
        } else {
            format!("{}/{}", folder_name, rel_str)
        };
        handles.push(FileHandle::on_disk(picked, path.to_path_buf(), size));
    }

    tracing::debug!(root = %root.display(), files = handles.len(), "folder scanned");
    Ok(handles)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
