//! Project aggregation: totals, extension histogram, and richest files.
//!
//! Everything here is a pure function of an already path-sorted file list.
//! The capture time is passed in so callers (and tests) control it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::graph::build_hierarchy_graph;
use crate::models::{ExtensionStat, LineStat, ProcessedProject, ProjectFile, ProjectSummary};

/// Histogram and richest-files views keep this many entries.
pub const TOP_N: usize = 12;

pub fn summarize(files: &[ProjectFile], captured_at: DateTime<Utc>) -> ProjectSummary {
    ProjectSummary {
        total_files: files.len(),
        total_lines: files.iter().map(|f| f.lines).sum(),
        extension_histogram: extension_histogram(files),
        last_uploaded_at: captured_at,
    }
}

/// Counts per extension, descending, ties in first-seen order, top [`TOP_N`].
pub fn extension_histogram(files: &[ProjectFile]) -> Vec<ExtensionStat> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut stats: Vec<ExtensionStat> = Vec::new();

    for file in files {
        let seen = index.get(file.extension.as_str()).copied();
        match seen {
            Some(i) => stats[i].count += 1,
            None => {
                index.insert(file.extension.as_str(), stats.len());
                stats.push(ExtensionStat {
                    extension: file.extension.clone(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable, so equal counts keep insertion order
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats.truncate(TOP_N);
    stats
}

/// Top [`TOP_N`] files by line count, descending; zero-line files excluded.
pub fn top_files_by_lines(files: &[ProjectFile]) -> Vec<LineStat> {
    let mut ranked: Vec<&ProjectFile> = files.iter().filter(|f| f.lines > 0).collect();
    ranked.sort_by(|a, b| b.lines.cmp(&a.lines));
    ranked
        .into_iter()
        .take(TOP_N)
        .map(|f| LineStat {
            path: f.path.clone(),
            lines: f.lines,
        })
        .collect()
}

/// Summary, hierarchy graph, and richest files for one ingested batch.
pub fn process_project(files: Vec<ProjectFile>, captured_at: DateTime<Utc>) -> ProcessedProject {
    let summary = summarize(&files, captured_at);
    let graph_elements = build_hierarchy_graph(&files);
    let top_files_by_lines = top_files_by_lines(&files);
    ProcessedProject {
        files,
        summary,
        graph_elements,
        top_files_by_lines,
    }
}
