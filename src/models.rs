//! Core data models used throughout VibeFlow.
//!
//! These types represent the files, summaries, graphs, and digests that flow
//! through the ingestion → aggregation → digest pipeline. Field names
//! serialize in camelCase so exported JSON matches what graph and chart
//! front-ends expect.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Extension sentinel for files whose leaf name has no dot.
pub const OTHER_EXTENSION: &str = "other";

/// One ingested file. Never mutated after ingestion.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProjectFile {
    /// Leaf file name.
    pub name: String,
    /// Relative, `/`-separated path; unique within a project.
    pub path: String,
    /// Raw text; empty when the file was oversized or unreadable.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Lower-cased suffix after the last dot, or [`OTHER_EXTENSION`].
    pub extension: String,
    pub lines: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtensionStat {
    pub extension: String,
    pub count: usize,
}

/// `{path, lines}` projection used for the "richest files" view.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LineStat {
    pub path: String,
    pub lines: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub total_files: usize,
    pub total_lines: usize,
    /// Descending by count, at most 12 entries, ties in first-seen order.
    pub extension_histogram: Vec<ExtensionStat>,
    pub last_uploaded_at: DateTime<Utc>,
}

/// A graph node, wrapped as `{ "data": { "id", "label" } }` on the wire.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GraphNode {
    pub data: NodeData,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NodeData {
    pub id: String,
    pub label: String,
}

/// A parent → child edge, wrapped as `{ "data": { "id", "source", "target" } }`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GraphEdge {
    pub data: EdgeData,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Directory/file hierarchy rooted at a single `"root"` node.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HierarchyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Everything derived from one ingestion batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedProject {
    pub files: Vec<ProjectFile>,
    pub summary: ProjectSummary,
    pub graph_elements: HierarchyGraph,
    pub top_files_by_lines: Vec<LineStat>,
}

/// Bounded-size text summary of a project plus its cache token.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProjectDigest {
    pub digest: String,
    pub hash: String,
}
