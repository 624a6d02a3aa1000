//! Export a processed project as JSON.
//!
//! Writes everything a chart or graph front-end needs: per-file metadata
//! (without contents), the summary, the hierarchy graph, and the richest
//! files. Field names are camelCase to match the rest of the wire format.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::models::{HierarchyGraph, LineStat, ProcessedProject, ProjectSummary};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportData<'a> {
    files: Vec<ExportFile<'a>>,
    summary: &'a ProjectSummary,
    graph_elements: &'a HierarchyGraph,
    top_files_by_lines: &'a [LineStat],
}

#[derive(Serialize)]
struct ExportFile<'a> {
    name: &'a str,
    path: &'a str,
    extension: &'a str,
    lines: usize,
}

pub fn export_json(project: &ProcessedProject) -> Result<String> {
    let data = ExportData {
        files: project
            .files
            .iter()
            .map(|f| ExportFile {
                name: &f.name,
                path: &f.path,
                extension: &f.extension,
                lines: f.lines,
            })
            .collect(),
        summary: &project.summary,
        graph_elements: &project.graph_elements,
        top_files_by_lines: &project.top_files_by_lines,
    };
    Ok(serde_json::to_string_pretty(&data)?)
}

/// Write the export to `output`, or to stdout when `None`.
pub fn run_export(project: &ProcessedProject, output: Option<&Path>) -> Result<()> {
    let json = export_json(project)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &json)?;
            eprintln!(
                "Exported {} files, {} graph nodes to {}",
                project.files.len(),
                project.graph_elements.nodes.len(),
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::process_project;
    use crate::models::ProjectFile;
    use chrono::Utc;
    use serde_json::Value;

    fn project() -> ProcessedProject {
        process_project(
            vec![ProjectFile {
                name: "main.rs".to_string(),
                path: "demo/main.rs".to_string(),
                content: "fn main() {}".to_string(),
                extension: "rs".to_string(),
                lines: 1,
            }],
            Utc::now(),
        )
    }

    #[test]
    fn test_export_shape_omits_content() {
        let v: Value = serde_json::from_str(&export_json(&project()).unwrap()).unwrap();
        assert_eq!(v["files"][0]["path"], "demo/main.rs");
        assert!(v["files"][0].get("content").is_none());
        assert_eq!(v["summary"]["totalFiles"], 1);
        assert_eq!(v["summary"]["extensionHistogram"][0]["extension"], "rs");
        assert_eq!(v["graphElements"]["nodes"][0]["data"]["id"], "root");
        assert_eq!(v["topFilesByLines"][0]["lines"], 1);
    }

    #[test]
    fn test_export_to_file_creates_parent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("nested/out.json");
        run_export(&project(), Some(&out)).unwrap();
        let v: Value = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(v["summary"]["totalLines"], 1);
    }
}
