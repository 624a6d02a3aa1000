//! Plain-text project report.
//!
//! Used by `vf scan` to show what was ingested: totals, the extension
//! histogram as a bar chart, and the richest files.

use crate::models::ProcessedProject;
use crate::progress::format_number;

const BAR_WIDTH: usize = 30;

/// Render the report for `project`. `root` is only used in the heading.
pub fn render_report(project: &ProcessedProject, root: &str) -> String {
    let summary = &project.summary;
    let mut out = String::new();

    out.push_str("VibeFlow Project Report\n");
    out.push_str("=======================\n\n");
    out.push_str(&format!("  Folder:      {}\n", root));
    out.push_str(&format!(
        "  Captured:    {}\n",
        summary.last_uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "  Files:       {}\n",
        format_number(summary.total_files as u64)
    ));
    out.push_str(&format!(
        "  Lines:       {}\n",
        format_number(summary.total_lines as u64)
    ));

    if !summary.extension_histogram.is_empty() {
        let max = summary
            .extension_histogram
            .iter()
            .map(|e| e.count)
            .max()
            .unwrap_or(1)
            .max(1);
        out.push_str("\n  By extension:\n");
        for stat in &summary.extension_histogram {
            let width = (stat.count * BAR_WIDTH).div_ceil(max);
            out.push_str(&format!(
                "  {:<10} {:>6}  {}\n",
                stat.extension,
                stat.count,
                "#".repeat(width)
            ));
        }
    }

    if !project.top_files_by_lines.is_empty() {
        out.push_str("\n  Richest files:\n");
        out.push_str(&format!("  {:>7}   {}\n", "LINES", "PATH"));
        out.push_str(&format!("  {}\n", "-".repeat(60)));
        for stat in &project.top_files_by_lines {
            out.push_str(&format!("  {:>7}   {}\n", stat.lines, stat.path));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::process_project;
    use crate::models::ProjectFile;
    use chrono::{TimeZone, Utc};

    fn file(path: &str, ext: &str, lines: usize) -> ProjectFile {
        ProjectFile {
            name: path.rsplit('/').next().unwrap().to_string(),
            path: path.to_string(),
            content: "x".to_string(),
            extension: ext.to_string(),
            lines,
        }
    }

    #[test]
    fn test_report_sections() {
        let captured = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let project = process_project(
            vec![
                file("demo/a.rs", "rs", 1200),
                file("demo/b.rs", "rs", 3),
                file("demo/c.md", "md", 40),
            ],
            captured,
        );
        let text = render_report(&project, "demo");
        assert!(text.contains("Captured:    2025-03-01 09:30:00 UTC"));
        assert!(text.contains("Lines:       1,243"));
        assert!(text.contains(&format!("  rs              2  {}\n", "#".repeat(30))));
        assert!(text.contains(&format!("  md              1  {}\n", "#".repeat(15))));
        let richest = text.find("1200   demo/a.rs").unwrap();
        assert!(richest < text.find("40   demo/c.md").unwrap());
    }

    #[test]
    fn test_empty_project_report() {
        let project = process_project(Vec::new(), Utc::now());
        let text = render_report(&project, "empty");
        assert!(text.contains("Files:       0"));
        assert!(!text.contains("By extension"));
        assert!(!text.contains("Richest files"));
    }
}
