//! One-shot questions about a loaded project.
//!
//! The project overview is sent as context ahead of the question. When the
//! provider is disabled or the call fails, [`ask`] answers with a local
//! insight built from the summary instead of returning an error.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::models::ProcessedProject;
use crate::provider::{complete_with_deadline, ReasoningProvider};

const PERSONA: &str = "You are VibeFlow, an AI architect who explains codebases succinctly.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Set when the text is the local fallback; holds the provider failure.
    pub fallback_reason: Option<String>,
}

/// Short overview line used as context, e.g. `Top file types: rs (4), md (1)`.
pub fn project_overview(project: &ProcessedProject) -> String {
    let extensions = project
        .summary
        .extension_histogram
        .iter()
        .take(3)
        .map(|e| format!("{} ({})", e.extension, e.count))
        .collect::<Vec<_>>()
        .join(", ");
    let extensions = if extensions.is_empty() {
        "diverse set".to_string()
    } else {
        extensions
    };
    format!(
        "I analysed {} files totalling {} lines. Top file types: {}.",
        project.summary.total_files, project.summary.total_lines, extensions
    )
}

pub fn build_prompt(project: &ProcessedProject, question: &str) -> String {
    format!(
        "{}\n\nPROJECT CONTEXT:\n{}\n\nQUESTION:\n{}",
        PERSONA,
        project_overview(project),
        question
    )
}

pub fn fallback_reply(project: &ProcessedProject, question: &str, provider: &str) -> String {
    let mut lines = vec![
        format!(
            "The {} provider is unavailable right now, but here is a quick local insight:",
            provider
        ),
        format!(
            "• Project contains {} files and {} total lines.",
            project.summary.total_files, project.summary.total_lines
        ),
    ];
    if let Some(top) = project.top_files_by_lines.first() {
        lines.push(format!("• {} leads with {} lines of code.", top.path, top.lines));
    }
    lines.push(format!(
        "• You asked: \"{}\". Try again once a provider is configured in [provider].",
        question
    ));
    lines.join("\n")
}

pub async fn ask(
    provider: &dyn ReasoningProvider,
    project: &ProcessedProject,
    question: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Reply {
    let prompt = build_prompt(project, question);
    match complete_with_deadline(provider, &prompt, timeout, cancel).await {
        Ok(text) => Reply {
            text: text.trim().to_string(),
            fallback_reason: None,
        },
        Err(e) => {
            tracing::warn!(provider = %provider.name(), error = %e, "ask failed, using local insight");
            Reply {
                text: fallback_reply(project, question, &provider.name()),
                fallback_reason: Some(format!("{:#}", e)),
            }
        }
    }
}
