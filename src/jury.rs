//! Jury prompts and reply types.
//!
//! Two calls make up a jury session:
//!
//! 1. **analyze**: digest in; metrics, summary, concepts, and ten questions
//!    (seven conceptual, three coding) out.
//! 2. **evaluate**: summary and answered questions in; feedback, scores,
//!    and up to three grey areas out.
//!
//! Replies are parsed strictly into the types below; a reply that does not
//! match fails the call. Scores are clamped to `0..=10` and grey areas are
//! capped at [`MAX_GREY_AREAS`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::provider::{complete_with_deadline, parse_json_reply, ReasoningProvider};

pub const QUESTION_COUNT: usize = 10;
pub const MAX_GREY_AREAS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Maintainability {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reliability {
    pub handled: u32,
    pub unhandled: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeMetrics {
    pub memory_management: f64,
    pub algorithmic_complexity: f64,
    pub runtime_efficiency: f64,
    pub security: RiskLevel,
    pub reliability: Reliability,
    pub maintainability: Maintainability,
    pub scalability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeResponse {
    pub metrics: CodeMetrics,
    pub summary: String,
    pub concepts: Vec<String>,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeforeAfter {
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GreyArea {
    pub topic: String,
    pub micro_lesson: String,
    pub before_after: BeforeAfter,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluateResponse {
    pub overall_feedback: String,
    pub overall_score: f64,
    pub coding_understanding: f64,
    #[serde(default)]
    pub grey_areas: Vec<GreyArea>,
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 10.0)
    }
}

impl AnalyzeResponse {
    fn normalized(mut self) -> Self {
        let m = &mut self.metrics;
        m.memory_management = clamp_score(m.memory_management);
        m.algorithmic_complexity = clamp_score(m.algorithmic_complexity);
        m.runtime_efficiency = clamp_score(m.runtime_efficiency);
        m.scalability = clamp_score(m.scalability);
        if self.questions.len() != QUESTION_COUNT {
            tracing::warn!(
                questions = self.questions.len(),
                "provider returned an unexpected number of questions"
            );
        }
        self
    }
}

impl EvaluateResponse {
    fn normalized(mut self) -> Self {
        self.overall_score = clamp_score(self.overall_score);
        self.coding_understanding = clamp_score(self.coding_understanding);
        self.grey_areas.truncate(MAX_GREY_AREAS);
        self
    }
}

pub fn analyze_prompt(project_digest: &str) -> String {
    format!(
        r#"You are Jury Mode of VibeFlow, an AI mentor.
Analyze the following project digest and return JSON with:

1) "metrics" - code quality metrics object with:
   - "memory_management": number 0-10 (memory efficiency, 10=best)
   - "algorithmic_complexity": number 0-10 (time complexity, 0=O(1), 10=O(n!))
   - "runtime_efficiency": number 0-10 (performance, 10=best)
   - "security": "Low" | "Medium" | "High" (risk level)
   - "reliability": {{ "handled": number, "unhandled": number }} (error handling counts)
   - "maintainability": "Good" | "Fair" | "Poor" (code quality)
   - "scalability": number 0-10 (modularity and extensibility, 10=best)

2) "summary" - 5-sentence beginner-friendly overview.

3) "concepts" - list of main topics (e.g., loops, async, OOP).

4) "questions" - EXACTLY 10 questions total:
   - First 7 questions: conceptual/viva-style questions about the project
   - Last 3 questions: coding questions that require code snippets as answers

PROJECT DIGEST:
{project_digest}

Return ONLY valid JSON matching this structure:
{{
  "metrics": {{
    "memory_management": 0,
    "algorithmic_complexity": 0,
    "runtime_efficiency": 0,
    "security": "Low",
    "reliability": {{ "handled": 0, "unhandled": 0 }},
    "maintainability": "Good",
    "scalability": 0
  }},
  "summary": "string",
  "concepts": ["string"],
  "questions": ["string"]
}}"#
    )
}

pub fn evaluate_prompt(project_summary: &str, answers: &[Answer]) -> Result<String> {
    let qa = serde_json::to_string_pretty(answers)?;
    Ok(format!(
        r#"You are the Jury AI in VibeFlow.
Evaluate each Q&A pair and return:
1) "overall_feedback" - 3 sentences about strengths + improvements.
2) "overall_score" - score out of 10 based on answer quality (number 0-10).
3) "coding_understanding" - score out of 10 for coding knowledge (number 0-10).
4) "grey_areas" - up to 3 items with:
   * "topic"
   * "micro_lesson" (2 sentences)
   * "before_after" with exactly 4 total lines (2 "before", 2 "after").

PROJECT SUMMARY:
{project_summary}

Q&A LIST:
{qa}

Return ONLY valid JSON matching this structure:
{{
  "overall_feedback": "string",
  "overall_score": 0,
  "coding_understanding": 0,
  "grey_areas": [
    {{
      "topic": "string",
      "micro_lesson": "string",
      "before_after": {{
        "before": "line1\nline2",
        "after": "line1\nline2"
      }}
    }}
  ]
}}"#
    ))
}

/// Runs jury prompts against a provider with a per-call deadline.
#[derive(Clone)]
pub struct JuryEngine {
    provider: Arc<dyn ReasoningProvider>,
    timeout: Duration,
}

impl JuryEngine {
    pub fn new(provider: Arc<dyn ReasoningProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider_name(&self) -> String {
        self.provider.name()
    }

    pub async fn analyze(
        &self,
        project_digest: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalyzeResponse> {
        let prompt = analyze_prompt(project_digest);
        tracing::info!(provider = %self.provider.name(), digest_chars = project_digest.chars().count(), "jury analyze");
        let text =
            complete_with_deadline(self.provider.as_ref(), &prompt, self.timeout, cancel).await?;
        tracing::debug!(reply_chars = text.len(), "analyze reply received");
        let reply: AnalyzeResponse = parse_json_reply(&text)?;
        if reply.questions.is_empty() {
            anyhow::bail!("provider reply contains no questions");
        }
        Ok(reply.normalized())
    }

    pub async fn evaluate(
        &self,
        project_summary: &str,
        answers: &[Answer],
        cancel: &CancellationToken,
    ) -> Result<EvaluateResponse> {
        let prompt = evaluate_prompt(project_summary, answers)?;
        tracing::info!(provider = %self.provider.name(), answers = answers.len(), "jury evaluate");
        let text =
            complete_with_deadline(self.provider.as_ref(), &prompt, self.timeout, cancel).await?;
        let reply: EvaluateResponse = parse_json_reply(&text)?;
        Ok(reply.normalized())
    }
}
