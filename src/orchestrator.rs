//! Client-side jury session.
//!
//! ```text
//! Idle ──begin──▶ Analyzing ──ok──▶ Questions ──submit──▶ Evaluating ──ok──▶ Result
//!  ▲                  │                 ▲                     │
//!  └──────error───────┘                 └────────error────────┘
//! ```
//!
//! `begin` and `submit` are no-ops unless their guards hold: a digest is
//! present, the disclaimer was accepted, the session is not cooling down,
//! and (for `submit`) every question has a non-blank answer. A failed call
//! rolls the stage back and keeps what the user already typed; the message
//! is kept in [`JurySession::last_error`].
//!
//! The cooldown starts right before each outbound call and lasts a fixed
//! time whatever the outcome. It is a courtesy throttle only; the server's
//! rate governor remains the authority.

use std::time::Duration;
use tokio::time::Instant;

use crate::client::JuryApi;
use crate::jury::{AnalyzeResponse, Answer, EvaluateResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JuryStage {
    Idle,
    Analyzing,
    Questions,
    Evaluating,
    Result,
}

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocked {
    WrongStage(JuryStage),
    NoDigest,
    DisclaimerPending,
    CoolingDown,
    UnansweredQuestions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Guards failed; nothing was sent and nothing changed.
    Ignored(Blocked),
    Advanced,
    /// The call failed and the stage was rolled back.
    RolledBack,
}

pub struct JurySession {
    stage: JuryStage,
    digest: Option<String>,
    disclaimer_accepted: bool,
    cooldown: Duration,
    cooldown_until: Option<Instant>,
    analysis: Option<AnalyzeResponse>,
    answers: Vec<String>,
    result: Option<EvaluateResponse>,
    last_error: Option<String>,
}

impl JurySession {
    pub fn new(digest: Option<String>, cooldown: Duration) -> Self {
        Self {
            stage: JuryStage::Idle,
            digest: digest.filter(|d| !d.is_empty()),
            disclaimer_accepted: false,
            cooldown,
            cooldown_until: None,
            analysis: None,
            answers: Vec::new(),
            result: None,
            last_error: None,
        }
    }

    pub fn stage(&self) -> JuryStage {
        self.stage
    }

    pub fn analysis(&self) -> Option<&AnalyzeResponse> {
        self.analysis.as_ref()
    }

    pub fn questions(&self) -> &[String] {
        self.analysis
            .as_ref()
            .map(|a| a.questions.as_slice())
            .unwrap_or(&[])
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn result(&self) -> Option<&EvaluateResponse> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn accept_disclaimer(&mut self) {
        self.disclaimer_accepted = true;
    }

    pub fn in_cooldown(&self) -> bool {
        self.cooldown_until
            .map(|until| Instant::now() < until)
            .unwrap_or(false)
    }

    pub fn cooldown_remaining(&self) -> Duration {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    fn start_cooldown(&mut self) {
        self.cooldown_until = Some(Instant::now() + self.cooldown);
    }

    /// Records an answer; ignored outside `Questions` or for an unknown index.
    pub fn set_answer(&mut self, index: usize, answer: impl Into<String>) -> bool {
        if self.stage != JuryStage::Questions {
            return false;
        }
        match self.answers.get_mut(index) {
            Some(slot) => {
                *slot = answer.into();
                true
            }
            None => false,
        }
    }

    pub fn all_answered(&self) -> bool {
        !self.answers.is_empty() && self.answers.iter().all(|a| !a.trim().is_empty())
    }

    /// `Idle` → `Analyzing` → `Questions` (or back to `Idle` on failure).
    pub async fn begin(&mut self, api: &dyn JuryApi) -> Step {
        if self.stage != JuryStage::Idle {
            return Step::Ignored(Blocked::WrongStage(self.stage));
        }
        let digest = match &self.digest {
            Some(d) => d.clone(),
            None => return Step::Ignored(Blocked::NoDigest),
        };
        if !self.disclaimer_accepted {
            return Step::Ignored(Blocked::DisclaimerPending);
        }
        if self.in_cooldown() {
            return Step::Ignored(Blocked::CoolingDown);
        }

        self.start_cooldown();
        self.stage = JuryStage::Analyzing;
        self.last_error = None;

        match api.analyze(&digest).await {
            Ok(analysis) if analysis.questions.is_empty() => {
                tracing::warn!("analysis came back without questions");
                self.last_error = Some("analysis returned no questions".to_string());
                self.stage = JuryStage::Idle;
                Step::RolledBack
            }
            Ok(analysis) => {
                tracing::debug!(questions = analysis.questions.len(), "analysis received");
                self.answers = vec![String::new(); analysis.questions.len()];
                self.analysis = Some(analysis);
                self.stage = JuryStage::Questions;
                Step::Advanced
            }
            Err(e) => {
                tracing::warn!(error = %e, "analyze failed");
                self.last_error = Some(e.to_string());
                self.stage = JuryStage::Idle;
                Step::RolledBack
            }
        }
    }

    /// `Questions` → `Evaluating` → `Result` (or back to `Questions` on failure).
    pub async fn submit(&mut self, api: &dyn JuryApi) -> Step {
        if self.stage != JuryStage::Questions {
            return Step::Ignored(Blocked::WrongStage(self.stage));
        }
        if !self.all_answered() {
            return Step::Ignored(Blocked::UnansweredQuestions);
        }
        if self.in_cooldown() {
            return Step::Ignored(Blocked::CoolingDown);
        }
        let (summary, pairs) = match &self.analysis {
            Some(analysis) => (
                analysis.summary.clone(),
                analysis
                    .questions
                    .iter()
                    .zip(&self.answers)
                    .map(|(q, a)| Answer {
                        question: q.clone(),
                        answer: a.clone(),
                    })
                    .collect::<Vec<_>>(),
            ),
            None => return Step::Ignored(Blocked::WrongStage(self.stage)),
        };

        self.start_cooldown();
        self.stage = JuryStage::Evaluating;
        self.last_error = None;

        match api.evaluate(&summary, &pairs).await {
            Ok(result) => {
                self.result = Some(result);
                self.stage = JuryStage::Result;
                Step::Advanced
            }
            Err(e) => {
                tracing::warn!(error = %e, "evaluate failed");
                self.last_error = Some(e.to_string());
                self.stage = JuryStage::Questions;
                Step::RolledBack
            }
        }
    }
}
