//! HTTP client for the jury API.
//!
//! [`JuryApi`] is the seam the [`crate::orchestrator`] drives; the
//! [`HttpJuryClient`] implementation talks to a running `vf serve` (or any
//! server with the same contract). Non-2xx replies are decoded from the
//! server's `{error, retryAfter?, details?}` body into a [`ClientError`].
//! No retries are made here; the orchestrator surfaces the error and lets
//! the user try again.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::jury::{AnalyzeResponse, Answer, EvaluateResponse};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// 429 from the server's rate governor.
    #[error("{message} (retry in {retry_after}s)")]
    RateLimited { message: String, retry_after: u64 },
    /// Any other 4xx, e.g. a missing field.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// 5xx: the provider call failed on the server side.
    #[error("{message}: {details}")]
    Upstream { message: String, details: String },
    #[error("jury API unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait JuryApi: Send + Sync {
    async fn analyze(&self, project_digest: &str) -> Result<AnalyzeResponse, ClientError>;

    async fn evaluate(
        &self,
        project_summary: &str,
        answers: &[Answer],
    ) -> Result<EvaluateResponse, ClientError>;
}

pub struct HttpJuryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJuryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "jury request");
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let text = resp.text().await.unwrap_or_default();
        Err(decode_error(status.as_u16(), &text))
    }
}

#[derive(Deserialize, Default)]
struct ErrorReply {
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "retryAfter", default)]
    retry_after: Option<u64>,
    #[serde(default)]
    details: Option<String>,
}

fn decode_error(status: u16, body: &str) -> ClientError {
    let reply: ErrorReply = serde_json::from_str(body).unwrap_or_default();
    let message = reply
        .error
        .unwrap_or_else(|| format!("HTTP {}", status));
    match status {
        429 => ClientError::RateLimited {
            message,
            retry_after: reply.retry_after.unwrap_or(60),
        },
        400..=499 => ClientError::Rejected { status, message },
        _ => ClientError::Upstream {
            message,
            details: reply.details.unwrap_or_else(|| body.trim().to_string()),
        },
    }
}

#[async_trait]
impl JuryApi for HttpJuryClient {
    async fn analyze(&self, project_digest: &str) -> Result<AnalyzeResponse, ClientError> {
        self.post(
            "/jury/analyze",
            serde_json::json!({ "project_digest": project_digest }),
        )
        .await
    }

    async fn evaluate(
        &self,
        project_summary: &str,
        answers: &[Answer],
    ) -> Result<EvaluateResponse, ClientError> {
        self.post(
            "/jury/evaluate",
            serde_json::json!({
                "project_summary": project_summary,
                "answers": answers,
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rate_limited() {
        let err = decode_error(
            429,
            r#"{"error":"Rate limit exceeded (10 requests per minute)","retryAfter":42}"#,
        );
        match err {
            ClientError::RateLimited {
                message,
                retry_after,
            } => {
                assert_eq!(message, "Rate limit exceeded (10 requests per minute)");
                assert_eq!(retry_after, 42);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_decode_bad_request() {
        let err = decode_error(400, r#"{"error":"project_digest is required"}"#);
        assert!(matches!(err, ClientError::Rejected { status: 400, .. }));
        assert_eq!(
            err.to_string(),
            "request rejected (400): project_digest is required"
        );
    }

    #[test]
    fn test_decode_upstream_keeps_details() {
        let err = decode_error(
            500,
            r#"{"error":"Analysis failed","details":"provider reply is not valid JSON"}"#,
        );
        assert_eq!(
            err.to_string(),
            "Analysis failed: provider reply is not valid JSON"
        );
    }

    #[test]
    fn test_decode_non_json_body() {
        let err = decode_error(502, "Bad Gateway");
        match err {
            ClientError::Upstream { message, details } => {
                assert_eq!(message, "HTTP 502");
                assert_eq!(details, "Bad Gateway");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpJuryClient::new("http://localhost:3001/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "http://localhost:3001");
    }
}
