//! Ingestion progress reporting.
//!
//! Large folders take a while to read, so ingestion emits progress events
//! on **stderr**; stdout stays clean for commands that print JSON
//! (`vf graph`, `vf export`). Each event knows how to render itself as a
//! human line or a JSON object; reporters only pick the format.

use serde_json::{json, Value};
use std::io::Write;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestProgressEvent {
    /// Walking the folder; total unknown.
    Discovering { root: String },
    /// `n` of `total` file bodies read.
    Reading { n: u64, total: u64 },
    /// All reads joined; `kept` files survived filtering.
    Done { kept: u64 },
}

impl IngestProgressEvent {
    pub fn human_line(&self) -> String {
        match self {
            Self::Discovering { root } => format!("ingest  scanning  {}", root),
            Self::Reading { n, total } => format!(
                "ingest  reading  {} / {} files",
                format_number(*n),
                format_number(*total)
            ),
            Self::Done { kept } => format!("ingest  done  {} files", format_number(*kept)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Discovering { root } => json!({ "phase": "discovering", "root": root }),
            Self::Reading { n, total } => json!({ "phase": "reading", "n": n, "total": total }),
            Self::Done { kept } => json!({ "phase": "done", "kept": kept }),
        }
    }
}

pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

fn write_stderr(line: &str) {
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{}", line);
    let _ = err.flush();
}

/// `ingest  reading  1,234 / 5,000 files` on stderr.
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        write_stderr(&event.human_line());
    }
}

/// One `{"event":"progress",...}` object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let mut obj = event.to_json();
        obj["event"] = json!("progress");
        write_stderr(&obj.to_string());
    }
}

pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

/// Thousands separators: `1234567` → `1,234,567`.
pub(crate) fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - head) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Value of the global `--progress` flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human when stderr is a terminal, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => anyhow::bail!("invalid progress mode '{}': use off, human, or json", other),
        }
    }

    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12_345), "12,345");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn parse_modes() {
        assert_eq!(ProgressMode::parse("off").unwrap(), ProgressMode::Off);
        assert_eq!(ProgressMode::parse("human").unwrap(), ProgressMode::Human);
        assert_eq!(ProgressMode::parse("json").unwrap(), ProgressMode::Json);
        assert!(ProgressMode::parse("loud").is_err());
    }

    #[test]
    fn event_rendering() {
        let event = IngestProgressEvent::Reading {
            n: 1500,
            total: 20_000,
        };
        assert_eq!(event.human_line(), "ingest  reading  1,500 / 20,000 files");
        assert_eq!(
            event.to_json(),
            json!({ "phase": "reading", "n": 1500, "total": 20000 })
        );
        assert_eq!(
            IngestProgressEvent::Done { kept: 3 }.human_line(),
            "ingest  done  3 files"
        );
    }
}
