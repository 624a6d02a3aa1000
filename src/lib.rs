//! # VibeFlow
//!
//! Turns a folder of source files into something a learner can look at and
//! be questioned on.
//!
//! A project is ingested from a flat file list, aggregated into totals and an
//! extension histogram, laid out as a directory/file hierarchy graph, and
//! compressed into a bounded text digest. The digest drives "jury mode": an
//! external reasoning provider generates questions about the project and
//! later grades the learner's answers, behind a per-client rate governor.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌──────────┐   ┌──────────────┐
//! │ Folder /   │──▶│ Aggregate + │──▶│  Digest  │──▶│ Jury session │
//! │ file list  │   │ Graph       │   │ (≤2000)  │   │ (client)     │
//! └────────────┘   └─────────────┘   └──────────┘   └──────┬───────┘
//!                                                          │ HTTP
//!                                                   ┌──────▼───────┐
//!                                                   │ Jury API     │
//!                                                   │ governor →   │
//!                                                   │ provider     │
//!                                                   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vf scan ./my-app              # totals, extensions, richest files
//! vf graph ./my-app             # hierarchy graph JSON
//! vf digest ./my-app            # prompt digest + hash
//! vf serve                      # jury HTTP API
//! vf jury ./my-app              # interactive session against the API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`ingest`] | File list → `ProjectFile`s |
//! | [`connector_fs`] | Local folder walker |
//! | [`aggregate`] | Totals, histogram, richest files |
//! | [`graph`] | Directory/file hierarchy graph |
//! | [`digest`] | Bounded prompt digest and cache |
//! | [`governor`] | Per-client rate limits |
//! | [`provider`] | Reasoning provider abstraction |
//! | [`jury`] | Jury prompts and reply types |
//! | [`server`] | Jury HTTP API |
//! | [`client`] | Jury HTTP client |
//! | [`orchestrator`] | Client-side jury state machine |
//! | [`reasoning`] | One-shot questions with local fallback |
//! | [`report`] | Plain-text project report |
//! | [`export`] | JSON export |
//! | [`progress`] | Ingestion progress reporting |

pub mod aggregate;
pub mod client;
pub mod config;
pub mod connector_fs;
pub mod digest;
pub mod export;
pub mod governor;
pub mod graph;
pub mod ingest;
pub mod jury;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod reasoning;
pub mod report;
pub mod server;
