//! # VibeFlow CLI (`vf`)
//!
//! The `vf` binary ingests a local project folder and exposes every stage of
//! the pipeline: reports, the hierarchy graph, the prompt digest, JSON
//! export, the jury HTTP API, and an interactive jury session.
//!
//! ## Usage
//!
//! ```bash
//! vf --config ./config/vf.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vf scan <dir>` | Ingest a folder and print totals, extensions, richest files |
//! | `vf graph <dir>` | Print the directory/file hierarchy graph as JSON |
//! | `vf digest <dir>` | Print the bounded prompt digest and its hash |
//! | `vf export <dir>` | Write the processed project as JSON |
//! | `vf serve` | Start the jury HTTP API |
//! | `vf jury <dir>` | Run an interactive jury session against the API |
//! | `vf ask <dir> "<question>"` | Ask the configured provider about a project |
//!
//! ## Examples
//!
//! ```bash
//! # Quick look at a project
//! vf scan ~/code/my-app
//!
//! # Graph JSON for a front-end
//! vf graph ~/code/my-app > graph.json
//!
//! # Start the API, then run a session from another terminal
//! GEMINI_API_KEY=... vf serve --config ./config/vf.toml
//! vf jury ~/code/my-app
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;

use vibeflow::client::HttpJuryClient;
use vibeflow::config::{self, Config};
use vibeflow::connector_fs::load_project;
use vibeflow::digest::{DigestCache, DigestKeyMode};
use vibeflow::export::run_export;
use vibeflow::jury::{AnalyzeResponse, EvaluateResponse};
use vibeflow::models::ProcessedProject;
use vibeflow::orchestrator::{Blocked, JurySession, JuryStage, Step};
use vibeflow::progress::ProgressMode;
use vibeflow::provider::{create_provider, ReasoningProvider};
use vibeflow::{reasoning, report, server};

const DISCLAIMER: &str = "Jury Mode sends a compact digest of your project (file names, \
totals, construct counts) to the configured AI provider. Scores and feedback are \
AI-generated and may be wrong.";

/// VibeFlow CLI: understand a codebase and get quizzed on it.
#[derive(Parser)]
#[command(
    name = "vf",
    about = "VibeFlow: project visualisation, digests, and AI jury sessions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/vf.toml`; built-in defaults are used when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/vf.toml")]
    config: PathBuf,

    /// Ingest progress on stderr: off, human, or json.
    ///
    /// Defaults to human when stderr is a terminal, otherwise off.
    #[arg(long, global = true)]
    progress: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a folder and print a summary report.
    Scan { dir: PathBuf },

    /// Print the hierarchy graph as JSON.
    Graph { dir: PathBuf },

    /// Print the prompt digest and its hash.
    Digest { dir: PathBuf },

    /// Export the processed project as JSON.
    Export {
        dir: PathBuf,

        /// Output file path. If omitted, writes to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Start the jury HTTP API.
    Serve,

    /// Run an interactive jury session against `[jury].api_url`.
    Jury {
        dir: PathBuf,

        /// Accept the disclaimer without prompting.
        #[arg(long)]
        yes: bool,
    },

    /// Ask the configured provider a question about the project.
    Ask { dir: PathBuf, question: String },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_or_minimal(&cli.config)?;
    let progress = match cli.progress.as_deref() {
        Some(mode) => ProgressMode::parse(mode)?,
        None => ProgressMode::default_for_tty(),
    };

    match cli.command {
        Commands::Scan { dir } => {
            let project = load(&dir, &cfg, progress).await?;
            print!("{}", report::render_report(&project, &dir.display().to_string()));
        }
        Commands::Graph { dir } => {
            let project = load(&dir, &cfg, progress).await?;
            println!("{}", serde_json::to_string_pretty(&project.graph_elements)?);
        }
        Commands::Digest { dir } => {
            let project = load(&dir, &cfg, progress).await?;
            let cache = DigestCache::new(DigestKeyMode::parse(&cfg.jury.digest_key)?);
            let digest = cache.digest(&project);
            println!("{}", digest.digest);
            println!();
            println!("hash: {}", digest.hash);
        }
        Commands::Export { dir, output } => {
            let project = load(&dir, &cfg, progress).await?;
            run_export(&project, output.as_deref())?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Jury { dir, yes } => {
            let project = load(&dir, &cfg, progress).await?;
            run_jury(&project, &cfg, yes).await?;
        }
        Commands::Ask { dir, question } => {
            let project = load(&dir, &cfg, progress).await?;
            run_ask(&project, &cfg, &question).await?;
        }
    }

    Ok(())
}

async fn load(dir: &Path, cfg: &Config, progress: ProgressMode) -> Result<ProcessedProject> {
    let reporter = progress.reporter();
    load_project(dir, &cfg.ingest, reporter.as_ref()).await
}

async fn run_ask(project: &ProcessedProject, cfg: &Config, question: &str) -> Result<()> {
    let provider: Box<dyn ReasoningProvider> = match create_provider(&cfg.provider) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Warning: {:#}", e);
            Box::new(vibeflow::provider::DisabledProvider)
        }
    };
    let reply = reasoning::ask(
        provider.as_ref(),
        project,
        question,
        Duration::from_secs(cfg.provider.timeout_secs),
        &CancellationToken::new(),
    )
    .await;
    if let Some(reason) = &reply.fallback_reason {
        eprintln!("Provider unavailable: {}", reason);
    }
    println!("{}", reply.text);
    Ok(())
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    match lines.next_line().await? {
        Some(line) => Ok(line),
        None => bail!("stdin closed before the session finished"),
    }
}

async fn run_jury(project: &ProcessedProject, cfg: &Config, yes: bool) -> Result<()> {
    let cache = DigestCache::new(DigestKeyMode::parse(&cfg.jury.digest_key)?);
    let digest = cache.digest(project);
    let client = HttpJuryClient::new(
        &cfg.jury.api_url,
        Duration::from_secs(cfg.provider.timeout_secs + 10),
    )?;
    let mut session = JurySession::new(
        Some(digest.digest),
        Duration::from_secs(cfg.jury.cooldown_secs),
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", DISCLAIMER);
    if !yes {
        println!("Type 'yes' to continue:");
        let reply = read_line(&mut lines).await?;
        if !reply.trim().eq_ignore_ascii_case("yes") {
            println!("Disclaimer not accepted; nothing was sent.");
            return Ok(());
        }
    }
    session.accept_disclaimer();

    println!("Analyzing project ({} files)...", project.summary.total_files);
    match session.begin(&client).await {
        Step::Advanced => {}
        Step::RolledBack => bail!(
            "Analysis failed: {}",
            session.last_error().unwrap_or("unknown error")
        ),
        Step::Ignored(reason) => bail!("Cannot start the session: {:?}", reason),
    }
    if let Some(analysis) = session.analysis() {
        print_analysis(analysis);
    }

    let count = session.questions().len();
    for index in 0..count {
        let question = session.questions()[index].clone();
        println!("\n[{}/{}] {}", index + 1, count, question);
        loop {
            let answer = read_line(&mut lines).await?;
            if !answer.trim().is_empty() {
                session.set_answer(index, answer);
                break;
            }
            println!("An answer is required.");
        }
    }

    while session.stage() == JuryStage::Questions {
        let wait = session.cooldown_remaining();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        println!("\nEvaluating answers...");
        match session.submit(&client).await {
            Step::Advanced => {}
            Step::RolledBack => {
                eprintln!(
                    "Evaluation failed: {}",
                    session.last_error().unwrap_or("unknown error")
                );
                println!("Your answers are kept. Press Enter to retry, or type 'q' to quit:");
                if read_line(&mut lines).await?.trim() == "q" {
                    return Ok(());
                }
            }
            Step::Ignored(Blocked::CoolingDown) => continue,
            Step::Ignored(reason) => bail!("Cannot submit answers: {:?}", reason),
        }
    }

    if let Some(result) = session.result() {
        print_result(result);
    }
    Ok(())
}

fn print_analysis(analysis: &AnalyzeResponse) {
    let m = &analysis.metrics;
    println!();
    println!("Summary");
    println!("=======");
    println!("{}", analysis.summary);
    println!();
    println!("  Memory management:      {:.1} / 10", m.memory_management);
    println!("  Algorithmic complexity: {:.1} / 10", m.algorithmic_complexity);
    println!("  Runtime efficiency:     {:.1} / 10", m.runtime_efficiency);
    println!("  Scalability:            {:.1} / 10", m.scalability);
    println!("  Security risk:          {:?}", m.security);
    println!("  Maintainability:        {:?}", m.maintainability);
    println!(
        "  Error handling:         {} handled, {} unhandled",
        m.reliability.handled, m.reliability.unhandled
    );
    if !analysis.concepts.is_empty() {
        println!();
        println!("Concepts: {}", analysis.concepts.join(", "));
    }
}

fn print_result(result: &EvaluateResponse) {
    println!();
    println!("Verdict");
    println!("=======");
    println!("{}", result.overall_feedback);
    println!();
    println!("  Overall score:        {:.1} / 10", result.overall_score);
    println!("  Coding understanding: {:.1} / 10", result.coding_understanding);
    for area in &result.grey_areas {
        println!();
        println!("Grey area: {}", area.topic);
        println!("  {}", area.micro_lesson);
        println!("  Before:");
        for line in area.before_after.before.lines() {
            println!("    {}", line);
        }
        println!("  After:");
        for line in area.before_after.after.lines() {
            println!("    {}", line);
        }
    }
}
