use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub jury: JuryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            service: default_service(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3001".to_string()
}
fn default_service() -> String {
    "VibeFlow Jury Mode API".to_string()
}
fn default_sweep_interval_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_per_minute")]
    pub per_minute: usize,
    #[serde(default = "default_per_day")]
    pub per_day: u32,
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            per_day: default_per_day(),
            max_clients: default_max_clients(),
        }
    }
}

fn default_per_minute() -> usize {
    10
}
fn default_per_day() -> u32 {
    500
}
fn default_max_clients() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_provider")]
    pub kind: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider(),
            model: None,
            timeout_secs: default_timeout_secs(),
            api_key_env: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

impl ProviderConfig {
    pub fn is_enabled(&self) -> bool {
        self.kind != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JuryConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_digest_key")]
    pub digest_key: String,
}

impl Default for JuryConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            cooldown_secs: default_cooldown_secs(),
            digest_key: default_digest_key(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:3001".to_string()
}
fn default_cooldown_secs() -> u64 {
    7
}
fn default_digest_key() -> String {
    "coarse".to_string()
}

impl Config {
    /// Configuration used when no config file is present.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            ingest: IngestConfig::default(),
            provider: ProviderConfig::default(),
            jury: JuryConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Loads the config file when it exists, otherwise falls back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.limits.per_minute == 0 {
        anyhow::bail!("limits.per_minute must be > 0");
    }
    if config.limits.per_day == 0 {
        anyhow::bail!("limits.per_day must be > 0");
    }
    if config.limits.max_clients == 0 {
        anyhow::bail!("limits.max_clients must be > 0");
    }
    if config.server.sweep_interval_secs == 0 {
        anyhow::bail!("server.sweep_interval_secs must be > 0");
    }

    if config.ingest.max_file_bytes == 0 {
        anyhow::bail!("ingest.max_file_bytes must be > 0");
    }

    if config.provider.timeout_secs == 0 {
        anyhow::bail!("provider.timeout_secs must be > 0");
    }

    match config.provider.kind.as_str() {
        "disabled" | "gemini" | "deepseek" | "openrouter" => {}
        other => anyhow::bail!(
            "Unknown provider: '{}'. Must be disabled, gemini, deepseek, or openrouter.",
            other
        ),
    }

    match config.jury.digest_key.as_str() {
        "coarse" | "content" => {}
        other => anyhow::bail!(
            "Unknown jury.digest_key: '{}'. Must be coarse or content.",
            other
        ),
    }

    Ok(())
}
