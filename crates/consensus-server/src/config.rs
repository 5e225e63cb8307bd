use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use coordination::ensemble::{FanOut, OrchestratorConfig, ServiceLimits};
use coordination::generation::ollama::DEFAULT_OLLAMA_URL;
use coordination::generation::OllamaConfig;
use coordination::router::default_models;
use serde::Deserialize;

/// Command-line arguments
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML file overriding the environment defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind (overrides CONSENSUS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides CONSENSUS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Ollama base URL (overrides OLLAMA_URL)
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Comma-separated model rotation (overrides OLLAMA_MODELS)
    #[arg(long, value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Overall run deadline in seconds (overrides CONSENSUS_DEADLINE_SECS)
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Issue the calls of a round one at a time
    #[arg(long, default_value_t = false)]
    pub sequential: bool,
}

/// Invalid configuration values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one model must be configured")]
    NoModels,

    #[error("Model at position {0} is blank")]
    BlankModel(usize),

    #[error("{field} must be at least 1")]
    ZeroLimit { field: &'static str },

    #[error("Ollama URL must start with http:// or https://: {0}")]
    BadUrl(String),

    #[error("request_timeout_secs must be at least 1")]
    ZeroTimeout,

    #[error("run_deadline_secs must be in 1..={max}, got {value}")]
    DeadlineOutOfRange { value: u64, max: u64 },
}

/// Longest accepted run deadline (one day).
pub const MAX_RUN_DEADLINE_SECS: u64 = 24 * 60 * 60;

/// Server configuration.
///
/// Defaults come from the environment; a TOML file replaces any field it
/// names, and CLI flags win over both.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub ollama_url: String,
    pub models: Vec<String>,
    /// Per-call HTTP timeout against the backend
    pub request_timeout_secs: u64,
    /// Overall budget per orchestration run
    pub run_deadline_secs: Option<u64>,
    pub fan_out: FanOut,
    pub max_agents: usize,
    pub max_rounds: u32,
    /// Send prompts to Ollama in raw mode
    pub raw: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Split a comma-separated model list, dropping empty entries.
pub fn parse_models(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("CONSENSUS_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env_or("CONSENSUS_PORT", 5000),
            ollama_url: std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.into()),
            models: std::env::var("OLLAMA_MODELS")
                .map(|v| parse_models(&v))
                .unwrap_or_else(|_| default_models()),
            request_timeout_secs: env_or("OLLAMA_TIMEOUT_SECS", 300),
            run_deadline_secs: std::env::var("CONSENSUS_DEADLINE_SECS")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            fan_out: env_or("CONSENSUS_FAN_OUT", FanOut::Concurrent),
            max_agents: env_or("CONSENSUS_MAX_AGENTS", 32),
            max_rounds: env_or("CONSENSUS_MAX_ROUNDS", 16),
            raw: true,
        }
    }
}

impl ServerConfig {
    /// Environment defaults, overlaid with `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Load, apply CLI overrides and validate.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = Self::load(args.config.as_deref())?;
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref host) = args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(ref url) = args.ollama_url {
            self.ollama_url = url.clone();
        }
        if let Some(ref models) = args.models {
            self.models = models.iter().map(|m| m.trim().to_string()).collect();
        }
        if let Some(secs) = args.deadline_secs {
            self.run_deadline_secs = Some(secs);
        }
        if args.sequential {
            self.fan_out = FanOut::Sequential;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        if let Some(pos) = self.models.iter().position(|m| m.trim().is_empty()) {
            return Err(ConfigError::BlankModel(pos));
        }
        if self.max_agents == 0 {
            return Err(ConfigError::ZeroLimit { field: "max_agents" });
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::ZeroLimit { field: "max_rounds" });
        }
        if !self.ollama_url.starts_with("http://") && !self.ollama_url.starts_with("https://") {
            return Err(ConfigError::BadUrl(self.ollama_url.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Some(value) = self.run_deadline_secs {
            if !(1..=MAX_RUN_DEADLINE_SECS).contains(&value) {
                return Err(ConfigError::DeadlineOutOfRange {
                    value,
                    max: MAX_RUN_DEADLINE_SECS,
                });
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.ollama_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            raw: self.raw,
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            fan_out: self.fan_out,
            deadline: self.run_deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn limits(&self) -> ServiceLimits {
        ServiceLimits {
            max_agents: self.max_agents,
            max_rounds: self.max_rounds,
        }
    }
}
