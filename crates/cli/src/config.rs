//! Configuration loading from skiff.toml.

use runtime::DEFAULT_MAX_CYCLES;
use runtime::providers::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the current directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "skiff.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Agent loop configuration.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Backend provider configuration.
///
/// The API key is deliberately absent: it only comes from the environment.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per model call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Optional system prompt.
    pub system: Option<String>,

    /// Override for the messages endpoint.
    pub endpoint: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            system: None,
            endpoint: None,
        }
    }
}

/// Agent loop configuration.
#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// Maximum model calls per request; 0 means unbounded.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: usize,

    /// Directory tools operate in. Defaults to the current directory.
    pub working_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
            working_dir: None,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_max_cycles() -> usize {
    DEFAULT_MAX_CYCLES
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load an explicitly requested file, or `skiff.toml` if present, or
    /// fall back to defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// The cycle bound as the agent expects it.
    pub fn cycle_limit(&self) -> Option<usize> {
        cycle_limit(self.agent.max_cycles)
    }
}

/// Command-line choices; each one set wins over the environment and the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub max_cycles: Option<usize>,
    pub working_dir: Option<PathBuf>,
}

/// What the agent is built with.
#[derive(Debug, PartialEq, Eq)]
pub struct Settings {
    pub model: String,
    pub cycle_limit: Option<usize>,
    /// `None` means the current directory.
    pub working_dir: Option<PathBuf>,
}

impl Config {
    /// Model precedence is flag, then `env_model`, then the file (which
    /// already carries the default). Cycles and working dir skip the
    /// environment.
    pub fn settings(&self, overrides: Overrides, env_model: Option<String>) -> Settings {
        let model = overrides
            .model
            .or(env_model.filter(|m| !m.trim().is_empty()))
            .unwrap_or_else(|| self.backend.model.clone());
        let cycle_limit = match overrides.max_cycles {
            Some(max) => cycle_limit(max),
            None => self.cycle_limit(),
        };

        Settings {
            model,
            cycle_limit,
            working_dir: overrides
                .working_dir
                .or_else(|| self.agent.working_dir.clone()),
        }
    }
}

/// `0` disables the bound.
pub fn cycle_limit(max_cycles: usize) -> Option<usize> {
    (max_cycles > 0).then_some(max_cycles)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),
}
