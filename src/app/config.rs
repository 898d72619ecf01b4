use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL,
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEMO_PACING_MS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL_NAME,
    ENV_PREFIX, HTTP_REQUEST_TIMEOUT_SECS, LOCAL_CONFIG_PATH,
};
use crate::utils::MarkError;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend model configuration
    #[serde(default)]
    pub model: ModelSettings,

    /// Streaming agent configuration
    #[serde(default)]
    pub agent: AgentSettings,

    /// Offline demo backend configuration
    #[serde(default)]
    pub demo: DemoSettings,
}

/// Backend model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model name sent with each request
    pub name: String,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    /// Temperature for generation
    pub temperature: Option<f32>,
    /// Maximum tokens to generate per reply
    pub max_tokens: usize,
    /// HTTP request timeout
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Streaming agent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Chunks buffered between the producer task and the consumer
    pub channel_capacity: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Demo backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoSettings {
    /// Delay between streamed words
    pub pacing_ms: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            pacing_ms: DEFAULT_DEMO_PACING_MS,
        }
    }
}

impl Config {
    fn validate(self) -> Result<Self, MarkError> {
        if self.model.max_tokens == 0 {
            return Err(MarkError::Config("model.max_tokens must be positive".to_string()));
        }
        if self.agent.channel_capacity == 0 {
            return Err(MarkError::Config(
                "agent.channel_capacity must be positive".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Load configuration from multiple sources
///
/// Defaults, then the global and project-local files (or `explicit` alone),
/// then `MARK_` environment variables with `__` separating nested keys.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(MarkError::Config(format!(
                    "config file not found: {}",
                    path.display()
                ))
                .into());
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            if let Some(global_config) = config_dir().map(|dir| dir.join(CONFIG_FILE_NAME)) {
                if global_config.exists() {
                    figment = figment.merge(Toml::file(&global_config));
                }
            }

            let local_config = PathBuf::from(LOCAL_CONFIG_PATH);
            if local_config.exists() {
                figment = figment.merge(Toml::file(&local_config));
            }
        }
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment
        .extract()
        .context("Failed to load configuration")?;
    Ok(config.validate()?)
}

/// Platform configuration directory, if one can be determined
pub fn config_dir() -> Option<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", CONFIG_DIR_NAME) {
        return Some(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to home directory
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join(CONFIG_DIR_NAME))
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
///
/// Returns the path and whether a new file was written.
pub fn init_config() -> Result<(PathBuf, bool)> {
    let config_file = config_dir()
        .context("Could not determine configuration directory")?
        .join(CONFIG_FILE_NAME);

    if config_file.exists() {
        return Ok((config_file, false));
    }

    save_config(&Config::default(), &config_file)?;
    Ok((config_file, true))
}
