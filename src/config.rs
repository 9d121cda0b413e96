use crate::error::ConfigError;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

const LOCAL_CONFIG: &str = ".ec2-reservation-check.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Region to query
    pub region: String,
    /// Diagnostic verbosity (trace, debug, info, warn, error)
    pub log_level: String,
    /// Append instance names to unreserved lines
    pub names: bool,
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            names: false,
            output: OutputFormat::Text,
        }
    }
}

/// Values given on the command line; each one wins over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<String>,
    pub log_level: Option<String>,
    pub names: bool,
    pub output: Option<OutputFormat>,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try the local file, then ~/.config/ec2-reservation-check/config.toml
            let local = PathBuf::from(LOCAL_CONFIG);
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("ec2-reservation-check").join("config.toml"))
                    .unwrap_or(local)
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))
                .with_context(|| format!("Failed to parse config: {}", config_path.display()))?;
            Ok(config)
        } else {
            if path.is_some() {
                eprintln!("WARNING: Config file not found: {}", config_path.display());
                eprintln!("   Using default configuration.");
            }
            Ok(Config::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(region) = overrides.region {
            self.region = region;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if overrides.names {
            self.names = true;
        }
        if let Some(output) = overrides.output {
            self.output = output;
        }
        self
    }
}

/// Parse a log level name.
///
/// Case-insensitive. Also accepts `warning`, `critical` and `fatal`.
pub fn parse_log_level(level: &str) -> std::result::Result<LevelFilter, ConfigError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Ok(LevelFilter::WARN),
        "critical" | "fatal" => Ok(LevelFilter::ERROR),
        other => other.parse().map_err(|_| ConfigError::InvalidValue {
            field: "log".to_string(),
            reason: format!(
                "unknown level '{}' (expected trace, debug, info, warn, error or off)",
                level
            ),
        }),
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}
