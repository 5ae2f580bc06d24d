//! Configuration management with YAML support

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

/// Species source (PokeAPI) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Loader behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Pause after each id that hit the network
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Read the generation from the species record instead of storing 1
    #[serde(default)]
    pub derive_generation: bool,
}

// Default value functions
fn default_database_path() -> String {
    "~/.local/share/pokedex/pokedex.db".to_string()
}

fn default_base_url() -> String {
    "https://pokeapi.co/api/v2".to_string()
}

fn default_user_agent() -> String {
    format!("pokedex/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_delay_ms() -> u64 {
    100
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            derive_generation: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./pokedex.yaml (current directory)
    /// 3. ~/.config/pokedex/pokedex.yaml
    pub fn load(path: &str) -> Result<Self> {
        let search_paths = vec![
            shellexpand::tilde(path).to_string(),
            "pokedex.yaml".to_string(),
            shellexpand::tilde("~/.config/pokedex/pokedex.yaml").to_string(),
        ];

        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                let content = std::fs::read_to_string(search_path)?;
                let config: Config = serde_yaml::from_str(&content)
                    .with_context(|| format!("Invalid config file {}", search_path))?;
                tracing::debug!(path = %search_path, "loaded config");
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.database.path).to_string();
        PathBuf::from(expanded)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.ingest.request_delay_ms)
    }
}
