//! Configuration loading.
//!
//! Settings resolve in priority order: environment variable, then the TOML
//! config file, then the compiled default.

use serde::Deserialize;
use std::path::Path;

use crate::{Error, Result};

/// TOML configuration file contents. All fields optional — anything missing
/// falls back to an environment variable or the compiled default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Automation driver sidecar host
    pub driver_host: Option<String>,
    /// Automation driver sidecar port
    pub driver_port: Option<u16>,
    /// OpenAI-compatible API key
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible API base URL
    pub openai_base_url: Option<String>,
    /// Chat model used for analysis and reply generation
    pub openai_model: Option<String>,
    /// HTTP bind address
    pub bind_address: Option<String>,
    /// SQLite database path
    pub database_path: Option<String>,
}

impl TomlConfig {
    /// Load the TOML file at `path`, or an empty config if the file does
    /// not exist. A present-but-malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }
}

/// Fully-resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub driver_host: String,
    pub driver_port: u16,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub bind_address: String,
    pub database_path: String,
}

impl Config {
    /// Resolve configuration: ENV overrides TOML, TOML overrides defaults.
    pub fn resolve(toml: &TomlConfig) -> Self {
        Self {
            driver_host: resolve(
                "REELSCOUT_DRIVER_HOST",
                toml.driver_host.as_deref(),
                "localhost",
            ),
            driver_port: std::env::var("REELSCOUT_DRIVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(toml.driver_port)
                .unwrap_or(4723),
            openai_api_key: resolve("OPENAI_API_KEY", toml.openai_api_key.as_deref(), ""),
            openai_base_url: resolve(
                "OPENAI_BASE_URL",
                toml.openai_base_url.as_deref(),
                "https://api.openai.com/v1",
            ),
            openai_model: resolve("REELSCOUT_OPENAI_MODEL", toml.openai_model.as_deref(), "gpt-4o"),
            bind_address: resolve(
                "REELSCOUT_BIND",
                toml.bind_address.as_deref(),
                "127.0.0.1:5823",
            ),
            database_path: resolve(
                "REELSCOUT_DATABASE",
                toml.database_path.as_deref(),
                "reelscout.db",
            ),
        }
    }
}

fn resolve(env_key: &str, toml_value: Option<&str>, default: &str) -> String {
    std::env::var(env_key)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| toml_value.map(String::from))
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let toml = TomlConfig::load(Path::new("/nonexistent/reelscout.toml")).unwrap();
        assert!(toml.driver_host.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "driver_port = \"not a number").unwrap();
        assert!(TomlConfig::load(file.path()).is_err());
    }

    #[test]
    fn toml_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "driver_host = \"emulator\"\ndriver_port = 4724").unwrap();
        let toml = TomlConfig::load(file.path()).unwrap();
        let config = Config::resolve(&toml);
        assert_eq!(config.driver_host, "emulator");
        assert_eq!(config.driver_port, 4724);
        assert_eq!(config.openai_model, "gpt-4o");
    }
}
