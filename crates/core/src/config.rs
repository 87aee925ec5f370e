//! Server configuration
//!
//! Loaded from TOML or JSON depending on the file extension. Every section
//! falls back to its defaults, so a partial file is a valid file.

use crate::plugin::PLUGIN_API_VERSION;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub logging: LoggingConfig,
    pub plugins: PluginSettings,
    pub commands: CommandSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub name: String,
    /// Name of the world created when the server starts
    pub main_world: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: "Tessel Server".to_string(),
            main_world: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Plugin API version the host provides
    pub api_version: u32,
    /// Ignore plugins refusing to unload during shutdown
    pub force_unload_on_shutdown: bool,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            api_version: PLUGIN_API_VERSION,
            force_unload_on_shutdown: true,
        }
    }
}

/// Replies sent by the command dispatcher itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub failure_message: String,
    pub denied_message: String,
    pub unknown_message: String,
    /// Caller name reported for commands issued from the console
    pub console_name: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            failure_message: "&cCommand failed.".to_string(),
            denied_message: "&cYou are not allowed to use this command.".to_string(),
            unknown_message: "&cUnknown command.".to_string(),
            console_name: "Console".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file with format detection
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileNotFound(e.to_string()))?;

        let config: ServerConfig = match ConfigFormat::from_extension(path) {
            ConfigFormat::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseFailed(format!("JSON parse error: {}", e)))?,
            ConfigFormat::Toml => toml::from_str(&content)
                .map_err(|e| ConfigError::ParseFailed(format!("TOML parse error: {}", e)))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        let content = match ConfigFormat::from_extension(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::ParseFailed(format!("JSON serialize error: {}", e)))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::ParseFailed(format!("TOML serialize error: {}", e)))?,
        };

        std::fs::write(path, content).map_err(|e| ConfigError::FileNotFound(e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.is_empty() {
            return Err(ConfigError::Invalid("Server name cannot be empty".to_string()));
        }

        if self.server.name.len() > 64 {
            return Err(ConfigError::Invalid("Server name cannot exceed 64 characters".to_string()));
        }

        if self.server.main_world.is_empty() {
            return Err(ConfigError::Invalid("Main world name cannot be empty".to_string()));
        }

        if self.logging.level.is_empty() {
            return Err(ConfigError::Invalid("Log level cannot be empty".to_string()));
        }

        if self.plugins.api_version != PLUGIN_API_VERSION {
            return Err(ConfigError::Invalid(format!(
                "Plugin API version {} is not supported, expected {}",
                self.plugins.api_version, PLUGIN_API_VERSION
            )));
        }

        if self.commands.console_name.is_empty() {
            return Err(ConfigError::Invalid("Console name cannot be empty".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.server.name, "Tessel Server");
        assert_eq!(config.plugins.api_version, 1);
        assert!(config.plugins.force_unload_on_shutdown);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServerConfig::default();

        config.server.name = String::new();
        assert!(config.validate().is_err());

        config.server.name = "Test".to_string();
        config.plugins.api_version = 2;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [commands]
            failure_message = "nope"
            "#,
        )
        .unwrap();

        assert_eq!(config.commands.failure_message, "nope");
        assert_eq!(config.commands.console_name, "Console");
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_file_operations() {
        let mut config = ServerConfig::default();
        config.server.name = "Saved".to_string();

        let toml_file = NamedTempFile::with_suffix(".toml").unwrap();
        config.save_to_file(toml_file.path()).unwrap();
        assert_eq!(ServerConfig::load_from_file(toml_file.path()).unwrap(), config);

        let mut json_file = NamedTempFile::with_suffix(".json").unwrap();
        json_file.write_all(br#"{"logging": {"level": "debug", "json": true}}"#).unwrap();
        json_file.flush().unwrap();

        let loaded = ServerConfig::load_from_file(json_file.path()).unwrap();
        assert_eq!(loaded.logging.level, "debug");
        assert!(loaded.logging.json);
        assert_eq!(loaded.server, ServerSettings::default());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ServerConfig::load_from_file("/nonexistent/tessel.toml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
