//! Layered console settings
//!
//! Defaults, then an optional TOML file, then `ALERTS__*` environment
//! variables (e.g. `ALERTS__STREAM__USERNAME`).

use alert_stream::{StreamConfig, StreamError};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Config file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "alert-console.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ALERTS";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Console settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stream: StreamConfig,
    pub log: LogSettings,
}

impl Settings {
    /// Load settings from defaults, an optional file, and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, SettingsError> {
        let file = match path {
            Some(path) => {
                info!("Loading settings from {}", path.display());
                File::new(&path.to_string_lossy(), FileFormat::Toml).required(true)
            }
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Override the username, e.g. from the command line
    pub fn with_username(mut self, username: Option<String>) -> Self {
        if let Some(username) = username {
            self.stream.username = username;
        }
        self
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.stream.validate()?;
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_defaults_without_username_are_invalid() {
        let settings = Settings::load_with(None, env_from(&[])).unwrap();
        assert_eq!(settings.stream.snapshot_url, "http://localhost:8070/api/alerts");
        assert_eq!(settings.log.level, "info");
        assert!(matches!(settings.validate(), Err(SettingsError::Stream(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let env = env_from(&[
            ("ALERTS__STREAM__USERNAME", "amira"),
            ("ALERTS__STREAM__CONNECT_TIMEOUT_MS", "2500"),
            ("ALERTS__STREAM__RECONNECT__ENABLED", "true"),
            ("ALERTS__LOG__JSON", "true"),
        ]);
        let settings = Settings::load_with(None, env).unwrap();

        assert_eq!(settings.stream.username, "amira");
        assert_eq!(settings.stream.connect_timeout_ms, 2500);
        assert!(settings.stream.reconnect.enabled);
        assert!(settings.log.json);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_file_then_cli_override() {
        let dir = std::env::temp_dir().join(format!("alert-console-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[stream]\nusername = \"from-file\"\nsnapshot_url = \"http://aid.example/api/alerts\"\n\n[stream.notifications]\nttl_ms = 5000"
        )
        .unwrap();

        let settings = Settings::load_with(Some(&path), env_from(&[]))
            .unwrap()
            .with_username(Some("from-cli".to_string()));

        assert_eq!(settings.stream.username, "from-cli");
        assert_eq!(settings.stream.snapshot_url, "http://aid.example/api/alerts");
        assert_eq!(settings.stream.notifications.ttl_ms, 5000);
        assert_eq!(settings.stream.notifications.max_visible, 5);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load_with(Some(Path::new("/nonexistent/alerts.toml")), env_from(&[]));
        assert!(matches!(result, Err(SettingsError::Load(_))));
    }
}
