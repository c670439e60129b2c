use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CadenzaConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Library server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the library server; relative media URLs resolve against it
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".into()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if `base_url` is not an absolute URL.
    pub fn base_url(&self) -> Result<url::Url> {
        url::Url::parse(&self.base_url).map_err(|e| CoreError::ConfigInvalid {
            message: format!("server.base_url \"{}\": {e}", self.base_url),
        })
    }
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Initial volume, 0 to 100
    #[serde(default = "default_volume")]
    pub volume: u8,
    /// Advance to the next entry when a track ends
    #[serde(default = "default_true")]
    pub autoplay: bool,
}

const fn default_volume() -> u8 {
    70
}

const fn default_true() -> bool {
    true
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            autoplay: true,
        }
    }
}

/// Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_local_limit")]
    pub local_limit: usize,
    #[serde(default = "default_external_limit")]
    pub external_limit: usize,
    /// Catalog platform passed to the server's music search proxy
    #[serde(default = "default_platform")]
    pub platform: String,
}

const fn default_local_limit() -> usize {
    crate::search::DEFAULT_LOCAL_LIMIT
}

const fn default_external_limit() -> usize {
    crate::search::DEFAULT_EXTERNAL_LIMIT
}

fn default_platform() -> String {
    "deezer".into()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            local_limit: default_local_limit(),
            external_limit: default_external_limit(),
            platform: default_platform(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file in the cache directory
    #[serde(default)]
    pub enabled: bool,
}

impl CadenzaConfig {
    /// Get the configuration directory path (~/.config/cadenza/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/cadenza/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path or create the template on first run
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after writing the template, or an error if
    /// the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `path`, writing the template there if it is missing
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after writing the template, or an error if
    /// the file cannot be read, parsed or validated.
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config text
    ///
    /// # Errors
    ///
    /// Returns an error on TOML syntax errors or invalid values.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.server.base_url()?;
        if self.player.volume > 100 {
            return Err(CoreError::ConfigInvalid {
                message: format!("player.volume must be 0-100, got {}", self.player.volume),
            });
        }
        if self.server.timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "server.timeout_secs must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

/// Template written on first run
pub const CONFIG_TEMPLATE: &str = r#"# Cadenza Configuration
# ~/.config/cadenza/config.toml

[server]
# Library server that hosts /api/song, /search and the music search proxy
base_url = "http://127.0.0.1:5000"
timeout_secs = 10
connect_timeout_secs = 5

[player]
# Initial volume, 0-100
volume = 70
# Play the next playlist entry when a track ends (wraps to the first)
autoplay = true

[search]
local_limit = 5
external_limit = 8
platform = "deezer"

[logging]
# Also write logs to <cache dir>/cadenza/cadenza.log
enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = CadenzaConfig::parse(CONFIG_TEMPLATE).unwrap();
        let defaults = CadenzaConfig::default();
        assert_eq!(config.server.base_url, defaults.server.base_url);
        assert_eq!(config.player.volume, defaults.player.volume);
        assert_eq!(config.search.external_limit, defaults.search.external_limit);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = CadenzaConfig::parse("").unwrap();
        assert_eq!(config.server.timeout(), Duration::from_secs(10));
        assert_eq!(config.search.local_limit, 5);
        assert!(config.player.autoplay);
    }

    #[test]
    fn test_invalid_base_url() {
        let err = CadenzaConfig::parse("[server]\nbase_url = \"not a url\"\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_volume_out_of_range() {
        let err = CadenzaConfig::parse("[player]\nvolume = 150\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_syntax_error() {
        let err = CadenzaConfig::parse("[server\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_load_or_create_writes_template() {
        let dir = std::env::temp_dir().join(format!("cadenza-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = fs::remove_file(&path);

        let err = CadenzaConfig::load_or_create_at(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
        assert!(path.exists());

        let config = CadenzaConfig::load_or_create_at(&path).unwrap();
        assert_eq!(config.player.volume, 70);

        let _ = fs::remove_dir_all(&dir);
    }
}
