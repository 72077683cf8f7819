//! Configuration loading and types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for the fleetpack server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address and port to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Snapshot directory; packets and specs live only in memory when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Bearer token required on every route except `/health`
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Largest total size an uploaded packet may unpack to, in bytes
    #[serde(default = "default_max_unpacked_bytes")]
    pub max_unpacked_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            data_dir: None,
            auth_token: None,
            max_upload_bytes: default_max_upload_bytes(),
            max_unpacked_bytes: default_max_unpacked_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_max_unpacked_bytes() -> u64 {
    fleetpack_packet::MAX_UNPACKED_BYTES
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from default paths or use defaults
    ///
    /// Returns the file the configuration came from, if any. Nothing is
    /// logged here since tracing is configured from the result.
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default() -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Ok(path) = std::env::var("FLEETPACK_CONFIG") {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        let mut paths = vec![
            PathBuf::from("fleetpack.toml"),
            PathBuf::from("/etc/fleetpack/fleetpack.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("fleetpack/fleetpack.toml"));
        }

        for path in paths {
            if path.exists() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        Ok((Config::default(), None))
    }

    /// Whether requests must carry a bearer token
    #[must_use]
    pub fn requires_token(&self) -> bool {
        self.server
            .auth_token
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.max_upload_bytes, 64 * 1024 * 1024);
        assert_eq!(config.server.max_unpacked_bytes, 512 * 1024 * 1024);
        assert!(config.server.data_dir.is_none());
        assert!(!config.requires_token());
    }

    #[test]
    fn test_parse_server_section() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0:9000"
            data_dir = "/var/lib/fleetpack"
            auth_token = "hunter2"
            max_upload_bytes = 1024
            max_unpacked_bytes = 4096
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(
            config.server.data_dir.as_deref(),
            Some(Path::new("/var/lib/fleetpack"))
        );
        assert_eq!(config.server.max_upload_bytes, 1024);
        assert_eq!(config.server.max_unpacked_bytes, 4096);
        assert_eq!(config.server.log_level, "info");
        assert!(config.requires_token());
    }

    #[test]
    fn test_empty_token_is_disabled() {
        let config: Config = toml::from_str("[server]\nauth_token = \"\"\n").unwrap();
        assert!(!config.requires_token());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleetpack.toml");
        std::fs::write(&path, "[server]\nlog_level = \"debug\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.log_level, "debug");
    }
}
