//! Agent settings: command-line flags over an optional TOML file

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use fleetpack_api::{Labels, parse_labels};
use serde::Deserialize;

use crate::error::{AgentError, Result};

const DEFAULT_ROOT: &str = "/";
const DEFAULT_PACKET_DIR: &str = "/var/lib/fleetpack/packets";
const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Command-line flags
#[derive(Debug, Parser)]
#[command(name = "fleetpack-agent")]
#[command(about = "Keep this device's packets in line with the fleetpack server", long_about = None)]
pub struct AgentArgs {
    /// Config file (TOML)
    #[arg(short, long, env = "FLEETPACK_AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server address
    #[arg(short = 'a', long, env = "FLEETPACK_ADDR")]
    pub server: Option<String>,

    /// Bearer token for the server
    #[arg(short, long, env = "FLEETPACK_TOKEN")]
    pub token: Option<String>,

    /// Device labels as key=value,...
    #[arg(short, long, env = "FLEETPACK_LABELS")]
    pub labels: Option<String>,

    /// Install root
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Directory holding installed packets
    #[arg(short, long)]
    pub packets: Option<PathBuf>,

    /// Seconds between passes
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Run a single pass and exit
    #[arg(long)]
    pub once: bool,
}

/// Contents of the agent config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub server: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub labels: Labels,
    pub root: Option<PathBuf>,
    pub packets: Option<PathBuf>,
    pub interval: Option<u64>,
    pub log_level: Option<String>,
}

impl AgentConfig {
    /// Load a config file
    ///
    /// # Errors
    /// Returns `AgentError::Config` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| AgentError::Config(format!("{}: {e}", path.display())))
    }

    /// Load the first config file found on the default search path
    ///
    /// # Errors
    /// Returns `AgentError::Config` if a file exists but is unusable
    pub fn load_default() -> Result<Self> {
        let mut paths = vec![PathBuf::from("/etc/fleetpack/agent.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.insert(0, dir.join("fleetpack/agent.toml"));
        }

        for path in paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading agent config");
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub server: String,
    pub token: Option<String>,
    pub labels: Labels,
    pub root: PathBuf,
    pub packets: PathBuf,
    pub interval: Duration,
    pub once: bool,
    pub log_level: String,
}

impl AgentSettings {
    /// Merge flags over the config file
    ///
    /// Flag labels are added to the file's labels, overriding equal keys.
    ///
    /// # Errors
    /// Returns `AgentError::Config` when no server address is given, the
    /// labels do not parse or the interval is zero
    pub fn resolve(args: AgentArgs, file: AgentConfig) -> Result<Self> {
        let server = args
            .server
            .or(file.server)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AgentError::Config("no server address given".to_string()))?;

        let mut labels = file.labels;
        if let Some(raw) = args.labels.as_deref() {
            let parsed = parse_labels(raw).map_err(|e| AgentError::Config(e.to_string()))?;
            labels.extend(parsed);
        }

        let interval = args
            .interval
            .or(file.interval)
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval == 0 {
            return Err(AgentError::Config(
                "interval must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            server,
            token: args.token.or(file.token).filter(|t| !t.is_empty()),
            labels,
            root: args
                .root
                .or(file.root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            packets: args
                .packets
                .or(file.packets)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PACKET_DIR)),
            interval: Duration::from_secs(interval),
            once: args.once,
            log_level: file.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> AgentArgs {
        let mut full = vec!["fleetpack-agent"];
        full.extend_from_slice(argv);
        AgentArgs::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings =
            AgentSettings::resolve(args(&["--server", "http://hq:8080"]), AgentConfig::default())
                .unwrap();

        assert_eq!(settings.server, "http://hq:8080");
        assert_eq!(settings.root, PathBuf::from("/"));
        assert_eq!(settings.packets, PathBuf::from("/var/lib/fleetpack/packets"));
        assert_eq!(settings.interval, Duration::from_secs(30));
        assert!(settings.labels.is_empty());
        assert!(!settings.once);
    }

    #[test]
    fn test_missing_server_is_fatal() {
        let err = AgentSettings::resolve(args(&[]), AgentConfig::default()).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_flags_override_file() {
        let file: AgentConfig = toml::from_str(
            r#"
            server = "http://from-file"
            interval = 5
            root = "/srv"

            [labels]
            arch = "amd64"
            site = "lab"
            "#,
        )
        .unwrap();

        let settings = AgentSettings::resolve(
            args(&["--labels", "arch=arm64", "--interval", "10", "--once"]),
            file,
        )
        .unwrap();

        assert_eq!(settings.server, "http://from-file");
        assert_eq!(settings.interval, Duration::from_secs(10));
        assert_eq!(settings.root, PathBuf::from("/srv"));
        assert_eq!(settings.labels["arch"], "arm64");
        assert_eq!(settings.labels["site"], "lab");
        assert!(settings.once);
    }

    #[test]
    fn test_bad_labels_and_zero_interval() {
        let err = AgentSettings::resolve(
            args(&["--server", "http://hq", "--labels", "novalue"]),
            AgentConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));

        let err = AgentSettings::resolve(
            args(&["--server", "http://hq", "--interval", "0"]),
            AgentConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
