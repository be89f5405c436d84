//! Configuration loading and resolution
//!
//! Every setting resolves with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`VFP_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BIND_PORT: u16 = 5730;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Resolved portal configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Base URL of the validation backend
    pub backend_url: String,
    pub bind_host: String,
    pub bind_port: u16,
    /// Base period of the batch progress poll loop
    pub poll_interval_ms: u64,
    /// De-duplicate outcome records by (instance, title, severity) before
    /// grouping in the report
    pub dedup_outcomes: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            bind_host: DEFAULT_BIND_HOST.to_string(),
            bind_port: DEFAULT_BIND_PORT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            dedup_outcomes: false,
        }
    }
}

/// Command-line overrides, filled in by the binary's clap parser
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub bind_port: Option<u16>,
    pub poll_interval_ms: Option<u64>,
    /// Explicit config file path; skips the default search locations
    pub config_file: Option<PathBuf>,
}

/// TOML file shape; every key optional
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    backend_url: Option<String>,
    bind_host: Option<String>,
    bind_port: Option<u16>,
    poll_interval_ms: Option<u64>,
    dedup_outcomes: Option<bool>,
}

impl PortalConfig {
    /// Resolve the full configuration with the 4-tier priority order.
    pub fn resolve(overrides: &ConfigOverrides) -> Self {
        let file = load_config_file(overrides.config_file.as_deref());
        let defaults = PortalConfig::default();

        PortalConfig {
            backend_url: overrides
                .backend_url
                .clone()
                .or_else(|| env_string("VFP_BACKEND_URL"))
                .or(file.backend_url)
                .unwrap_or(defaults.backend_url),
            bind_host: env_string("VFP_BIND_HOST")
                .or(file.bind_host)
                .unwrap_or(defaults.bind_host),
            bind_port: overrides
                .bind_port
                .or_else(|| env_parsed("VFP_BIND_PORT"))
                .or(file.bind_port)
                .unwrap_or(defaults.bind_port),
            poll_interval_ms: overrides
                .poll_interval_ms
                .or_else(|| env_parsed("VFP_POLL_INTERVAL_MS"))
                .or(file.poll_interval_ms)
                .unwrap_or(defaults.poll_interval_ms),
            dedup_outcomes: env_parsed("VFP_DEDUP_OUTCOMES")
                .or(file.dedup_outcomes)
                .unwrap_or(defaults.dedup_outcomes),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring unparseable {}={:?}", name, raw);
                None
            }
        },
        Err(_) => None,
    }
}

/// Load the TOML config file, if any.
///
/// With an explicit path, a missing or unparseable file is only warned
/// about; the caller still gets a (possibly empty) config. Default search
/// order: `~/.config/vfp/config.toml`, then `/etc/vfp/config.toml`.
fn load_config_file(explicit: Option<&Path>) -> FileConfig {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => return FileConfig::default(),
        },
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            if explicit.is_some() {
                warn!("Could not read config file {}: {}", path.display(), e);
            }
            return FileConfig::default();
        }
    };

    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring malformed config file {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("vfp").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }
    let system_config = PathBuf::from("/etc/vfp/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_config_parses_partial_toml() {
        let file: FileConfig =
            toml::from_str("backend_url = \"http://validation:9000\"\ndedup_outcomes = true")
                .unwrap();
        assert_eq!(file.backend_url.as_deref(), Some("http://validation:9000"));
        assert_eq!(file.dedup_outcomes, Some(true));
        assert!(file.bind_port.is_none());
    }

    #[test]
    fn test_defaults() {
        let config = PortalConfig::default();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.bind_port, DEFAULT_BIND_PORT);
        assert_eq!(config.poll_interval_ms, 1000);
        assert!(!config.dedup_outcomes);
    }
}
