//! Configuration management for dh-ddns-updater.

use crate::error::{DdnsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::level_filters::LevelFilter;

/// System-wide config location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dh-ddns-updater/config.toml";

/// System-wide state location.
pub const DEFAULT_STATE_PATH: &str = "/var/lib/dh-ddns-updater/state.json";

/// Default public IP echo service.
pub const DEFAULT_IP_SERVICE: &str = "https://ipinfo.io/ip";

/// Dreamhost API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.dreamhost.com/";

const DEFAULT_INTERVAL_SECS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const MIN_INTERVAL_SECS: u64 = 10;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Check interval in seconds (default: 300 = 5 minutes, 0 = default).
    #[serde(default = "default_interval")]
    pub check_interval_secs: u64,

    /// Dreamhost API key (or environment variable name if prefixed with $).
    #[serde(default)]
    pub dreamhost_api_key: String,

    /// Records to keep pointed at the public IP, in update order.
    #[serde(default)]
    pub domains: Vec<DomainConfig>,

    /// Where the state file lives.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Minimum log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Public IP echo service returning the address as plain text.
    #[serde(default = "default_ip_service")]
    pub ip_service: String,

    /// Dreamhost API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request HTTP timeout in seconds (0 = default).
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ip_service() -> String {
    DEFAULT_IP_SERVICE.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// One managed DNS record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Zone name (e.g., "example.com").
    pub name: String,
    /// Subdomain label ("" for the zone apex).
    #[serde(default)]
    pub record: String,
    /// Record type (e.g., "A", "AAAA"). Passed through as-is.
    #[serde(rename = "type")]
    pub record_type: String,
}

impl DomainConfig {
    /// Create a domain entry.
    pub fn new(name: &str, record: &str, record_type: &str) -> Self {
        Self {
            name: name.to_string(),
            record: record.to_string(),
            record_type: record_type.to_string(),
        }
    }

    /// Fully qualified name this entry manages.
    pub fn fqdn(&self) -> String {
        record_key(&self.name, &self.record)
    }
}

/// Canonical record key: `record.zone`, or `zone` for the apex.
///
/// Used for provider lookups, provider writes and state keys alike.
pub fn record_key(zone: &str, record: &str) -> String {
    if record.is_empty() {
        zone.to_string()
    } else {
        format!("{}.{}", record, zone)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_INTERVAL_SECS,
            dreamhost_api_key: String::new(),
            domains: Vec::new(),
            state_path: default_state_path(),
            log_level: default_log_level(),
            ip_service: default_ip_service(),
            api_base_url: default_api_base_url(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Get the default config file path.
    ///
    /// Prefers the system path, then the user config directory. Falls back to
    /// the system path when neither exists.
    pub fn default_path() -> PathBuf {
        let candidates = [
            Some(PathBuf::from(DEFAULT_CONFIG_PATH)),
            dirs::config_dir().map(|p| p.join("dh-ddns-updater").join("config.toml")),
        ];

        candidates
            .into_iter()
            .flatten()
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from a specific path.
    ///
    /// Unlike state, a missing config file is an error: without credentials
    /// and domains there is nothing to run.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DdnsError::Config(format!("reading {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
    }

    /// Parse a TOML document, applying defaults and credential indirection.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;

        if config.check_interval_secs == 0 {
            config.check_interval_secs = DEFAULT_INTERVAL_SECS;
        }
        if config.http_timeout_secs == 0 {
            config.http_timeout_secs = DEFAULT_HTTP_TIMEOUT_SECS;
        }
        if config.log_level.trim().is_empty() {
            config.log_level = default_log_level();
        }
        if config.state_path.as_os_str().is_empty() {
            config.state_path = default_state_path();
        }
        // An unset variable keeps its literal `$NAME`; validate() reports it.
        config.dreamhost_api_key = resolve_env(&config.dreamhost_api_key);

        Ok(config)
    }

    /// Check the configuration for values the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs < MIN_INTERVAL_SECS {
            return Err(DdnsError::Config(format!(
                "check_interval_secs must be at least {} (got {})",
                MIN_INTERVAL_SECS, self.check_interval_secs
            )));
        }

        for (i, domain) in self.domains.iter().enumerate() {
            if domain.name.trim().is_empty() {
                return Err(DdnsError::Config(format!("domain {} has an empty name", i)));
            }
            if domain.record_type.trim().is_empty() {
                return Err(DdnsError::Config(format!(
                    "domain {} ({}) has an empty type",
                    i,
                    domain.fqdn()
                )));
            }
        }

        if self.log_level_filter().is_none() {
            tracing::warn!(
                log_level = %self.log_level,
                "Unknown log level, using info (valid: trace, debug, info, warn, error)"
            );
        }

        let unset_var = self.dreamhost_api_key.strip_prefix('$');

        if self.domains.is_empty() {
            if let Some(var) = unset_var {
                tracing::warn!(var, "Environment variable for dreamhost_api_key not set");
            }
            tracing::warn!("No domains configured, the updater will only track the public IP");
        } else if let Some(var) = unset_var {
            return Err(DdnsError::Config(format!(
                "dreamhost_api_key refers to environment variable {} which is not set",
                var
            )));
        } else if self.dreamhost_api_key.is_empty() {
            return Err(DdnsError::Config(
                "dreamhost_api_key is required when domains are configured".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed `log_level`, or `None` if it names no known level.
    pub fn log_level_filter(&self) -> Option<LevelFilter> {
        match self.log_level.trim().to_lowercase().as_str() {
            "trace" => Some(LevelFilter::TRACE),
            "debug" => Some(LevelFilter::DEBUG),
            "info" => Some(LevelFilter::INFO),
            "warn" => Some(LevelFilter::WARN),
            "error" => Some(LevelFilter::ERROR),
            _ => None,
        }
    }

    /// Poll interval.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Per-request HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Resolve environment variable references (values starting with $).
fn resolve_env(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}
