//! Session configuration.
//!
//! Defaults come from [`constants`](super::constants). A config can be loaded
//! from a JSON file and then overridden from `PEERLINK_*` environment
//! variables:
//!
//! - `PEERLINK_BIND_ADDR`: local bind address (default `0.0.0.0:0`)
//! - `PEERLINK_STEALTH`: `1`/`true` to suppress replies to unsolicited traffic
//! - `PEERLINK_CACHE_PATH`: session cache file
//! - `PEERLINK_ALLOW_LIST`: allow-listed client id file
//! - `PEERLINK_IP_LOOKUP_URL`: public address lookup endpoint
//! - `PEERLINK_FAILURE_THRESHOLD`: failed handshakes before a ban
//! - `PEERLINK_BAN_SECS`: ban duration in seconds

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::*;

/// Errors loading or validating a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// A setting is out of range.
    #[error("invalid setting: {0}")]
    Invalid(&'static str),
}

/// Tunables of a single session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Local address the UDP socket binds to.
    pub bind_addr: SocketAddr,
    /// Bounded wait of one receive call.
    pub recv_timeout: Duration,
    /// Interval between keepalive punches.
    pub punch_interval: Duration,
    /// Interval between guest handshake retries.
    pub guest_retry_interval: Duration,
    /// How long the guest resends its handshake.
    pub guest_deadline: Duration,
    /// How long the host waits before reporting that nobody joined.
    pub host_deadline: Duration,
    /// Failed handshakes from one IP before it is banned.
    pub failure_threshold: u32,
    /// Ban duration.
    pub ban_duration: Duration,
    /// Suppress every reply to unsolicited or invalid traffic.
    pub stealth: bool,
    /// Session metadata cache file.
    pub cache_path: PathBuf,
    /// Allow-listed client identifier file.
    pub allow_list_path: PathBuf,
    /// Public address lookup endpoint.
    pub ip_lookup_url: String,
    /// Timeout of the public address lookup.
    pub ip_lookup_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            recv_timeout: RECV_TIMEOUT,
            punch_interval: PUNCH_INTERVAL,
            guest_retry_interval: GUEST_RETRY_INTERVAL,
            guest_deadline: GUEST_HANDSHAKE_DEADLINE,
            host_deadline: HOST_HANDSHAKE_DEADLINE,
            failure_threshold: FAILURE_THRESHOLD,
            ban_duration: BAN_DURATION,
            stealth: false,
            cache_path: PathBuf::from("data/p2p_sessions.json"),
            allow_list_path: PathBuf::from("data/allowed_clients.json"),
            ip_lookup_url: IP_LOOKUP_URL.to_string(),
            ip_lookup_timeout: IP_LOOKUP_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Load a config from a JSON file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PEERLINK_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply `PEERLINK_*` overrides from an arbitrary variable source.
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PEERLINK_BIND_ADDR") {
            self.bind_addr = value.parse().map_err(|_| ConfigError::Env {
                var: "PEERLINK_BIND_ADDR",
                value,
            })?;
        }
        if let Some(value) = lookup("PEERLINK_STEALTH") {
            self.stealth = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Env {
                        var: "PEERLINK_STEALTH",
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup("PEERLINK_CACHE_PATH") {
            self.cache_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("PEERLINK_ALLOW_LIST") {
            self.allow_list_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("PEERLINK_IP_LOOKUP_URL") {
            self.ip_lookup_url = value;
        }
        if let Some(value) = lookup("PEERLINK_FAILURE_THRESHOLD") {
            self.failure_threshold = value.parse().map_err(|_| ConfigError::Env {
                var: "PEERLINK_FAILURE_THRESHOLD",
                value,
            })?;
        }
        if let Some(value) = lookup("PEERLINK_BAN_SECS") {
            let secs: u64 = value.parse().map_err(|_| ConfigError::Env {
                var: "PEERLINK_BAN_SECS",
                value,
            })?;
            self.ban_duration = Duration::from_secs(secs);
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings that would stall or disable a loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recv_timeout.is_zero() {
            return Err(ConfigError::Invalid("recv_timeout must be non-zero"));
        }
        if self.punch_interval.is_zero() {
            return Err(ConfigError::Invalid("punch_interval must be non-zero"));
        }
        if self.guest_retry_interval.is_zero() {
            return Err(ConfigError::Invalid("guest_retry_interval must be non-zero"));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid("failure_threshold must be at least 1"));
        }
        if self.ban_duration > MAX_BAN_DURATION {
            return Err(ConfigError::Invalid("ban_duration must be at most one week"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.recv_timeout, Duration::from_secs(1));
        assert_eq!(config.punch_interval, Duration::from_secs(2));
        assert_eq!(config.guest_deadline, Duration::from_secs(60));
        assert_eq!(config.host_deadline, Duration::from_secs(120));
        assert_eq!(config.bind_addr.port(), 0);
        assert!(!config.stealth);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = SessionConfig::default()
            .apply_vars(vars(&[
                ("PEERLINK_BIND_ADDR", "127.0.0.1:4000"),
                ("PEERLINK_STEALTH", "true"),
                ("PEERLINK_FAILURE_THRESHOLD", "3"),
                ("PEERLINK_BAN_SECS", "10"),
            ]))
            .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:4000".parse().unwrap());
        assert!(config.stealth);
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.ban_duration, Duration::from_secs(10));
    }

    #[test]
    fn test_env_rejects_garbage() {
        let result = SessionConfig::default().apply_vars(vars(&[("PEERLINK_STEALTH", "maybe")]));
        assert!(matches!(
            result,
            Err(ConfigError::Env { var: "PEERLINK_STEALTH", .. })
        ));

        let result =
            SessionConfig::default().apply_vars(vars(&[("PEERLINK_FAILURE_THRESHOLD", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_ban_duration_is_bounded() {
        let result = SessionConfig::default()
            .apply_vars(vars(&[("PEERLINK_BAN_SECS", "18446744073709551615")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let week = MAX_BAN_DURATION.as_secs().to_string();
        let config = SessionConfig::default()
            .apply_vars(vars(&[("PEERLINK_BAN_SECS", week.as_str())]))
            .unwrap();
        assert_eq!(config.ban_duration, MAX_BAN_DURATION);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "stealth": true, "failure_threshold": 2 }"#).unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert!(config.stealth);
        assert_eq!(config.failure_threshold, 2);
        assert_eq!(config.punch_interval, PUNCH_INTERVAL);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SessionConfig::load("/nonexistent/peerlink.json");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
