// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `KernelConfig`: the configuration recognized by the Facade (spec §6).
//!
//! Resolved the way the teacher's `oj-daemon::env` module resolves its
//! state directory — a TOML file plus environment variable overrides, so
//! the same binary behaves sanely both as an interactively-launched tool
//! and inside a container where only env vars are practical.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

fn default_true() -> bool {
    true
}

fn default_max_concurrent_scans() -> usize {
    4
}

fn default_scan_timeout_secs() -> u64 {
    3600
}

fn default_snapshot_ttl_secs() -> u64 {
    900
}

fn default_finding_cap() -> u64 {
    100_000
}

/// Spec §6 "Configuration recognized by the Facade".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// When false, `remediation.available` is still published but no
    /// action executes (spec §6).
    pub enable_auto_remediation: bool,
    pub max_concurrent_scans: usize,
    #[serde(with = "humantime_secs", rename = "scan_timeout_secs")]
    pub scan_timeout: Duration,
    /// Default true; overrides per-action `requires_approval` to enforce
    /// a global policy (spec §6).
    pub require_approval: bool,
    #[serde(with = "humantime_secs", rename = "snapshot_ttl_secs")]
    pub snapshot_ttl: Duration,
    pub finding_cap: u64,
    /// Directory the daemon stores its WAL-backed state under, resolved
    /// from `WARDEN_STATE_DIR` > `XDG_STATE_HOME/warden` >
    /// `~/.local/state/warden`, mirroring the teacher's `OJ_STATE_DIR`
    /// resolution chain.
    #[serde(skip)]
    pub state_dir: Option<PathBuf>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            enable_auto_remediation: true,
            max_concurrent_scans: default_max_concurrent_scans(),
            scan_timeout: Duration::from_secs(default_scan_timeout_secs()),
            require_approval: true,
            snapshot_ttl: Duration::from_secs(default_snapshot_ttl_secs()),
            finding_cap: default_finding_cap(),
            state_dir: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),
    #[error("could not resolve a state directory (no WARDEN_STATE_DIR, XDG_STATE_HOME, or HOME)")]
    NoStateDir,
}

impl KernelConfig {
    /// Loads a `KernelConfig` from an optional TOML file, then applies
    /// environment variable overrides, matching the teacher's layered
    /// config resolution (file provides the base, env wins for container
    /// deployment friendliness).
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
                toml::from_str(&content)
                    .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?
            }
            None => KernelConfig::default(),
        };
        config.apply_env_overrides();
        config.state_dir = Some(Self::resolve_state_dir()?);
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WARDEN_ENABLE_AUTO_REMEDIATION") {
            if let Ok(parsed) = v.parse() {
                self.enable_auto_remediation = parsed;
            }
        }
        if let Ok(v) = std::env::var("WARDEN_MAX_CONCURRENT_SCANS") {
            if let Ok(parsed) = v.parse() {
                self.max_concurrent_scans = parsed;
            }
        }
        if let Ok(v) = std::env::var("WARDEN_SCAN_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse() {
                self.scan_timeout = Duration::from_secs(parsed);
            }
        }
        if let Ok(v) = std::env::var("WARDEN_REQUIRE_APPROVAL") {
            if let Ok(parsed) = v.parse() {
                self.require_approval = parsed;
            }
        }
        if let Ok(v) = std::env::var("WARDEN_SNAPSHOT_TTL_SECS") {
            if let Ok(parsed) = v.parse() {
                self.snapshot_ttl = Duration::from_secs(parsed);
            }
        }
        if let Ok(v) = std::env::var("WARDEN_FINDING_CAP") {
            if let Ok(parsed) = v.parse() {
                self.finding_cap = parsed;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_scans == 0 {
            return Err(ConfigError::MustBePositive("max_concurrent_scans"));
        }
        if self.finding_cap == 0 {
            return Err(ConfigError::MustBePositive("finding_cap"));
        }
        Ok(())
    }

    /// `WARDEN_STATE_DIR` > `XDG_STATE_HOME/warden` > `~/.local/state/warden`.
    fn resolve_state_dir() -> Result<PathBuf, ConfigError> {
        if let Ok(dir) = std::env::var("WARDEN_STATE_DIR") {
            return Ok(PathBuf::from(dir));
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return Ok(PathBuf::from(xdg).join("warden"));
        }
        if let Some(home) = dirs::home_dir() {
            return Ok(home.join(".local/state/warden"));
        }
        Err(ConfigError::NoStateDir)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| PathBuf::from(".warden-state"))
    }
}

/// Serializes a `Duration` as whole seconds, matching the teacher's
/// `*_MS`-suffixed env vars but in seconds for the human-edited TOML file.
mod humantime_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = KernelConfig::default();
        assert!(config.enable_auto_remediation);
        assert_eq!(config.max_concurrent_scans, 4);
        assert!(config.require_approval);
        assert_eq!(config.scan_timeout, Duration::from_secs(3600));
    }

    #[test]
    fn rejects_zero_max_concurrent_scans() {
        let mut config = KernelConfig::default();
        config.max_concurrent_scans = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_toml_overrides() {
        let toml_src = r#"
            enable_auto_remediation = false
            max_concurrent_scans = 8
            require_approval = false
        "#;
        let config: KernelConfig = toml::from_str(toml_src).unwrap();
        assert!(!config.enable_auto_remediation);
        assert_eq!(config.max_concurrent_scans, 8);
        assert!(!config.require_approval);
        // unspecified fields keep their defaults
        assert_eq!(config.finding_cap, default_finding_cap());
    }
}
