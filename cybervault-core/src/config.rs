//! Configuration management
//!
//! settings.json in the data directory:
//! ```json
//! {
//!   "api": { "baseUrl": "http://localhost:8080", "timeoutSecs": 30 },
//!   "session": { "idleTimeoutMinutes": 15 },
//!   "connectivity": { "probeIntervalSecs": 5 }
//! }
//! ```
//! Keys the client does not know about are kept when saving.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::connectivity::OFFLINE_ENV;
use crate::adapters::cybervault_api::{API_URL_ENV, DEFAULT_API_URL};

const SETTINGS_FILENAME: &str = "settings.json";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_MINUTES: i64 = 15;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

// Upper bounds; larger values overflow timer and timestamp arithmetic
const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_IDLE_TIMEOUT_MINUTES: i64 = 7 * 24 * 60;
const MAX_PROBE_INTERVAL_SECS: u64 = 3600;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(default)]
    session: SessionSettings,
    #[serde(default)]
    connectivity: ConnectivitySettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSettings {
    #[serde(default)]
    idle_timeout_minutes: Option<i64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectivitySettings {
    #[serde(default)]
    probe_interval_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// CyberVault client configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub request_timeout: Duration,
    pub idle_timeout_minutes: i64,
    pub probe_interval: Duration,
    /// Forced offline via CYBERVAULT_OFFLINE
    pub force_offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            idle_timeout_minutes: DEFAULT_IDLE_TIMEOUT_MINUTES,
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            force_offline: false,
        }
    }
}

fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value {
        Some("true" | "1" | "yes" | "TRUE" | "YES") => Some(true),
        Some("false" | "0" | "no" | "FALSE" | "NO") => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// Environment overrides (for CI/testing):
    /// 1. CYBERVAULT_API_URL replaces api.baseUrl
    /// 2. CYBERVAULT_OFFLINE forces the connectivity signal offline
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = Self::read_settings(data_dir)?;
        let defaults = Self::default();

        let api_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or(raw.api.base_url)
            .unwrap_or(defaults.api_url);

        let force_offline =
            parse_flag(std::env::var(OFFLINE_ENV).ok().as_deref()).unwrap_or(false);

        Ok(Self {
            api_url,
            request_timeout: raw
                .api
                .timeout_secs
                .filter(|s| *s > 0)
                .map(|s| Duration::from_secs(s.min(MAX_TIMEOUT_SECS)))
                .unwrap_or(defaults.request_timeout),
            idle_timeout_minutes: raw
                .session
                .idle_timeout_minutes
                .filter(|m| *m > 0)
                .map(|m| m.min(MAX_IDLE_TIMEOUT_MINUTES))
                .unwrap_or(defaults.idle_timeout_minutes),
            probe_interval: raw
                .connectivity
                .probe_interval_secs
                .filter(|s| *s > 0)
                .map(|s| Duration::from_secs(s.min(MAX_PROBE_INTERVAL_SECS)))
                .unwrap_or(defaults.probe_interval),
            force_offline,
        })
    }

    /// Idle timeout as a chrono duration
    ///
    /// Out-of-range values (only reachable by setting the field directly)
    /// fall back to the default.
    pub fn idle_timeout(&self) -> chrono::Duration {
        Some(self.idle_timeout_minutes)
            .filter(|m| (1..=MAX_IDLE_TIMEOUT_MINUTES).contains(m))
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or_else(|| chrono::Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINUTES))
    }

    /// Save config to the data directory
    ///
    /// Preserves settings the client doesn't manage. The env overrides are
    /// not written back.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILENAME);
        let mut settings = Self::read_settings(data_dir)?;

        settings.api.base_url = Some(self.api_url.clone());
        settings.api.timeout_secs = Some(self.request_timeout.as_secs());
        settings.session.idle_timeout_minutes = Some(self.idle_timeout_minutes);
        settings.connectivity.probe_interval_secs = Some(self.probe_interval.as_secs());

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
        let settings_path = data_dir.join(SETTINGS_FILENAME);
        if !settings_path.exists() {
            return Ok(SettingsFile::default());
        }
        let content = std::fs::read_to_string(&settings_path)
            .with_context(|| format!("Failed to read {}", settings_path.display()))?;
        Ok(serde_json::from_str(&content).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout_minutes, 15);
        assert_eq!(config.probe_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_reads_camel_case_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILENAME),
            r#"{
                "api": { "timeoutSecs": 7 },
                "session": { "idleTimeoutMinutes": 3 },
                "connectivity": { "probeIntervalSecs": 0 }
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(7));
        assert_eq!(config.idle_timeout(), chrono::Duration::minutes(3));
        // Zero is not a usable interval
        assert_eq!(config.probe_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_huge_values_are_capped() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILENAME),
            r#"{
                "api": { "timeoutSecs": 18446744073709551615 },
                "session": { "idleTimeoutMinutes": 9223372036854775807 },
                "connectivity": { "probeIntervalSecs": 18446744073709551615 }
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(MAX_TIMEOUT_SECS));
        assert_eq!(config.idle_timeout_minutes, MAX_IDLE_TIMEOUT_MINUTES);
        assert_eq!(config.idle_timeout(), chrono::Duration::days(7));
        assert_eq!(config.probe_interval, Duration::from_secs(MAX_PROBE_INTERVAL_SECS));
    }

    #[test]
    fn test_idle_timeout_out_of_range_falls_back() {
        let config = Config {
            idle_timeout_minutes: i64::MAX,
            ..Config::default()
        };
        assert_eq!(config.idle_timeout(), chrono::Duration::minutes(15));
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        std::fs::write(
            &path,
            r#"{ "theme": "dark", "api": { "baseUrl": "http://vault:9000", "proxy": "none" } }"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.idle_timeout_minutes = 30;
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["api"]["proxy"], "none");
        assert_eq!(saved["session"]["idleTimeoutMinutes"], 30);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(Some("yes")), Some(true));
        assert_eq!(parse_flag(Some("0")), Some(false));
        assert_eq!(parse_flag(Some("maybe")), None);
        assert_eq!(parse_flag(None), None);
    }
}
