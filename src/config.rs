//! Configuration for the sentinel daemon.
//!
//! Handles:
//! - Static broker list in failover priority order (optional YAML file)
//! - Check cadence, probe timeout and fail threshold (environment variables)
//! - Status artifact location for the nginx side

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::warn;

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_FAIL_THRESHOLD: u32 = 3;

/// One monitored broker. The configured list is fixed for the lifetime of
/// the process; there is no runtime discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Brokers in priority order: the first healthy one becomes primary.
    pub brokers: Vec<BrokerConfig>,
    /// Where the status artifact is written for nginx to pick up.
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,
    /// Seconds between check cycles (env `CHECK_INTERVAL`).
    #[serde(skip)]
    pub check_interval_secs: u64,
    /// Per-probe budget in seconds (env `TIMEOUT`).
    #[serde(skip)]
    pub timeout_secs: u64,
    /// Consecutive-failure count before external action (env `FAIL_THRESHOLD`).
    /// Parsed and logged for forward compatibility; not applied to the
    /// published status yet.
    #[serde(skip)]
    pub fail_threshold: u32,
}

fn default_status_file() -> PathBuf {
    PathBuf::from("/health-status/status.json")
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            brokers: vec![
                BrokerConfig {
                    name: "parent".into(),
                    host: "mosquitto-parent".into(),
                    port: 1883,
                },
                BrokerConfig {
                    name: "child1".into(),
                    host: "mosquitto-child1".into(),
                    port: 1883,
                },
                BrokerConfig {
                    name: "child2".into(),
                    host: "mosquitto-child2".into(),
                    port: 1883,
                },
            ],
            status_file: default_status_file(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fail_threshold: DEFAULT_FAIL_THRESHOLD,
        }
    }
}

impl SentinelConfig {
    /// Load the broker list from `SENTINEL_CONFIG` (default `sentinel.yaml`)
    /// and the tunables from the environment. A missing or invalid file
    /// falls back to the defaults: the daemon should come up and report
    /// rather than refuse to start.
    pub async fn load() -> Self {
        let path = std::env::var("SENTINEL_CONFIG").unwrap_or_else(|_| "sentinel.yaml".into());
        let mut config = if Path::new(&path).exists() {
            match fs::read_to_string(&path).await {
                Ok(txt) if txt.trim().is_empty() => Self::default(),
                Ok(txt) => serde_yaml::from_str(&txt).unwrap_or_else(|e| {
                    warn!("Invalid config file {}: {}, using defaults", path, e);
                    Self::default()
                }),
                Err(e) => {
                    warn!("Failed to read config file {}: {}, using defaults", path, e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.check_interval_secs = env_parse("CHECK_INTERVAL", DEFAULT_CHECK_INTERVAL_SECS);
        config.timeout_secs = env_parse("TIMEOUT", DEFAULT_TIMEOUT_SECS);
        config.fail_threshold = env_parse("FAIL_THRESHOLD", DEFAULT_FAIL_THRESHOLD);
        config
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Read a numeric setting from the environment, keeping the default when the
/// variable is unset or unparsable.
fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid {}={}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let config = SentinelConfig::default();
        let names: Vec<&str> = config.brokers.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["parent", "child1", "child2"]);
        assert_eq!(config.check_interval_secs, 10);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.fail_threshold, 3);
        assert_eq!(config.status_file, PathBuf::from("/health-status/status.json"));
    }

    #[test]
    fn yaml_overrides_brokers_and_status_file() {
        let yaml = r#"
brokers:
  - name: primary
    host: 10.0.0.1
    port: 1884
status_file: /tmp/sentinel/status.json
"#;
        let config: SentinelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.brokers.len(), 1);
        assert_eq!(config.brokers[0].name, "primary");
        assert_eq!(config.brokers[0].port, 1884);
        assert_eq!(config.status_file, PathBuf::from("/tmp/sentinel/status.json"));
    }

    #[tokio::test]
    async fn unreadable_config_file_falls_back_to_defaults() {
        // A directory at the config path makes the read itself fail, which
        // must degrade to defaults instead of aborting startup.
        let dir = std::env::temp_dir().join(format!(
            "sentinel-config-{}",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::env::set_var("SENTINEL_CONFIG", &dir);

        let config = SentinelConfig::load().await;

        std::env::remove_var("SENTINEL_CONFIG");
        std::fs::remove_dir_all(&dir).ok();

        let names: Vec<&str> = config.brokers.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["parent", "child1", "child2"]);
    }

    #[test]
    fn env_parse_keeps_default_on_garbage() {
        std::env::set_var("SENTINEL_TEST_GARBAGE", "ten");
        assert_eq!(env_parse("SENTINEL_TEST_GARBAGE", 10u64), 10);
        std::env::remove_var("SENTINEL_TEST_GARBAGE");
    }

    #[test]
    fn env_parse_reads_valid_values() {
        std::env::set_var("SENTINEL_TEST_VALID", "42");
        assert_eq!(env_parse("SENTINEL_TEST_VALID", 10u64), 42);
        std::env::remove_var("SENTINEL_TEST_VALID");
    }
}
