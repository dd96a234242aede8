//! Bridge configuration

use crate::BridgeError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub timeouts: TimeoutConfig,
    pub listing: ListingConfig,
    pub signals: SignalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a signalled file-system operation
    pub operation_ms: u64,
    /// How long `connect` waits for the host runtime to announce itself
    pub readiness_ms: u64,
    /// Deadline for a code execution result
    pub executor_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            operation_ms: 5000,
            readiness_ms: 10_000,
            executor_ms: 5000,
        }
    }
}

impl TimeoutConfig {
    pub fn operation(&self) -> Duration {
        Duration::from_millis(self.operation_ms)
    }

    pub fn readiness(&self) -> Duration {
        Duration::from_millis(self.readiness_ms)
    }

    pub fn executor(&self) -> Duration {
        Duration::from_millis(self.executor_ms)
    }
}

/// Directory listing fallback chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Tried in order until one yields entries
    pub strategies: Vec<ListingStrategy>,
    /// Wait for `directoryListed` after `listDirectory`
    pub signal_grace_ms: u64,
    /// Wait between priming the host cache and reading it back
    pub cache_poll_delay_ms: u64,
    pub degrade_policy: DegradePolicy,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                ListingStrategy::Direct,
                ListingStrategy::Cached,
                ListingStrategy::Signal,
            ],
            signal_grace_ms: 500,
            cache_poll_delay_ms: 200,
            degrade_policy: DegradePolicy::Substitute,
        }
    }
}

impl ListingConfig {
    pub fn signal_grace(&self) -> Duration {
        Duration::from_millis(self.signal_grace_ms)
    }

    pub fn cache_poll_delay(&self) -> Duration {
        Duration::from_millis(self.cache_poll_delay_ms)
    }
}

/// Channel emulation for hosts with incomplete signal support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Create local channels for signals the host does not expose
    pub synthesize_missing: bool,
    /// Emit the success signal on an emulated channel this long after a successful call
    pub echo_success_ms: Option<u64>,
    /// Ignore success emissions carrying a different path than the request.
    /// Turn off for hosts that report paths in another form.
    pub correlate_by_path: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            synthesize_missing: true,
            echo_success_ms: None,
            correlate_by_path: true,
        }
    }
}

impl SignalConfig {
    pub fn echo_success_after(&self) -> Option<Duration> {
        self.echo_success_ms.map(Duration::from_millis)
    }
}

/// Ways of obtaining a directory listing from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStrategy {
    /// `getDirectoryContents` returns the listing
    #[serde(rename = "direct")]
    Direct,
    /// `getCachedDirectoryContents` returns the listing, priming the cache if needed
    #[serde(rename = "cached")]
    Cached,
    /// `listDirectory` answered on `directoryListed`
    #[serde(rename = "signal")]
    Signal,
}

/// What to do when every listing strategy failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradePolicy {
    /// Return the canned fallback listing, flagged as degraded
    #[serde(rename = "substitute")]
    Substitute,
    /// Fail the request
    #[serde(rename = "fail")]
    Fail,
}

impl BridgeConfig {
    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if absent
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            tracing::info!("Configuration loaded from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "FilerBridge", "FilerBridge")
            .map(|dirs| dirs.config_dir().join("bridge.toml"))
            .unwrap_or_else(|| PathBuf::from("./bridge.toml"))
    }

    /// Reject settings that would make requests hang or never settle
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.timeouts.operation_ms == 0 || self.timeouts.executor_ms == 0 {
            return Err(BridgeError::Config("timeouts must be non-zero".into()));
        }
        if self.listing.strategies.is_empty()
            && self.listing.degrade_policy == DegradePolicy::Fail
        {
            return Err(BridgeError::Config(
                "listing needs at least one strategy or the substitute policy".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.timeouts.operation(), Duration::from_millis(5000));
        assert_eq!(config.listing.strategies[0], ListingStrategy::Direct);
        assert_eq!(config.listing.degrade_policy, DegradePolicy::Substitute);
        assert!(config.signals.synthesize_missing);
        assert!(config.signals.echo_success_after().is_none());
        assert!(config.signals.correlate_by_path);
    }

    #[test]
    fn test_partial_toml() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [listing]
            strategies = ["signal", "cached"]
            degrade_policy = "fail"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.listing.strategies,
            vec![ListingStrategy::Signal, ListingStrategy::Cached]
        );
        assert_eq!(config.listing.signal_grace_ms, 500);
        assert_eq!(config.timeouts.operation_ms, 5000);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bridge.toml");

        let mut config = BridgeConfig::default();
        config.signals.echo_success_ms = Some(500);
        config.save_to(&path).unwrap();

        assert_eq!(BridgeConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_validate() {
        let mut config = BridgeConfig::default();
        config.timeouts.operation_ms = 0;
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));

        let mut config = BridgeConfig::default();
        config.listing.strategies.clear();
        assert!(config.validate().is_ok());
        config.listing.degrade_policy = DegradePolicy::Fail;
        assert!(config.validate().is_err());
    }
}
