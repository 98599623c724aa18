// Path: crates/types/src/config/mod.rs

//! Node configuration, loaded from TOML. Every field has a default so an
//! empty file is a valid configuration.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How a `KeyValue` dependency is authenticated.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyValueMode {
    /// Verify a Merkle inclusion proof plus the forward-link chain.
    #[default]
    StateProof,
    /// Verify the state unit's threshold signature on a read-state.
    ReadState,
}

/// Settings for threshold signing sessions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    /// Deadline after which a session completes with a timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl SigningConfig {
    /// The session deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Settings for DKG setup and threshold decryption rounds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DkgConfig {
    /// Deadline for both setup and decryption rounds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Reconstruction threshold. Defaults to `n - (n - 1) / 3`.
    #[serde(default)]
    pub threshold: Option<u32>,
}

impl DkgConfig {
    /// The round deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The threshold for a roster of `n` nodes.
    pub fn threshold_for(&self, n: usize) -> usize {
        match self.threshold {
            Some(t) => t as usize,
            None => default_threshold(n),
        }
    }
}

impl Default for DkgConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            threshold: None,
        }
    }
}

/// The Byzantine threshold for `n` nodes: `n - (n - 1) / 3`.
pub fn default_threshold(n: usize) -> usize {
    n - n.saturating_sub(1) / 3
}

/// Settings for the dependency verifier.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Unit whose keys sign execution plans.
    #[serde(default = "default_coordinator_unit")]
    pub coordinator_unit_id: String,
    /// Unit that owns the ledger.
    #[serde(default = "default_state_unit")]
    pub state_unit_id: String,
    /// How KeyValue inputs are authenticated.
    #[serde(default)]
    pub key_value_mode: KeyValueMode,
    /// Deadline for a unit-wide verification round.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl VerifierConfig {
    /// The verification round deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            coordinator_unit_id: default_coordinator_unit(),
            state_unit_id: default_state_unit(),
            key_value_mode: KeyValueMode::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Where DKG sessions are persisted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct StorageConfig {
    /// Path of the redb file. `None` keeps sessions in memory only.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging output settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default = "default_true")]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: true,
        }
    }
}

/// Top-level node configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct CohortConfig {
    /// Threshold signing.
    #[serde(default)]
    pub signing: SigningConfig,
    /// DKG and decryption.
    #[serde(default)]
    pub dkg: DkgConfig,
    /// Dependency verification.
    #[serde(default)]
    pub verifier: VerifierConfig,
    /// Session persistence.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl CohortConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Rejects values no session could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing.timeout_ms == 0 {
            return Err(ConfigError::Invalid("signing.timeout_ms must be > 0".into()));
        }
        if self.dkg.timeout_ms == 0 {
            return Err(ConfigError::Invalid("dkg.timeout_ms must be > 0".into()));
        }
        if self.verifier.timeout_ms == 0 {
            return Err(ConfigError::Invalid("verifier.timeout_ms must be > 0".into()));
        }
        if self.dkg.threshold == Some(0) {
            return Err(ConfigError::Invalid("dkg.threshold must be > 0".into()));
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    60_000
}
fn default_coordinator_unit() -> String {
    "ceu".to_string()
}
fn default_state_unit() -> String {
    "state".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = CohortConfig::from_toml_str("").unwrap();
        assert_eq!(config.signing.timeout(), Duration::from_secs(60));
        assert_eq!(config.verifier.coordinator_unit_id, "ceu");
        assert_eq!(config.verifier.state_unit_id, "state");
        assert_eq!(config.verifier.key_value_mode, KeyValueMode::StateProof);
        assert_eq!(config.verifier.timeout(), Duration::from_secs(60));
        assert!(config.storage.path.is_none());
        assert!(config.telemetry.json);
    }

    #[test]
    fn test_partial_overrides() {
        let raw = r#"
            [signing]
            timeout_ms = 500

            [dkg]
            threshold = 7

            [verifier]
            key_value_mode = "read_state"
        "#;
        let config = CohortConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.signing.timeout_ms, 500);
        assert_eq!(config.dkg.timeout_ms, 60_000);
        assert_eq!(config.dkg.threshold_for(10), 7);
        assert_eq!(config.verifier.key_value_mode, KeyValueMode::ReadState);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = CohortConfig::from_toml_str("[signing]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = CohortConfig::from_toml_str("[verifier]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_default_threshold() {
        assert_eq!(default_threshold(1), 1);
        assert_eq!(default_threshold(4), 3);
        assert_eq!(default_threshold(10), 7);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "[storage]\npath = \"/var/lib/cohort/dkg.redb\"\n").unwrap();
        let config = CohortConfig::load(&path).unwrap();
        assert_eq!(
            config.storage.path.as_deref(),
            Some(Path::new("/var/lib/cohort/dkg.redb"))
        );
    }
}
