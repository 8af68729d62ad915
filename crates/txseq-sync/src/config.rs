use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// How hard [`FileStatusStore`](crate::FileStatusStore) tries to make a
/// write durable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// `fsync` the file and its directory on every persist.
    EveryWrite,
    /// Rely on OS page-cache buffering.
    #[default]
    OsDefault,
}

/// Configuration for a [`Reconciler`](crate::Reconciler).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Pause between reconciliation rounds, in seconds (fractions allowed).
    #[serde(with = "secs")]
    pub interval: Duration,
    /// Upper bound on replay attempts in a single round with one peer.
    pub max_replays_per_round: usize,
    /// Where the file store keeps the confirmed status.
    pub status_path: PathBuf,
    pub durability: Durability,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_replays_per_round: 4096,
            status_path: PathBuf::from("txseq.status"),
            durability: Durability::default(),
        }
    }
}

impl ReconcileConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> SyncResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.interval.is_zero() {
            return Err(SyncError::Config("interval must be positive".into()));
        }
        if self.max_replays_per_round == 0 {
            return Err(SyncError::Config(
                "max_replays_per_round must be at least 1".into(),
            ));
        }
        if self.status_path.as_os_str().is_empty() {
            return Err(SyncError::Config("status_path must not be empty".into()));
        }
        Ok(())
    }
}

mod secs {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ReconcileConfig::default();
        assert_eq!(c.interval, Duration::from_secs(5));
        assert_eq!(c.max_replays_per_round, 4096);
        assert_eq!(c.durability, Durability::OsDefault);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn parse_full_toml() {
        let c = ReconcileConfig::from_toml_str(
            r#"
            interval = 0.5
            max_replays_per_round = 10
            status_path = "/var/lib/txseq/status"
            durability = "every_write"
            "#,
        )
        .unwrap();
        assert_eq!(c.interval, Duration::from_millis(500));
        assert_eq!(c.max_replays_per_round, 10);
        assert_eq!(c.status_path, PathBuf::from("/var/lib/txseq/status"));
        assert_eq!(c.durability, Durability::EveryWrite);
    }

    #[test]
    fn integer_interval_accepted() {
        let c = ReconcileConfig::from_toml_str("interval = 30").unwrap();
        assert_eq!(c.interval, Duration::from_secs(30));
    }

    #[test]
    fn invalid_values_rejected() {
        for toml in [
            "interval = 0",
            "interval = -1.0",
            "max_replays_per_round = 0",
            "status_path = \"\"",
            "durability = \"sometimes\"",
        ] {
            assert!(
                matches!(ReconcileConfig::from_toml_str(toml), Err(SyncError::Config(_))),
                "accepted {toml}"
            );
        }
    }
}
