use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BountySettings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub ledger: LedgerSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// SQLite file holding the ledger, leaderboard and maintainer tables.
    pub path: PathBuf,
    /// How long to wait on another process's write lock.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: bounty_home().join("database").join("bounty.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level (`trace`..`error`). `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = SettingsError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(SettingsError::InvalidValue(format!("log format: {other}"))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerSettings {
    /// Refuse assignments from users missing from the maintainer table.
    /// Checked by the command line front end, not by the ledger.
    pub require_maintainer: bool,
}

/// `~/.bounty`, falling back to `/tmp/.bounty` without a home directory.
pub fn bounty_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".bounty")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = BountySettings::default();
        assert!(s.database.path.ends_with("database/bounty.db"));
        assert_eq!(s.database.busy_timeout_ms, 5_000);
        assert_eq!(s.logging.level, "info");
        assert_eq!(s.logging.format, LogFormat::Json);
        assert!(!s.ledger.require_maintainer);
    }

    #[test]
    fn camel_case_json() {
        let json = serde_json::to_value(BountySettings::default()).unwrap();
        assert!(json["database"]["busyTimeoutMs"].is_u64());
        assert_eq!(json["ledger"]["requireMaintainer"], false);
        assert_eq!(json["logging"]["format"], "json");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: BountySettings =
            serde_json::from_str(r#"{"ledger": {"requireMaintainer": true}}"#).unwrap();
        assert!(s.ledger.require_maintainer);
        assert_eq!(s.logging.level, "info");
    }

    #[test]
    fn log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
