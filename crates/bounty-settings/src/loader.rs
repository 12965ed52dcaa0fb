//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`BountySettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{bounty_home, BountySettings, LogFormat};

/// Resolve the path to the settings file (`~/.bounty/settings.json`).
pub fn settings_path() -> PathBuf {
    bounty_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<BountySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<BountySettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn load_file(path: &Path) -> Result<BountySettings> {
    let defaults = serde_json::to_value(BountySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let settings: BountySettings = serde_json::from_value(merged)?;
    validate(&settings)?;
    Ok(settings)
}

/// Upper bound on `database.busyTimeoutMs`, from the file or the env.
pub const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;

/// Reject values the env overrides would also refuse.
pub fn validate(settings: &BountySettings) -> Result<()> {
    if !is_log_level(&settings.logging.level) {
        return Err(SettingsError::InvalidValue(format!(
            "logging.level: {}",
            settings.logging.level
        )));
    }
    if settings.database.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
        return Err(SettingsError::InvalidValue(format!(
            "database.busyTimeoutMs: {} exceeds {MAX_BUSY_TIMEOUT_MS}",
            settings.database.busy_timeout_ms
        )));
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `BOUNTY_*` overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (falling back to file/default).
pub fn apply_env_overrides<F>(settings: &mut BountySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("BOUNTY_DB_PATH") {
        settings.database.path = PathBuf::from(v);
    }
    if let Some(v) = read("BOUNTY_BUSY_TIMEOUT_MS") {
        match parse_u64_range(&v, 0, MAX_BUSY_TIMEOUT_MS) {
            Some(ms) => settings.database.busy_timeout_ms = ms,
            None => warn!(key = "BOUNTY_BUSY_TIMEOUT_MS", value = %v, "invalid u64 env var, ignoring"),
        }
    }
    if let Some(v) = read("BOUNTY_LOG_LEVEL") {
        if is_log_level(&v) {
            settings.logging.level = v.to_lowercase();
        } else {
            warn!(key = "BOUNTY_LOG_LEVEL", value = %v, "invalid log level env var, ignoring");
        }
    }
    if let Some(v) = read("BOUNTY_LOG_FORMAT") {
        match v.parse::<LogFormat>() {
            Ok(format) => settings.logging.format = format,
            Err(_) => warn!(key = "BOUNTY_LOG_FORMAT", value = %v, "invalid log format env var, ignoring"),
        }
    }
    if let Some(v) = read("BOUNTY_REQUIRE_MAINTAINER") {
        match parse_bool(&v) {
            Some(b) => settings.ledger.require_maintainer = b,
            None => warn!(key = "BOUNTY_REQUIRE_MAINTAINER", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Anything `LevelFilter` accepts, `off` included.
fn is_log_level(val: &str) -> bool {
    LevelFilter::from_str(val).is_ok()
}
