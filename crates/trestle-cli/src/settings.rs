//! Layered CLI settings.
//!
//! Resolution order, later layers winning:
//!
//! 1. compiled defaults
//! 2. `~/.trestle/settings.json`, deep-merged over the defaults (objects
//!    merge recursively, arrays and scalars replace, nulls are skipped)
//! 3. `TRESTLE_*` environment overrides
//!
//! File keys are camelCase. Invalid environment values are ignored with a
//! warning rather than failing the whole load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use trestle_client::{ConnectionParams, RetryConfig};

/// Errors from loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file held invalid JSON, or the merged document did not
    /// match the settings shape.
    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for the `trestle` binary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrestleSettings {
    /// Client identity used when `--client-id` is not passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Hub deployment to talk to.
    pub hub: HubSettings,
    /// Retry behavior for `trestle send`.
    pub send: RetryConfig,
}

/// Where and how to reach the hub.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    /// Host (and optional port) of the hub, without a scheme.
    pub base_url: String,
    /// Whether the hub terminates TLS.
    pub tls_enabled: bool,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            base_url: "trestle-hub.fly.dev".to_string(),
            tls_enabled: true,
        }
    }
}

impl HubSettings {
    /// Connection parameters for the given client identity.
    #[must_use]
    pub fn params(&self, client_id: String) -> ConnectionParams {
        ConnectionParams {
            client_id,
            base_url: self.base_url.clone(),
            tls_enabled: self.tls_enabled,
        }
    }
}

/// Resolve `~/.trestle/settings.json`.
#[must_use]
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").map_or_else(|_| PathBuf::from("/tmp"), PathBuf::from);
    home.join(".trestle").join("settings.json")
}

/// Load settings from the default location.
pub fn load() -> Result<TrestleSettings, SettingsError> {
    load_from_path(&settings_path())
}

/// Load settings from an explicit file path.
///
/// A missing file is not an error; the defaults (plus environment
/// overrides) apply.
pub fn load_from_path(path: &Path) -> Result<TrestleSettings, SettingsError> {
    let mut merged = serde_json::to_value(TrestleSettings::default())?;

    if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&raw)?;
        deep_merge(&mut merged, user);
    }

    let mut settings: TrestleSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Merge `source` into `target`.
///
/// Objects merge key by key, anything else replaces, null leaves the
/// target value in place.
fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                if value.is_null() {
                    continue;
                }
                match target_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        let _ = target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => {
            if !source_value.is_null() {
                *target_slot = source_value;
            }
        }
    }
}

fn apply_env_overrides(settings: &mut TrestleSettings) {
    if let Some(value) = read_env_string("TRESTLE_CLIENT_ID") {
        settings.client_id = Some(value);
    }
    if let Some(value) = read_env_string("TRESTLE_BASE_URL") {
        settings.hub.base_url = value;
    }
    if let Some(value) = read_env_bool("TRESTLE_TLS_ENABLED") {
        settings.hub.tls_enabled = value;
    }
    if let Some(value) = read_env_u32("TRESTLE_MAX_ATTEMPTS", 1, 100) {
        settings.send.max_attempts = value;
    }
    if let Some(value) = read_env_u64("TRESTLE_BACKOFF_MS", 0, 600_000) {
        settings.send.backoff_ms = value;
    }
}

// ── Environment readers ──

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_bool(&raw);
    if parsed.is_none() {
        warn!(name, value = %raw, "ignoring invalid boolean in environment");
    }
    parsed
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_u32_range(&raw, min, max);
    if parsed.is_none() {
        warn!(name, value = %raw, min, max, "ignoring out-of-range integer in environment");
    }
    parsed
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_u64_range(&raw, min, max);
    if parsed.is_none() {
        warn!(name, value = %raw, min, max, "ignoring out-of-range integer in environment");
    }
    parsed
}

// Pure parsers, testable without touching the environment.

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_u32_range(raw: &str, min: u32, max: u32) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|value| (min..=max).contains(value))
}

fn parse_u64_range(raw: &str, min: u64, max: u64) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| (min..=max).contains(value))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
