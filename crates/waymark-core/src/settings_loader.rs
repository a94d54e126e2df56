//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `WAYMARK_DEBUG` | `debug` |
//! | `WAYMARK_BASE_URL` | `base_url` |
//! | `WAYMARK_LOG_LEVEL` | `log_level` |
//! | `WAYMARK_GLOBAL_MIDDLEWARE` | `global_middleware` (comma-separated) |
//! | `WAYMARK_ROUTE_CACHE` | `route_cache` |
//! | `WAYMARK_ROOT_MATCH` | `root_match` (`pattern` or `any`) |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use waymark_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/routing.toml").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::WaymarkError;
use crate::settings::Settings;

/// Loads settings from a TOML string. Missing keys keep their defaults.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, WaymarkError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| WaymarkError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_into_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, WaymarkError> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, WaymarkError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Loads settings from a JSON string. Missing keys keep their defaults.
pub fn from_json_str(json_str: &str) -> Result<Settings, WaymarkError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| WaymarkError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_into_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, WaymarkError> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Result<Settings, WaymarkError> {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Applies `WAYMARK_*` environment variable overrides to a settings struct.
///
/// Fails only when `WAYMARK_ROOT_MATCH` holds an unknown policy.
pub fn apply_env_overrides(settings: &mut Settings) -> Result<(), WaymarkError> {
    apply_overrides(settings, |key| std::env::var(key).ok())
}

fn apply_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), WaymarkError> {
    if let Some(val) = lookup("WAYMARK_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("WAYMARK_BASE_URL") {
        settings.base_url = val;
    }

    if let Some(val) = lookup("WAYMARK_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("WAYMARK_GLOBAL_MIDDLEWARE") {
        settings.global_middleware = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    if let Some(val) = lookup("WAYMARK_ROUTE_CACHE") {
        settings.route_cache = if val.is_empty() {
            None
        } else {
            Some(PathBuf::from(val))
        };
    }

    if let Some(val) = lookup("WAYMARK_ROOT_MATCH") {
        settings.root_match = val.parse()?;
    }

    Ok(())
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> Result<String, WaymarkError> {
    std::fs::read_to_string(path).map_err(|e| {
        WaymarkError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_into_defaults(
    overrides: serde_json::Value,
    format: &str,
) -> Result<Settings, WaymarkError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        WaymarkError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, overrides);
    serde_json::from_value(merged).map_err(|e| {
        WaymarkError::ConfigurationError(format!(
            "Failed to deserialize settings from {format}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::settings::RootMatch;

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            base_url = "https://example.com"
            root_match = "any"
            global_middleware = ["session", "csrf"]
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.base_url, "https://example.com");
        assert_eq!(settings.root_match, RootMatch::Any);
        assert_eq!(settings.global_middleware, vec!["session", "csrf"]);
        // Defaults preserved
        assert_eq!(settings.not_found_view, "errors.404");
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_from_toml_str_invalid() {
        assert!(from_toml_str("debug = ").is_err());
        assert!(from_toml_str("root_match = \"sometimes\"").is_err());
    }

    #[test]
    fn test_from_json_str() {
        let settings =
            from_json_str(r#"{"route_cache": "/tmp/routes.json", "use_fallback": false}"#)
                .unwrap();
        assert_eq!(settings.route_cache, Some(PathBuf::from("/tmp/routes.json")));
        assert!(!settings.use_fallback);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        let settings = from_toml_file(file.path()).unwrap();
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_from_missing_file() {
        let err = from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read JSON file"));
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WAYMARK_DEBUG", "0"),
            ("WAYMARK_BASE_URL", "https://app.test"),
            ("WAYMARK_GLOBAL_MIDDLEWARE", "trim, session,,"),
            ("WAYMARK_ROOT_MATCH", "any"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        apply_overrides(&mut settings, |k| vars.get(k).map(ToString::to_string)).unwrap();

        assert!(!settings.debug);
        assert_eq!(settings.base_url, "https://app.test");
        assert_eq!(settings.global_middleware, vec!["trim", "session"]);
        assert_eq!(settings.root_match, RootMatch::Any);
    }

    #[test]
    fn test_apply_overrides_bad_root_match() {
        let mut settings = Settings::default();
        let result = apply_overrides(&mut settings, |k| {
            (k == "WAYMARK_ROOT_MATCH").then(|| "nope".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}});
        let over = serde_json::json!({"a": {"c": 3}});
        assert_eq!(merge_json(base, over), serde_json::json!({"a": {"b": 1, "c": 3}}));
    }
}
