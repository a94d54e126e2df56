//! Settings for waymark.
//!
//! This module provides the [`Settings`] struct, which holds router and
//! dispatcher configuration, and [`LazySettings`], a globally-accessible,
//! lazily-initialized settings instance.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::WaymarkError;

/// Policy for the root-path shortcut applied by the pattern matcher.
///
/// With [`RootMatch::Pattern`] a request for `/` only matches a route whose
/// pattern is itself `/`. [`RootMatch::Any`] keeps the legacy behavior where a
/// request for `/` structurally matches every pattern in the bucket, so the
/// first registered route wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootMatch {
    /// Only the `/` pattern matches a `/` request.
    #[default]
    Pattern,
    /// A `/` request matches any pattern.
    Any,
}

impl fmt::Display for RootMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern => f.write_str("pattern"),
            Self::Any => f.write_str("any"),
        }
    }
}

impl FromStr for RootMatch {
    type Err = WaymarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pattern" => Ok(Self::Pattern),
            "any" => Ok(Self::Any),
            other => Err(WaymarkError::ConfigurationError(format!(
                "Unknown root match policy '{other}' (expected 'pattern' or 'any')"
            ))),
        }
    }
}

/// The complete set of router settings.
///
/// # Examples
///
/// ```
/// use waymark_core::settings::{RootMatch, Settings};
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.root_match, RootMatch::Pattern);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled. Selects the debug 404 view.
    pub debug: bool,
    /// The application base URL prepended to reverse-routed paths.
    pub base_url: String,

    // ── Routing ──────────────────────────────────────────────────────

    /// How the matcher treats a request for `/`.
    pub root_match: RootMatch,
    /// Whether the registered fallback action answers unmatched requests.
    pub use_fallback: bool,
    /// Location of a precompiled route snapshot, if one should be loaded at boot.
    pub route_cache: Option<PathBuf>,

    // ── Middleware ────────────────────────────────────────────────────

    /// Middleware references run on every request before matching.
    pub global_middleware: Vec<String>,

    // ── Views ────────────────────────────────────────────────────────

    /// The view rendered for 404 outcomes in production.
    pub not_found_view: String,
    /// The view rendered for 404 outcomes in debug mode.
    pub debug_not_found_view: String,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            base_url: "http://localhost".to_string(),

            root_match: RootMatch::Pattern,
            use_fallback: true,
            route_cache: None,

            global_middleware: Vec::new(),

            not_found_view: "errors.404".to_string(),
            debug_not_found_view: "errors.404-debug".to_string(),

            log_level: "info".to_string(),

            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns the 404 view matching the current environment.
    pub fn active_not_found_view(&self) -> &str {
        if self.debug {
            &self.debug_not_found_view
        } else {
            &self.not_found_view
        }
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// Call [`configure`](LazySettings::configure) once at startup to set the
/// settings, then use [`get`](LazySettings::get) to access them.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings. Must be called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if settings have already been configured.
    pub fn configure(&self, settings: Settings) {
        self.inner
            .set(settings)
            .expect("Settings have already been configured");
    }

    /// Returns a reference to the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if settings have not been configured.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings have not been configured. Call SETTINGS.configure() first.")
    }

    /// Returns the configured settings, or `None` before configuration.
    pub fn try_get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.base_url, "http://localhost");
        assert_eq!(s.root_match, RootMatch::Pattern);
        assert!(s.use_fallback);
        assert!(s.route_cache.is_none());
        assert!(s.global_middleware.is_empty());
        assert_eq!(s.log_level, "info");
    }

    #[test]
    fn test_active_not_found_view() {
        let mut s = Settings::default();
        assert_eq!(s.active_not_found_view(), "errors.404-debug");
        s.debug = false;
        assert_eq!(s.active_not_found_view(), "errors.404");
    }

    #[test]
    fn test_root_match_parse() {
        assert_eq!("any".parse::<RootMatch>().unwrap(), RootMatch::Any);
        assert_eq!(" Pattern ".parse::<RootMatch>().unwrap(), RootMatch::Pattern);
        assert!("loose".parse::<RootMatch>().is_err());
        assert_eq!(RootMatch::Any.to_string(), "any");
    }

    #[test]
    fn test_lazy_settings_configure_and_get() {
        let lazy = LazySettings::new();
        assert!(!lazy.is_configured());
        assert!(lazy.try_get().is_none());

        let settings = Settings {
            debug: false,
            base_url: "https://example.com".to_string(),
            ..Settings::default()
        };

        lazy.configure(settings);
        assert!(lazy.is_configured());
        assert!(!lazy.get().debug);
        assert_eq!(lazy.get().base_url, "https://example.com");
    }

    #[test]
    #[should_panic(expected = "already been configured")]
    fn test_lazy_settings_double_configure() {
        let lazy = LazySettings::new();
        lazy.configure(Settings::default());
        lazy.configure(Settings::default());
    }

    #[test]
    fn test_settings_serde_roundtrip() {
        let s = Settings {
            root_match: RootMatch::Any,
            ..Settings::default()
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["root_match"], "any");
        let back: Settings = serde_json::from_value(json).unwrap();
        assert_eq!(back.root_match, RootMatch::Any);
    }
}
