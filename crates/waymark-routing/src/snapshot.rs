//! Precompiled route tables.
//!
//! A [`RouteSnapshot`] is the serializable form of a
//! [`RouteRegistry`](crate::RouteRegistry): every bucket in order, the named
//! route segments and the fallback action. Booting from a snapshot skips
//! running the registration code. Closures are not serializable, so a
//! snapshot only carries their identifiers; the callables must be
//! registered again on the restored registry.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use waymark_core::{WaymarkError, WaymarkResult};

use crate::action::ActionSpec;
use crate::method::HttpMethod;
use crate::registry::{RouteEntry, Segment};

/// The snapshot format version this build reads and writes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The routes of one method, in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBucket {
    pub method: HttpMethod,
    pub routes: Vec<RouteEntry>,
}

/// A serializable route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSnapshot {
    pub version: u32,
    pub buckets: Vec<SnapshotBucket>,
    #[serde(default)]
    pub names: BTreeMap<String, Vec<Segment>>,
    #[serde(default)]
    pub fallback: Option<ActionSpec>,
}

impl RouteSnapshot {
    /// Serializes the snapshot to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::SerializationError`] if serialization fails.
    pub fn to_json(&self) -> WaymarkResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| WaymarkError::SerializationError(e.to_string()))
    }

    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::SerializationError`] for malformed input.
    pub fn from_json(json: &str) -> WaymarkResult<Self> {
        serde_json::from_str(json).map_err(|e| WaymarkError::SerializationError(e.to_string()))
    }

    /// Writes the snapshot to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> WaymarkResult<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::debug!(path = %path.display(), "Wrote route snapshot");
        Ok(())
    }

    /// Reads a snapshot from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> WaymarkResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Returns the total number of `(method, path)` pairs.
    pub fn route_count(&self) -> usize {
        self.buckets.iter().map(|b| b.routes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RouteRegistry;

    fn sample() -> RouteRegistry {
        let mut r = RouteRegistry::new();
        r.register(RouteEntry::new(
            vec![HttpMethod::Get, HttpMethod::Head],
            "/users/{id}",
            ("UserController", "show").into(),
        ))
        .unwrap();
        r.attach_name(&[HttpMethod::Get, HttpMethod::Head], "/users/{id}", "users.show")
            .unwrap();
        r.attach_middleware(&[HttpMethod::Get], "/users/{id}", &["auth".into()])
            .unwrap();
        r
    }

    #[test]
    fn test_json_contains_version_and_routes() {
        let snapshot = sample().snapshot();
        assert_eq!(snapshot.route_count(), 2);
        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["buckets"][0]["method"], "GET");
        assert_eq!(json["buckets"][0]["routes"][0]["middleware"][0], "auth");
        assert_eq!(json["names"]["users.show"][1]["kind"], "param");
    }

    #[test]
    fn test_save_and_load_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        sample().snapshot().save(&path).unwrap();

        let registry = RouteRegistry::load_cached(&path).unwrap();
        let (entry, params) = registry.find(HttpMethod::Head, "/users/3").unwrap();
        assert_eq!(entry.name.as_deref(), Some("users.show"));
        assert_eq!(params.get("id"), Some("3"));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = RouteSnapshot::from_json("{not json").unwrap_err();
        assert!(matches!(err, WaymarkError::SerializationError(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RouteSnapshot::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, WaymarkError::IoError(_)));
    }
}
