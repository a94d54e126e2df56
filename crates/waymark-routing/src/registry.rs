//! The route table.
//!
//! Routes live in one ordered bucket per HTTP method. Lookup walks the
//! bucket in registration order and returns the first pattern that matches;
//! registering the same `(method, path)` again replaces the earlier entry in
//! place, so it keeps its original position.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use waymark_core::{RootMatch, WaymarkError, WaymarkResult};
use waymark_http::RouteParams;

use crate::action::ActionSpec;
use crate::callbacks::CallbackTable;
use crate::method::HttpMethod;
use crate::pattern::{self, CompiledPattern, PLACEHOLDER};
use crate::snapshot::{RouteSnapshot, SnapshotBucket, SNAPSHOT_VERSION};

/// One registered route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// The normalized pattern, including any group prefix.
    pub path: String,
    /// Every method the route was declared for.
    pub methods: Vec<HttpMethod>,
    /// The raw action value.
    pub action: ActionSpec,
    /// The route name, if one was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Ordered, duplicate-free middleware references.
    #[serde(default)]
    pub middleware: Vec<String>,
}

impl RouteEntry {
    /// Creates an entry with no name and no middleware. The path is normalized.
    pub fn new(methods: Vec<HttpMethod>, path: &str, action: ActionSpec) -> Self {
        Self {
            path: pattern::normalize(path),
            methods,
            action,
            name: None,
            middleware: Vec::new(),
        }
    }

    /// Appends middleware references, skipping ones already attached.
    pub fn add_middleware<I, S>(&mut self, middleware: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for mw in middleware {
            let mw = mw.into();
            if !self.middleware.contains(&mw) {
                self.middleware.push(mw);
            }
        }
    }
}

/// One segment of a named route's path, used for reverse routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Segment {
    /// Fixed text. May still embed `{name}` tokens, e.g. `{name}.json`.
    Literal(String),
    /// A segment that is exactly one `{name}` placeholder.
    Param(String),
}

/// Splits a path into reverse-routing segments.
///
/// ```
/// use waymark_routing::registry::{segments, Segment};
///
/// assert_eq!(
///     segments("/users/{id}"),
///     vec![Segment::Literal("users".into()), Segment::Param("id".into())]
/// );
/// assert!(segments("/").is_empty());
/// ```
pub fn segments(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            PLACEHOLDER
                .captures(s)
                .filter(|c| c.get(0).is_some_and(|m| m.as_str() == s))
                .map_or_else(|| Segment::Literal(s.to_string()), |c| Segment::Param(c[1].to_string()))
        })
        .collect()
}

#[derive(Debug, Clone)]
struct StoredRoute {
    entry: RouteEntry,
    compiled: CompiledPattern,
}

#[derive(Debug, Clone, Default)]
struct Bucket {
    routes: Vec<StoredRoute>,
    index: HashMap<String, usize>,
}

/// Per-bucket route counts at one point in registration history.
///
/// Taken at group entry; the routes appended after it are the ones the
/// group declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryMarker {
    counts: BTreeMap<HttpMethod, usize>,
}

/// The route registry: per-method buckets, named-route segments, the
/// fallback action and the callback table.
///
/// # Examples
///
/// ```
/// use waymark_routing::{HttpMethod, RouteEntry, RouteRegistry};
///
/// let mut registry = RouteRegistry::new();
/// registry
///     .register(RouteEntry::new(vec![HttpMethod::Get], "/a/{id}", "first".into()))
///     .unwrap();
/// registry
///     .register(RouteEntry::new(vec![HttpMethod::Get], "/a/{slug}", "second".into()))
///     .unwrap();
///
/// let (entry, params) = registry.find(HttpMethod::Get, "/a/x").unwrap();
/// assert_eq!(entry.path, "/a/{id}");
/// assert_eq!(params.get("id"), Some("x"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    buckets: BTreeMap<HttpMethod, Bucket>,
    names: HashMap<String, Vec<Segment>>,
    fallback: Option<ActionSpec>,
    callbacks: CallbackTable,
    root_match: RootMatch,
}

impl RouteRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how a request for `/` is matched.
    pub fn set_root_match(&mut self, root_match: RootMatch) {
        self.root_match = root_match;
    }

    /// Returns how a request for `/` is matched.
    pub const fn root_match(&self) -> RootMatch {
        self.root_match
    }

    /// Registers a route under each of its methods.
    ///
    /// An existing route with the same method and path is replaced in place.
    /// The replaced route's name stops resolving unless the new entry
    /// carries it again.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern cannot be compiled.
    pub fn register(&mut self, mut entry: RouteEntry) -> WaymarkResult<()> {
        entry.path = pattern::normalize(&entry.path);
        let compiled = CompiledPattern::compile(&entry.path)?;

        let mut replaced_names = Vec::new();
        for method in entry.methods.clone() {
            let bucket = self.buckets.entry(method).or_default();
            let stored = StoredRoute {
                entry: entry.clone(),
                compiled: compiled.clone(),
            };
            if let Some(&idx) = bucket.index.get(&entry.path) {
                tracing::debug!(%method, path = %entry.path, "Replacing existing route");
                let previous = std::mem::replace(&mut bucket.routes[idx], stored);
                replaced_names.extend(previous.entry.name);
            } else {
                bucket.index.insert(entry.path.clone(), bucket.routes.len());
                bucket.routes.push(stored);
            }
        }

        let path_segments = segments(&entry.path);
        for old in replaced_names {
            let still_carried = self.buckets.values().any(|bucket| {
                bucket
                    .index
                    .get(&entry.path)
                    .is_some_and(|&idx| bucket.routes[idx].entry.name.as_ref() == Some(&old))
            });
            if !still_carried && self.names.get(&old) == Some(&path_segments) {
                tracing::debug!(name = %old, path = %entry.path, "Dropping name of replaced route");
                self.names.remove(&old);
            }
        }

        if let Some(name) = entry.name {
            self.names.insert(name, path_segments);
        }
        Ok(())
    }

    fn check_present(&self, methods: &[HttpMethod], path: &str) -> WaymarkResult<()> {
        for method in methods {
            let present = self
                .buckets
                .get(method)
                .is_some_and(|b| b.index.contains_key(path));
            if !present {
                return Err(WaymarkError::RouteNotFound {
                    method: method.to_string(),
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    }

    fn entry_mut(&mut self, method: HttpMethod, path: &str) -> Option<&mut RouteEntry> {
        let bucket = self.buckets.get_mut(&method)?;
        let idx = *bucket.index.get(path)?;
        Some(&mut bucket.routes[idx].entry)
    }

    /// Appends middleware to the routes registered at `path` under `methods`.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::RouteNotFound`] if any of the pairs is absent.
    /// Nothing is modified in that case.
    pub fn attach_middleware(
        &mut self,
        methods: &[HttpMethod],
        path: &str,
        middleware: &[String],
    ) -> WaymarkResult<()> {
        let path = pattern::normalize(path);
        self.check_present(methods, &path)?;
        for &method in methods {
            if let Some(entry) = self.entry_mut(method, &path) {
                entry.add_middleware(middleware.iter().cloned());
            }
        }
        Ok(())
    }

    /// Names the routes registered at `path` under `methods` and records the
    /// path's segments for reverse routing. A name used earlier is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::RouteNotFound`] if any of the pairs is absent.
    pub fn attach_name(&mut self, methods: &[HttpMethod], path: &str, name: &str) -> WaymarkResult<()> {
        let path = pattern::normalize(path);
        self.check_present(methods, &path)?;
        for &method in methods {
            if let Some(entry) = self.entry_mut(method, &path) {
                entry.name = Some(name.to_string());
            }
        }
        if self.names.insert(name.to_string(), segments(&path)).is_some() {
            tracing::debug!(name, path = %path, "Route name reassigned");
        }
        Ok(())
    }

    /// Returns the route registered at exactly `(method, path)`.
    pub fn get(&self, method: HttpMethod, path: &str) -> Option<&RouteEntry> {
        let bucket = self.buckets.get(&method)?;
        let idx = *bucket.index.get(&pattern::normalize(path))?;
        Some(&bucket.routes[idx].entry)
    }

    /// Finds the first route in `method`'s bucket whose pattern matches `path`.
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<(&RouteEntry, RouteParams)> {
        let candidate = pattern::normalize(path);
        self.buckets.get(&method)?.routes.iter().find_map(|stored| {
            stored
                .compiled
                .test(&candidate, self.root_match)
                .map(|params| (&stored.entry, params))
        })
    }

    /// Iterates over the routes of one method in registration order.
    pub fn entries_for(&self, method: HttpMethod) -> impl Iterator<Item = &RouteEntry> + '_ {
        self.buckets
            .get(&method)
            .into_iter()
            .flat_map(|b| b.routes.iter().map(|s| &s.entry))
    }

    /// Iterates over every `(method, route)` pair, bucket by bucket.
    pub fn routes(&self) -> impl Iterator<Item = (HttpMethod, &RouteEntry)> + '_ {
        self.buckets
            .iter()
            .flat_map(|(method, b)| b.routes.iter().map(move |s| (*method, &s.entry)))
    }

    /// Returns the number of `(method, path)` pairs.
    pub fn len(&self) -> usize {
        self.buckets.values().map(|b| b.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the segments recorded for a named route.
    pub fn segments_for(&self, name: &str) -> Option<&[Segment]> {
        self.names.get(name).map(Vec::as_slice)
    }

    /// Returns every route name, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sets the action used when no route matches.
    pub fn set_fallback(&mut self, action: ActionSpec) {
        self.fallback = Some(action);
    }

    pub const fn fallback(&self) -> Option<&ActionSpec> {
        self.fallback.as_ref()
    }

    pub const fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackTable {
        &mut self.callbacks
    }

    /// Records the current size of every bucket.
    pub fn marker(&self) -> RegistryMarker {
        RegistryMarker {
            counts: self
                .buckets
                .iter()
                .map(|(method, b)| (*method, b.routes.len()))
                .collect(),
        }
    }

    /// Returns the `(method, path)` pairs appended since `marker` was taken.
    ///
    /// A route that replaced an earlier entry in place is not reported.
    pub fn added_since(&self, marker: &RegistryMarker) -> Vec<(HttpMethod, String)> {
        self.buckets
            .iter()
            .flat_map(|(method, b)| {
                let start = marker.counts.get(method).copied().unwrap_or(0);
                b.routes
                    .iter()
                    .skip(start)
                    .map(move |s| (*method, s.entry.path.clone()))
            })
            .collect()
    }

    /// Captures the route table as a serializable snapshot.
    ///
    /// Callables in the callback table are not part of the snapshot.
    pub fn snapshot(&self) -> RouteSnapshot {
        RouteSnapshot {
            version: SNAPSHOT_VERSION,
            buckets: self
                .buckets
                .iter()
                .map(|(method, b)| SnapshotBucket {
                    method: *method,
                    routes: b.routes.iter().map(|s| s.entry.clone()).collect(),
                })
                .collect(),
            names: self
                .names
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            fallback: self.fallback.clone(),
        }
    }

    /// Replaces the route table with the contents of a snapshot.
    ///
    /// The callback table and root-match mode are kept.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::SnapshotVersionMismatch`] for an incompatible
    /// snapshot, or an error if a stored pattern no longer compiles.
    pub fn restore(&mut self, snapshot: RouteSnapshot) -> WaymarkResult<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(WaymarkError::SnapshotVersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }

        let mut buckets = BTreeMap::new();
        for SnapshotBucket { method, routes } in snapshot.buckets {
            let mut bucket = Bucket::default();
            for entry in routes {
                let compiled = CompiledPattern::compile(&entry.path)?;
                bucket.index.insert(entry.path.clone(), bucket.routes.len());
                bucket.routes.push(StoredRoute { entry, compiled });
            }
            buckets.insert(method, bucket);
        }

        self.buckets = buckets;
        self.names = snapshot.names.into_iter().collect();
        self.fallback = snapshot.fallback;
        Ok(())
    }

    /// Builds a registry from a snapshot file written by [`RouteSnapshot::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// snapshot version is incompatible.
    pub fn load_cached(path: &Path) -> WaymarkResult<Self> {
        let snapshot = RouteSnapshot::load(path)?;
        let mut registry = Self::new();
        registry.restore(snapshot)?;
        tracing::info!(path = %path.display(), routes = registry.len(), "Loaded cached routes");
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(methods: &[HttpMethod], path: &str, action: &str) -> RouteEntry {
        RouteEntry::new(methods.to_vec(), path, action.into())
    }

    #[test]
    fn test_first_match_wins() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Get], "/a/{id}", "a")).unwrap();
        r.register(entry(&[HttpMethod::Get], "/a/{slug}", "b")).unwrap();
        for _ in 0..3 {
            let (e, _) = r.find(HttpMethod::Get, "/a/x").unwrap();
            assert_eq!(e.action, ActionSpec::from("a"));
        }
    }

    #[test]
    fn test_duplicate_overwrites_in_place() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Get], "/x", "old")).unwrap();
        r.register(entry(&[HttpMethod::Get], "/y", "other")).unwrap();
        r.register(entry(&[HttpMethod::Get], "/x/", "new")).unwrap();

        let paths: Vec<_> = r.entries_for(HttpMethod::Get).map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/x", "/y"]);
        assert_eq!(r.get(HttpMethod::Get, "/x").unwrap().action, ActionSpec::from("new"));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_overwrite_without_name_drops_old_name() {
        let mut r = RouteRegistry::new();
        let mut named = entry(&[HttpMethod::Get], "/users/{id}", "old");
        named.name = Some("users.show".into());
        r.register(named).unwrap();
        assert!(r.segments_for("users.show").is_some());

        r.register(entry(&[HttpMethod::Get], "/users/{id}", "new")).unwrap();
        assert!(r.segments_for("users.show").is_none());
        assert!(r.get(HttpMethod::Get, "/users/{id}").unwrap().name.is_none());
    }

    #[test]
    fn test_overwrite_one_method_keeps_name_of_other() {
        let mut r = RouteRegistry::new();
        let mut named = entry(&[HttpMethod::Get, HttpMethod::Post], "/form", "v");
        named.name = Some("form".into());
        r.register(named).unwrap();

        r.register(entry(&[HttpMethod::Get], "/form", "replacement")).unwrap();
        assert!(r.segments_for("form").is_some());
        assert_eq!(r.get(HttpMethod::Post, "/form").unwrap().name.as_deref(), Some("form"));
    }

    #[test]
    fn test_overwrite_keeps_name_moved_elsewhere() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Get], "/a", "v")).unwrap();
        r.register(entry(&[HttpMethod::Get], "/b", "v")).unwrap();
        r.attach_name(&[HttpMethod::Get], "/a", "home").unwrap();
        r.attach_name(&[HttpMethod::Get], "/b", "home").unwrap();

        r.register(entry(&[HttpMethod::Get], "/a", "replacement")).unwrap();
        assert_eq!(r.segments_for("home").unwrap(), &[Segment::Literal("b".into())]);
    }

    #[test]
    fn test_methods_are_separate_buckets() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Post], "/items", "store")).unwrap();
        assert!(r.find(HttpMethod::Get, "/items").is_none());
        assert!(r.find(HttpMethod::Post, "/items").is_some());
    }

    #[test]
    fn test_attach_middleware_dedupes() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Get, HttpMethod::Post], "/m", "v")).unwrap();
        r.attach_middleware(&[HttpMethod::Get], "/m", &["auth".into(), "log".into()])
            .unwrap();
        r.attach_middleware(&[HttpMethod::Get], "/m", &["auth".into()]).unwrap();
        assert_eq!(r.get(HttpMethod::Get, "/m").unwrap().middleware, vec!["auth", "log"]);
        assert!(r.get(HttpMethod::Post, "/m").unwrap().middleware.is_empty());
    }

    #[test]
    fn test_attach_to_missing_route() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Get], "/m", "v")).unwrap();
        let err = r
            .attach_middleware(&[HttpMethod::Get, HttpMethod::Put], "/m", &["auth".into()])
            .unwrap_err();
        assert!(matches!(err, WaymarkError::RouteNotFound { ref method, .. } if method == "PUT"));
        assert!(r.get(HttpMethod::Get, "/m").unwrap().middleware.is_empty());

        assert!(r.attach_name(&[HttpMethod::Get], "/nope", "n").is_err());
    }

    #[test]
    fn test_attach_name_overwrites() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Get], "/one", "v")).unwrap();
        r.register(entry(&[HttpMethod::Get], "/two/{id}", "v")).unwrap();
        r.attach_name(&[HttpMethod::Get], "/one", "dup").unwrap();
        r.attach_name(&[HttpMethod::Get], "/two/{id}", "dup").unwrap();
        assert_eq!(
            r.segments_for("dup").unwrap(),
            &[Segment::Literal("two".into()), Segment::Param("id".into())]
        );
        assert_eq!(r.names(), vec!["dup"]);
    }

    #[test]
    fn test_root_match_modes() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Get], "/users/{id}", "users")).unwrap();
        r.register(entry(&[HttpMethod::Get], "/", "home")).unwrap();

        let (e, _) = r.find(HttpMethod::Get, "/").unwrap();
        assert_eq!(e.action, ActionSpec::from("home"));

        r.set_root_match(RootMatch::Any);
        let (e, params) = r.find(HttpMethod::Get, "/").unwrap();
        assert_eq!(e.action, ActionSpec::from("users"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_marker_and_added_since() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Get], "/before", "v")).unwrap();
        let marker = r.marker();
        r.register(entry(&[HttpMethod::Get, HttpMethod::Post], "/after", "v")).unwrap();
        r.register(entry(&[HttpMethod::Get], "/before", "replaced")).unwrap();

        assert_eq!(
            r.added_since(&marker),
            vec![
                (HttpMethod::Get, "/after".to_string()),
                (HttpMethod::Post, "/after".to_string())
            ]
        );
    }

    #[test]
    fn test_snapshot_restore_preserves_order_and_names() {
        let mut r = RouteRegistry::new();
        r.register(entry(&[HttpMethod::Get], "/a/{id}", "first")).unwrap();
        r.register(entry(&[HttpMethod::Get], "/a/{slug}", "second")).unwrap();
        r.attach_name(&[HttpMethod::Get], "/a/{id}", "a.show").unwrap();
        r.set_fallback("errors.fallback".into());

        let mut restored = RouteRegistry::new();
        restored.restore(r.snapshot()).unwrap();
        let (e, _) = restored.find(HttpMethod::Get, "/a/z").unwrap();
        assert_eq!(e.path, "/a/{id}");
        assert!(restored.segments_for("a.show").is_some());
        assert_eq!(restored.fallback(), Some(&ActionSpec::from("errors.fallback")));
    }

    #[test]
    fn test_restore_rejects_other_versions() {
        let mut snapshot = RouteRegistry::new().snapshot();
        snapshot.version = 99;
        let err = RouteRegistry::new().restore(snapshot).unwrap_err();
        assert!(matches!(
            err,
            WaymarkError::SnapshotVersionMismatch { expected: 1, found: 99 }
        ));
    }

    #[test]
    fn test_segments_mixed_literal() {
        assert_eq!(
            segments("/files/{name}.json"),
            vec![Segment::Literal("files".into()), Segment::Literal("{name}.json".into())]
        );
    }
}
