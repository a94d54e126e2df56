//! Path normalization and placeholder matching.
//!
//! A pattern is a normalized path whose segments may contain `{name}`
//! placeholders. Each placeholder captures one or more word or hyphen
//! characters and never crosses a `/`. Everything else in the pattern is
//! matched literally.

use std::fmt;
use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;

use waymark_core::{RootMatch, WaymarkError, WaymarkResult};
use waymark_http::RouteParams;

/// Matches a `{identifier}` placeholder token.
pub(crate) static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// The character class a placeholder captures.
const PARAM_CLASS: &str = r"[\w-]+";

/// Normalizes a path: exactly one leading `/`, no trailing `/` except for
/// the root path itself.
///
/// # Examples
///
/// ```
/// use waymark_routing::pattern::normalize;
///
/// assert_eq!(normalize("users/{id}/"), "/users/{id}");
/// assert_eq!(normalize("//api"), "/api");
/// assert_eq!(normalize(""), "/");
/// assert_eq!(normalize("/"), "/");
/// ```
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Joins a group prefix and a route pattern into one normalized path.
///
/// An empty or root prefix leaves the pattern unchanged.
///
/// ```
/// use waymark_routing::pattern::join;
///
/// assert_eq!(join("/api/v1", "ping"), "/api/v1/ping");
/// assert_eq!(join("/admin", "/"), "/admin");
/// assert_eq!(join("", "/users"), "/users");
/// ```
pub fn join(prefix: &str, pattern: &str) -> String {
    let prefix = normalize(prefix);
    let pattern = normalize(pattern);
    match (prefix.as_str(), pattern.as_str()) {
        ("/", _) => pattern,
        (_, "/") => prefix,
        _ => format!("{prefix}{pattern}"),
    }
}

/// Returns the placeholder names of a pattern, in order of appearance.
pub fn placeholders(pattern: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(pattern)
        .map(|c| c[1].to_string())
        .collect()
}

/// A pattern compiled for matching.
///
/// Patterns without placeholders are compared as plain strings; the rest
/// are compiled into an anchored regex with one named group per placeholder.
#[derive(Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Option<Regex>,
    params: Vec<String>,
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("source", &self.source)
            .field("regex", &self.regex.as_ref().map(Regex::as_str))
            .field("params", &self.params)
            .finish()
    }
}

impl CompiledPattern {
    /// Compiles a pattern. The pattern is normalized first.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::ImproperlyConfigured`] if the same placeholder
    /// name appears twice in one pattern.
    pub fn compile(pattern: &str) -> WaymarkResult<Self> {
        let source = normalize(pattern);
        let params = placeholders(&source);
        if params.is_empty() {
            return Ok(Self {
                source,
                regex: None,
                params,
            });
        }

        let mut regex_str = String::from("^");
        let mut last = 0;
        for token in PLACEHOLDER.captures_iter(&source) {
            let (Some(whole), Some(name)) = (token.get(0), token.get(1)) else {
                continue;
            };
            regex_str.push_str(&regex::escape(&source[last..whole.start()]));
            write!(regex_str, "(?P<{}>{PARAM_CLASS})", name.as_str()).ok();
            last = whole.end();
        }
        regex_str.push_str(&regex::escape(&source[last..]));
        regex_str.push('$');

        let regex = Regex::new(&regex_str).map_err(|e| {
            WaymarkError::ImproperlyConfigured(format!("Invalid route pattern '{source}': {e}"))
        })?;

        Ok(Self {
            source,
            regex: Some(regex),
            params,
        })
    }

    /// Returns the normalized pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the placeholder names in pattern order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Tests a normalized candidate path against this pattern.
    ///
    /// Returns the captured values on a match. Under [`RootMatch::Any`] a
    /// candidate of `/` matches every pattern with no captures.
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_core::RootMatch;
    /// use waymark_routing::pattern::CompiledPattern;
    ///
    /// let pattern = CompiledPattern::compile("/users/{id}/posts/{postId}").unwrap();
    /// let params = pattern.test("/users/5/posts/9", RootMatch::Pattern).unwrap();
    /// assert_eq!(params.values(), vec!["5", "9"]);
    ///
    /// assert!(pattern.test("/users/5", RootMatch::Pattern).is_none());
    /// assert!(pattern.test("/", RootMatch::Any).is_some());
    /// ```
    pub fn test(&self, candidate: &str, root: RootMatch) -> Option<RouteParams> {
        if candidate == "/" && root == RootMatch::Any {
            return Some(RouteParams::new());
        }

        let Some(regex) = &self.regex else {
            return (self.source == candidate).then(RouteParams::new);
        };

        let captures = regex.captures(candidate)?;
        let mut params = RouteParams::new();
        for name in &self.params {
            if let Some(m) = captures.name(name) {
                params.insert(name.as_str(), m.as_str());
            }
        }
        Some(params)
    }
}
