//! Reverse URL resolution.
//!
//! Named routes record their path segments at registration time. Reversing
//! a name substitutes the supplied values into those segments.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

use waymark_core::{WaymarkError, WaymarkResult};

use crate::pattern::PLACEHOLDER;
use crate::registry::{RouteRegistry, Segment};

/// Builds the path of a named route, without any base URL.
///
/// # Errors
///
/// Returns [`WaymarkError::NamedRouteNotFound`] for an unknown name and
/// [`WaymarkError::MissingRouteParameter`] when a placeholder has no value.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use waymark_routing::RouteBuilder;
/// use waymark_routing::reverse::route_path;
///
/// let mut routes = RouteBuilder::new();
/// routes.get("/users/{id}/posts/{postId}", "PostController@show").unwrap().name("user.post").unwrap();
/// let registry = routes.finish();
///
/// let params = HashMap::from([("id", "5"), ("postId", "9")]);
/// assert_eq!(route_path(&registry, "user.post", &params).unwrap(), "/users/5/posts/9");
/// ```
pub fn route_path<S: BuildHasher>(
    registry: &RouteRegistry,
    name: &str,
    params: &HashMap<&str, &str, S>,
) -> WaymarkResult<String> {
    let segments = registry
        .segments_for(name)
        .ok_or_else(|| WaymarkError::NamedRouteNotFound(name.to_string()))?;

    let mut parts = Vec::with_capacity(segments.len());
    for segment in segments {
        let part = match segment {
            Segment::Param(param) => lookup(name, param, params)?.to_string(),
            Segment::Literal(text) => substitute_literal(name, text, params)?,
        };
        parts.push(part);
    }
    Ok(format!("/{}", parts.join("/")))
}

/// Builds the absolute URL of a named route under `base_url`.
///
/// # Errors
///
/// See [`route_path`].
pub fn route_url<S: BuildHasher>(
    registry: &RouteRegistry,
    base_url: &str,
    name: &str,
    params: &HashMap<&str, &str, S>,
) -> WaymarkResult<String> {
    let path = route_path(registry, name, params)?;
    let base = base_url.trim_end_matches('/');
    if path == "/" && !base.is_empty() {
        return Ok(format!("{base}/"));
    }
    Ok(format!("{base}{path}"))
}

fn lookup<'a, S: BuildHasher>(
    route: &str,
    param: &str,
    params: &HashMap<&str, &'a str, S>,
) -> WaymarkResult<&'a str> {
    params
        .get(param)
        .copied()
        .ok_or_else(|| WaymarkError::MissingRouteParameter {
            route: route.to_string(),
            parameter: param.to_string(),
        })
}

/// Replaces `{name}` tokens embedded in a literal segment.
fn substitute_literal<S: BuildHasher>(
    route: &str,
    text: &str,
    params: &HashMap<&str, &str, S>,
) -> WaymarkResult<String> {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for token in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(param)) = (token.get(0), token.get(1)) else {
            continue;
        };
        result.push_str(&text[last..whole.start()]);
        result.push_str(lookup(route, param.as_str(), params)?);
        last = whole.end();
    }
    result.push_str(&text[last..]);
    Ok(result)
}

/// Generates URLs for named routes against a fixed base URL.
///
/// ```
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use waymark_routing::{RouteBuilder, UrlGenerator};
///
/// let mut routes = RouteBuilder::new();
/// routes.get("/users/{id}", "UserController@show").unwrap().name("users.show").unwrap();
/// let urls = UrlGenerator::new(Arc::new(routes.finish()), "https://example.com/");
///
/// let params = HashMap::from([("id", "5")]);
/// assert_eq!(urls.resolve("users.show", &params).unwrap(), "https://example.com/users/5");
/// ```
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    registry: Arc<RouteRegistry>,
    base_url: String,
}

impl UrlGenerator {
    pub fn new(registry: Arc<RouteRegistry>, base_url: impl Into<String>) -> Self {
        Self {
            registry,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the absolute URL of a named route.
    ///
    /// # Errors
    ///
    /// See [`route_path`].
    pub fn resolve<S: BuildHasher>(&self, name: &str, params: &HashMap<&str, &str, S>) -> WaymarkResult<String> {
        route_url(&self.registry, &self.base_url, name, params)
    }

    /// Returns the path of a named route, without the base URL.
    ///
    /// # Errors
    ///
    /// See [`route_path`].
    pub fn path<S: BuildHasher>(&self, name: &str, params: &HashMap<&str, &str, S>) -> WaymarkResult<String> {
        route_path(&self.registry, name, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RouteBuilder;

    fn registry() -> RouteRegistry {
        let mut r = RouteBuilder::new();
        r.get("/", "home").unwrap().name("home").unwrap();
        r.get("/users/{id}/posts/{postId}", "PostController@show")
            .unwrap()
            .name("user.post")
            .unwrap();
        r.get("/files/{name}.json", "files").unwrap().name("files.json").unwrap();
        r.finish()
    }

    #[test]
    fn test_route_path_substitutes() {
        let params = HashMap::from([("id", "5"), ("postId", "9"), ("unused", "x")]);
        assert_eq!(route_path(&registry(), "user.post", &params).unwrap(), "/users/5/posts/9");
    }

    #[test]
    fn test_route_path_root() {
        let params: HashMap<&str, &str> = HashMap::new();
        assert_eq!(route_path(&registry(), "home", &params).unwrap(), "/");
    }

    #[test]
    fn test_embedded_placeholder() {
        let params = HashMap::from([("name", "report")]);
        assert_eq!(route_path(&registry(), "files.json", &params).unwrap(), "/files/report.json");
    }

    #[test]
    fn test_missing_parameter() {
        let params = HashMap::from([("id", "5")]);
        let err = route_path(&registry(), "user.post", &params).unwrap_err();
        assert!(matches!(
            err,
            WaymarkError::MissingRouteParameter { ref route, ref parameter }
                if route == "user.post" && parameter == "postId"
        ));
    }

    #[test]
    fn test_unknown_name() {
        let params: HashMap<&str, &str> = HashMap::new();
        let err = route_path(&registry(), "nope", &params).unwrap_err();
        assert!(matches!(err, WaymarkError::NamedRouteNotFound(ref n) if n == "nope"));
    }

    #[test]
    fn test_route_url_base() {
        let params = HashMap::from([("id", "1"), ("postId", "2")]);
        let reg = registry();
        assert_eq!(
            route_url(&reg, "http://localhost:8000/", "user.post", &params).unwrap(),
            "http://localhost:8000/users/1/posts/2"
        );
        let empty: HashMap<&str, &str> = HashMap::new();
        assert_eq!(route_url(&reg, "http://localhost", "home", &empty).unwrap(), "http://localhost/");
        assert_eq!(route_url(&reg, "", "home", &empty).unwrap(), "/");
    }

    #[test]
    fn test_generator_path() {
        let urls = UrlGenerator::new(Arc::new(registry()), "https://example.com");
        let params = HashMap::from([("id", "5"), ("postId", "9")]);
        assert_eq!(urls.path("user.post", &params).unwrap(), "/users/5/posts/9");
        assert_eq!(urls.base_url(), "https://example.com");
    }
}
