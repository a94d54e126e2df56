//! HTTP request type.
//!
//! [`HttpRequest`] is the parsed request the dispatcher works on: a method,
//! a path, an opaque payload, and request-scoped state written during
//! dispatch (the route match and middleware attributes).

use std::collections::HashMap;

use http::{HeaderMap, Method};

use crate::route_match::RouteMatch;

/// An incoming HTTP request.
///
/// # Examples
///
/// ```
/// use waymark_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .method(http::Method::GET)
///     .path("/articles/2024")
///     .query_string("page=1")
///     .build();
///
/// assert_eq!(request.method(), &http::Method::GET);
/// assert_eq!(request.path(), "/articles/2024");
/// assert_eq!(request.query("page").as_deref(), Some("1"));
/// ```
#[derive(Debug)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    attributes: HashMap<String, String>,
    body: Vec<u8>,
    scheme: String,
    route_match: Option<RouteMatch>,
}

impl HttpRequest {
    /// Creates a new [`HttpRequestBuilder`] for constructing an `HttpRequest`.
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Creates an `HttpRequest` from an `http::Request` whose body has already been read.
    pub fn from_http(request: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = request.into_parts();
        let uri = parts.uri;

        let scheme = if parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "https")
            || uri.scheme_str() == Some("https")
        {
            "https".to_string()
        } else {
            "http".to_string()
        };

        Self {
            method: parts.method,
            path: uri.path().to_string(),
            query_string: uri.query().unwrap_or("").to_string(),
            headers: parts.headers,
            attributes: HashMap::new(),
            body,
            scheme,
            route_match: None,
        }
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`).
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the first decoded value of a query parameter.
    pub fn query(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query_string.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw request body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the URL scheme (`"http"` or `"https"`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the host from the `Host` header, defaulting to `localhost`.
    pub fn get_host(&self) -> &str {
        self.header(http::header::HOST.as_str())
            .unwrap_or("localhost")
    }

    /// Returns the full path including the query string.
    pub fn get_full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    /// Returns the absolute URL of this request.
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_http::HttpRequest;
    ///
    /// let request = HttpRequest::builder()
    ///     .path("/missing")
    ///     .header("host", "example.com")
    ///     .build();
    /// assert_eq!(request.full_url(), "http://example.com/missing");
    /// ```
    pub fn full_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.get_host(), self.get_full_path())
    }

    /// Returns the attributes stashed on this request by middleware.
    pub const fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Returns a mutable reference to the request attributes.
    pub fn attributes_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.attributes
    }

    /// Returns the route match, once the dispatcher has matched this request.
    pub const fn route_match(&self) -> Option<&RouteMatch> {
        self.route_match.as_ref()
    }

    /// Publishes the route match for this request.
    pub fn set_route_match(&mut self, route_match: RouteMatch) {
        self.route_match = Some(route_match);
    }

    /// Returns a captured route parameter by name.
    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_match.as_ref()?.params.get(name)
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    attributes: HashMap<String, String>,
    body: Vec<u8>,
    scheme: String,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            headers: HeaderMap::new(),
            attributes: HashMap::new(),
            body: Vec::new(),
            scheme: "http".to_string(),
        }
    }
}

impl HttpRequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the query string (without leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Adds a request attribute.
    #[must_use]
    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets the scheme (http or https).
    #[must_use]
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Builds the [`HttpRequest`].
    pub fn build(self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            headers: self.headers,
            attributes: self.attributes,
            body: self.body,
            scheme: self.scheme,
            route_match: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route_match::RouteParams;

    #[test]
    fn test_builder_defaults() {
        let req = HttpRequest::builder().build();
        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.path(), "/");
        assert_eq!(req.query_string(), "");
        assert!(req.body().is_empty());
        assert_eq!(req.scheme(), "http");
        assert!(req.route_match().is_none());
    }

    #[test]
    fn test_query_decoding() {
        let req = HttpRequest::builder()
            .query_string("q=hello%20world&page=2")
            .build();
        assert_eq!(req.query("q").as_deref(), Some("hello world"));
        assert_eq!(req.query("page").as_deref(), Some("2"));
        assert!(req.query("missing").is_none());
    }

    #[test]
    fn test_full_url_defaults_host() {
        let req = HttpRequest::builder()
            .path("/a")
            .query_string("x=1")
            .build();
        assert_eq!(req.full_url(), "http://localhost/a?x=1");
    }

    #[test]
    fn test_from_http() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("https://example.com/users/5?tab=posts")
            .header("host", "example.com")
            .body(b"payload".to_vec())
            .unwrap();
        let req = HttpRequest::from_http(request);
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.path(), "/users/5");
        assert_eq!(req.query_string(), "tab=posts");
        assert_eq!(req.body(), b"payload");
        assert_eq!(req.scheme(), "https");
        assert_eq!(req.full_url(), "https://example.com/users/5?tab=posts");
    }

    #[test]
    fn test_route_param() {
        let mut req = HttpRequest::builder().build();
        assert!(req.route_param("id").is_none());

        let mut params = RouteParams::new();
        params.insert("id", "42");
        req.set_route_match(RouteMatch {
            pattern: "/users/{id}".to_string(),
            name: Some("users.show".to_string()),
            params,
        });
        assert_eq!(req.route_param("id"), Some("42"));
    }

    #[test]
    fn test_attributes() {
        let mut req = HttpRequest::builder().attribute("user", "alice").build();
        req.attributes_mut().insert("role".to_string(), "admin".to_string());
        assert_eq!(req.attributes().get("user").map(String::as_str), Some("alice"));
        assert_eq!(req.attributes().len(), 2);
    }
}
