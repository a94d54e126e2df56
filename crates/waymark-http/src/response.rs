//! HTTP response type.
//!
//! [`HttpResponse`] is the mutable response value threaded through the
//! middleware pipeline and returned by actions.

use std::collections::HashSet;

use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, StatusCode};

/// An HTTP response.
///
/// # Examples
///
/// ```
/// use waymark_http::HttpResponse;
///
/// let response = HttpResponse::ok("Hello, World!");
/// assert_eq!(response.status(), http::StatusCode::OK);
/// assert_eq!(response.body(), "Hello, World!");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    content_type: String,
    redirect: bool,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::ok("")
    }
}

impl HttpResponse {
    /// Creates a new `HttpResponse` with the given status code and text body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            content_type: "text/html; charset=utf-8".to_string(),
            redirect: false,
        }
    }

    /// Creates a 200 OK response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, body)
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden(body: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, body)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error(body: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// Creates a JSON response from a serializable value.
    pub fn json<T: serde::Serialize>(data: &T) -> Self {
        match serde_json::to_string(data) {
            Ok(json) => {
                let mut response = Self::ok(json);
                response.set_content_type("application/json");
                response
            }
            Err(e) => Self::server_error(format!("JSON serialization error: {e}")),
        }
    }

    /// Creates a redirect response to `location` with the given status.
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_http::HttpResponse;
    ///
    /// let response = HttpResponse::redirect("/login", http::StatusCode::FOUND);
    /// assert!(response.is_redirect());
    /// assert_eq!(response.header("location"), Some("/login"));
    /// ```
    pub fn redirect(location: &str, status: StatusCode) -> Self {
        let mut response = Self::new(status, "");
        response.mark_redirect(location);
        response
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns a reference to the headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Adds a header to the response.
    #[must_use]
    pub fn set_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the response body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Replaces the response body.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Returns the content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Sets the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// Marks this response as a redirect to `location`.
    ///
    /// Non-3xx statuses are promoted to `302 Found`.
    pub fn mark_redirect(&mut self, location: &str) {
        if !self.status.is_redirection() {
            self.status = StatusCode::FOUND;
        }
        match HeaderValue::from_str(location) {
            Ok(value) => {
                self.headers.insert(http::header::LOCATION, value);
            }
            Err(_) => tracing::warn!(location, "Redirect target is not a valid header value; Location left unset"),
        }
        self.redirect = true;
    }

    /// Returns `true` if the response was marked as a redirect.
    pub const fn is_redirect(&self) -> bool {
        self.redirect
    }

    /// Copies headers from `other` that this response does not set itself.
    ///
    /// Every value of an inherited header is kept, so repeated headers such
    /// as `Set-Cookie` survive the merge.
    pub fn inherit_headers(&mut self, other: &HeaderMap) {
        let own: HashSet<HeaderName> = self.headers.keys().cloned().collect();
        for name in other.keys() {
            if own.contains(name) {
                continue;
            }
            for value in other.get_all(name) {
                self.headers.append(name.clone(), value.clone());
            }
        }
    }

    /// Converts the response into an `http::Response`.
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body.into_bytes());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        if let Ok(ct) = HeaderValue::from_str(&self.content_type) {
            response
                .headers_mut()
                .entry(http::header::CONTENT_TYPE)
                .or_insert(ct);
        }
        response
    }
}
