//! Callable route actions.
//!
//! Closures cannot be stored in a serializable route table, so the table
//! stores an identifier and the callable lives here. Closures registered
//! through the builder get a generated `closure#N` identifier; callbacks
//! registered by name can be referenced with the `callback:` marker.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use waymark_http::{BoxFuture, HttpRequest, HttpResponse, RouteParams};

/// A callable action: receives the request and the captured parameters.
pub type Callback = Arc<dyn Fn(HttpRequest, RouteParams) -> BoxFuture + Send + Sync>;

/// Wraps an async function or closure into a [`Callback`].
///
/// # Examples
///
/// ```
/// use waymark_http::HttpResponse;
/// use waymark_routing::callback;
///
/// let hello = callback(|_request, params| async move {
///     HttpResponse::ok(format!("hello {}", params.get("name").unwrap_or("world")))
/// });
/// # let _ = hello;
/// ```
pub fn callback<F, Fut>(f: F) -> Callback
where
    F: Fn(HttpRequest, RouteParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |request, params| -> BoxFuture { Box::pin(f(request, params)) })
}

/// Callables keyed by identifier.
#[derive(Clone, Default)]
pub struct CallbackTable {
    callbacks: HashMap<String, Callback>,
    anonymous: usize,
}

impl fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.callbacks.keys().collect();
        keys.sort();
        f.debug_struct("CallbackTable").field("keys", &keys).finish()
    }
}

impl CallbackTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback under `name`, replacing any earlier one.
    pub fn register(&mut self, name: impl Into<String>, callback: Callback) {
        self.callbacks.insert(name.into(), callback);
    }

    /// Registers an anonymous callback and returns its generated identifier.
    pub fn register_anonymous(&mut self, callback: Callback) -> String {
        self.anonymous += 1;
        let key = format!("closure#{}", self.anonymous);
        self.callbacks.insert(key.clone(), callback);
        key
    }

    /// Returns the callback registered under `name`.
    pub fn get(&self, name: &str) -> Option<Callback> {
        self.callbacks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_invoke() {
        let mut table = CallbackTable::new();
        table.register(
            "echo",
            callback(|_req, params| async move {
                HttpResponse::ok(params.get("id").unwrap_or("none").to_string())
            }),
        );
        let cb = table.get("echo").unwrap();
        let mut params = RouteParams::new();
        params.insert("id", "7");
        let response = cb(HttpRequest::builder().build(), params).await;
        assert_eq!(response.body(), "7");
    }

    #[test]
    fn test_anonymous_keys_are_unique() {
        let mut table = CallbackTable::new();
        let a = table.register_anonymous(callback(|_, _| async { HttpResponse::ok("a") }));
        let b = table.register_anonymous(callback(|_, _| async { HttpResponse::ok("b") }));
        assert_ne!(a, b);
        assert!(table.contains(&a));
        assert!(table.contains(&b));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_missing_callback() {
        let table = CallbackTable::new();
        assert!(table.is_empty());
        assert!(table.get("nope").is_none());
    }
}
