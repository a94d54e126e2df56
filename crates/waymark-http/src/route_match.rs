//! Request-scoped route match data.
//!
//! When the dispatcher finds a route for a request it records the pattern
//! that matched, the route name and the captured placeholder values on the
//! request itself, so concurrent requests never share match state.

use serde::{Deserialize, Serialize};

/// Captured placeholder values, in the order they appear in the pattern.
///
/// # Examples
///
/// ```
/// use waymark_http::RouteParams;
///
/// let params: RouteParams = vec![("id".to_string(), "5".to_string())].into_iter().collect();
/// assert_eq!(params.get("id"), Some("5"));
/// assert_eq!(params.get("slug"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteParams {
    values: Vec<(String, String)>,
}

impl RouteParams {
    /// Creates an empty parameter set.
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Appends a captured value. A later value with the same name replaces the earlier one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.values.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.values.push((name, value));
        }
    }

    /// Returns the value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the captured values without their names, in pattern order.
    pub fn values(&self) -> Vec<&str> {
        self.values.iter().map(|(_, v)| v.as_str()).collect()
    }

    /// Returns the number of captured values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Converts the captures into a JSON object, used as view render data.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(n, v)| (n.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl FromIterator<(String, String)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// The outcome of matching a request against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The normalized route pattern that served the match (e.g. `/users/{id}`).
    pub pattern: String,
    /// The route name, if one was attached.
    pub name: Option<String>,
    /// Captured placeholder values.
    pub params: RouteParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut params = RouteParams::new();
        params.insert("id", "5");
        params.insert("postId", "9");
        assert_eq!(params.values(), vec!["5", "9"]);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut params = RouteParams::new();
        params.insert("id", "5");
        params.insert("id", "6");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("6"));
    }

    #[test]
    fn test_to_json() {
        let mut params = RouteParams::new();
        params.insert("slug", "hello-world");
        assert_eq!(params.to_json(), serde_json::json!({"slug": "hello-world"}));
        assert_eq!(RouteParams::new().to_json(), serde_json::json!({}));
    }
}
