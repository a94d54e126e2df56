//! Route actions.
//!
//! A route stores its action as an [`ActionSpec`], the raw value given at
//! registration. It is only interpreted at dispatch time: a text
//! value of the form `Class@method` names a controller action, a text value
//! starting with `callback:` names a registered callable, and any other
//! text names a view.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use waymark_core::{WaymarkError, WaymarkResult};

use crate::callbacks::Callback;

/// Marks a text action as a reference into the callback table.
pub const CALLBACK_MARKER: &str = "callback:";

static CONTROLLER_ACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*(?:(?:::|\\)[A-Za-z_][A-Za-z0-9_]*)*)@([A-Za-z_][A-Za-z0-9_]*)$")
        .expect("valid regex")
});

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:(?:::|\\)[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid regex")
});

/// The action value stored on a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ActionSpec {
    /// A view identifier, `Class@method`, or `callback:<name>`.
    Text(String),
    /// An explicit `(class, method)` controller pair.
    Pair(String, String),
    /// An identifier in the callback table.
    Callback(String),
}

/// What kind of action a spec names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    View,
    Controller,
    Callback,
}

/// A resolved action, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    View(String),
    Controller { class: String, method: String },
    Callback(String),
}

impl ActionSpec {
    /// Classifies the spec without validating it.
    ///
    /// Any text containing `@` is treated as a controller action; a malformed
    /// one fails later in [`ActionSpec::resolve`].
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Text(text) if text.starts_with(CALLBACK_MARKER) => ActionKind::Callback,
            Self::Text(text) if text.contains('@') => ActionKind::Controller,
            Self::Text(_) => ActionKind::View,
            Self::Pair(..) => ActionKind::Controller,
            Self::Callback(_) => ActionKind::Callback,
        }
    }

    /// Resolves the spec into an [`Action`].
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::InvalidActionFormat`] if a controller action
    /// does not have the `Identifier@identifier` shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_routing::{Action, ActionSpec};
    ///
    /// let action = ActionSpec::from("UserController@show").resolve().unwrap();
    /// assert_eq!(
    ///     action,
    ///     Action::Controller { class: "UserController".into(), method: "show".into() }
    /// );
    ///
    /// assert_eq!(
    ///     ActionSpec::from("home.index").resolve().unwrap(),
    ///     Action::View("home.index".into())
    /// );
    ///
    /// assert!(ActionSpec::from("User@@show").resolve().is_err());
    /// ```
    pub fn resolve(&self) -> WaymarkResult<Action> {
        match self {
            Self::Text(text) => {
                if let Some(name) = text.strip_prefix(CALLBACK_MARKER) {
                    return Ok(Action::Callback(name.to_string()));
                }
                if !text.contains('@') {
                    return Ok(Action::View(text.clone()));
                }
                let captures = CONTROLLER_ACTION
                    .captures(text)
                    .ok_or_else(|| WaymarkError::InvalidActionFormat(text.clone()))?;
                Ok(Action::Controller {
                    class: captures[1].to_string(),
                    method: captures[2].to_string(),
                })
            }
            Self::Pair(class, method) => {
                if IDENTIFIER.is_match(class)
                    && IDENTIFIER.is_match(method)
                    && !method.contains("::")
                    && !method.contains('\\')
                {
                    Ok(Action::Controller {
                        class: class.clone(),
                        method: method.clone(),
                    })
                } else {
                    Err(WaymarkError::InvalidActionFormat(format!("{class}@{method}")))
                }
            }
            Self::Callback(key) => Ok(Action::Callback(key.clone())),
        }
    }
}

impl fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Pair(class, method) => write!(f, "{class}@{method}"),
            Self::Callback(key) => write!(f, "{CALLBACK_MARKER}{key}"),
        }
    }
}

impl From<&str> for ActionSpec {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ActionSpec {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<(&str, &str)> for ActionSpec {
    fn from((class, method): (&str, &str)) -> Self {
        Self::Pair(class.to_string(), method.to_string())
    }
}

impl From<(String, String)> for ActionSpec {
    fn from((class, method): (String, String)) -> Self {
        Self::Pair(class, method)
    }
}

impl From<[&str; 2]> for ActionSpec {
    fn from([class, method]: [&str; 2]) -> Self {
        Self::Pair(class.to_string(), method.to_string())
    }
}

/// An action as accepted by the registration DSL: either a storable spec or
/// a closure that the builder moves into the callback table.
#[derive(Clone)]
pub enum RouteAction {
    Spec(ActionSpec),
    Closure(Callback),
}

impl fmt::Debug for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spec(spec) => f.debug_tuple("Spec").field(spec).finish(),
            Self::Closure(_) => f.write_str("Closure(..)"),
        }
    }
}

impl From<ActionSpec> for RouteAction {
    fn from(spec: ActionSpec) -> Self {
        Self::Spec(spec)
    }
}

impl From<Callback> for RouteAction {
    fn from(callback: Callback) -> Self {
        Self::Closure(callback)
    }
}

impl From<&str> for RouteAction {
    fn from(text: &str) -> Self {
        Self::Spec(text.into())
    }
}

impl From<String> for RouteAction {
    fn from(text: String) -> Self {
        Self::Spec(text.into())
    }
}

impl From<(&str, &str)> for RouteAction {
    fn from(pair: (&str, &str)) -> Self {
        Self::Spec(pair.into())
    }
}

impl From<[&str; 2]> for RouteAction {
    fn from(pair: [&str; 2]) -> Self {
        Self::Spec(pair.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(ActionSpec::from("home.index").kind(), ActionKind::View);
        assert_eq!(ActionSpec::from("UserController@show").kind(), ActionKind::Controller);
        assert_eq!(ActionSpec::from(("UserController", "show")).kind(), ActionKind::Controller);
        assert_eq!(ActionSpec::from("callback:ping").kind(), ActionKind::Callback);
        assert_eq!(ActionSpec::Callback("closure#1".into()).kind(), ActionKind::Callback);
        assert_eq!(ActionSpec::from("bad@@format").kind(), ActionKind::Controller);
    }

    #[test]
    fn test_resolve_namespaced_controller() {
        let action = ActionSpec::from(r"App\Http\UserController@index").resolve().unwrap();
        assert_eq!(
            action,
            Action::Controller {
                class: r"App\Http\UserController".into(),
                method: "index".into()
            }
        );
    }

    #[test]
    fn test_resolve_invalid_controller_text() {
        for bad in ["@show", "User@", "User@show@again", "1User@show", "User@sh-ow"] {
            let err = ActionSpec::from(bad).resolve().unwrap_err();
            assert!(matches!(err, WaymarkError::InvalidActionFormat(_)), "{bad}");
        }
    }

    #[test]
    fn test_resolve_pair() {
        let action = ActionSpec::from(["PostController", "store"]).resolve().unwrap();
        assert_eq!(
            action,
            Action::Controller {
                class: "PostController".into(),
                method: "store".into()
            }
        );
        assert!(ActionSpec::from(("Post Controller", "store")).resolve().is_err());
        assert!(ActionSpec::from(("PostController", "")).resolve().is_err());
    }

    #[test]
    fn test_resolve_callback_marker() {
        assert_eq!(
            ActionSpec::from("callback:health").resolve().unwrap(),
            Action::Callback("health".into())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ActionSpec::from(("A", "b")).to_string(), "A@b");
        assert_eq!(ActionSpec::Callback("x".into()).to_string(), "callback:x");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(ActionSpec::from(("A", "b"))).unwrap();
        assert_eq!(json, serde_json::json!({"type": "pair", "value": ["A", "b"]}));
        let back: ActionSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, ActionSpec::Pair("A".into(), "b".into()));
    }
}
