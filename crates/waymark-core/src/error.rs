//! Core error types for waymark.
//!
//! [`WaymarkError`] covers the three failure families of the router:
//! registration-time errors raised while the route table is being built,
//! dispatch-time errors raised while resolving an action, and reverse-routing
//! errors raised while generating URLs. A route that simply does not match is
//! not an error; the dispatcher models it as a 404 outcome.

use thiserror::Error;

/// The primary error type for waymark.
///
/// Each variant maps to an HTTP status code via [`WaymarkError::status_code`],
/// which the dispatcher uses when it has to turn an error into a response.
#[derive(Error, Debug)]
pub enum WaymarkError {
    // ── Registration ─────────────────────────────────────────────────

    /// A route was declared with a verb outside the supported set.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedHttpMethod(String),

    /// Middleware or a name was attached to a `(method, path)` pair the
    /// registry does not hold.
    #[error("Route not found: {method} {path}")]
    RouteNotFound {
        /// The HTTP method of the missing route.
        method: String,
        /// The normalized path of the missing route.
        path: String,
    },

    // ── Dispatch ─────────────────────────────────────────────────────

    /// A controller action does not have the `Class@method` shape.
    #[error("Invalid action format: {0}")]
    InvalidActionFormat(String),

    /// A callback action references an identifier with no registered callable.
    #[error("Callback not registered: {0}")]
    CallbackNotRegistered(String),

    /// A middleware reference could not be resolved to an executable unit.
    #[error("Middleware not registered: {0}")]
    MiddlewareNotRegistered(String),

    /// A view exists but failed to render.
    #[error("View render error: {0}")]
    ViewRenderError(String),

    /// A controller failed while being instantiated or invoked.
    #[error("Controller error: {0}")]
    ControllerError(String),

    // ── Reverse routing ──────────────────────────────────────────────

    /// A placeholder in a named route had no value supplied.
    #[error("Missing route parameter '{parameter}' for route '{route}'")]
    MissingRouteParameter {
        /// The route name being resolved.
        route: String,
        /// The placeholder that had no value.
        parameter: String,
    },

    /// No route was registered under the requested name.
    #[error("Named route not found: {0}")]
    NamedRouteNotFound(String),

    // ── Snapshots ────────────────────────────────────────────────────

    /// A precompiled route snapshot was produced by an incompatible format version.
    #[error("Route snapshot version mismatch: expected {expected}, found {found}")]
    SnapshotVersionMismatch {
        /// The version this build understands.
        expected: u32,
        /// The version recorded in the snapshot.
        found: u32,
    },

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The router is improperly configured.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Serialization / IO ───────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WaymarkError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `UnsupportedHttpMethod` -> 405
    /// - `RouteNotFound`, `NamedRouteNotFound` -> 404
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::UnsupportedHttpMethod(_) => 405,
            Self::RouteNotFound { .. } | Self::NamedRouteNotFound(_) => 404,
            Self::InvalidActionFormat(_)
            | Self::CallbackNotRegistered(_)
            | Self::MiddlewareNotRegistered(_)
            | Self::ViewRenderError(_)
            | Self::ControllerError(_)
            | Self::MissingRouteParameter { .. }
            | Self::SnapshotVersionMismatch { .. }
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns `true` for errors raised while the route table is being built.
    pub const fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedHttpMethod(_) | Self::RouteNotFound { .. }
        )
    }
}

/// A convenience type alias for `Result<T, WaymarkError>`.
pub type WaymarkResult<T> = Result<T, WaymarkError>;
