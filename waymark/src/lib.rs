//! # waymark
//!
//! Route registration, pattern matching, middleware and dispatch for Rust
//! web applications.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `waymark` to get everything, or on individual crates
//! for finer-grained control.
//!
//! ## Quick start
//!
//! ```
//! use waymark::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> WaymarkResult<()> {
//! let mut routes = RouteBuilder::new();
//! routes
//!     .get("/users/{id}", callback(|_, params| async move {
//!         HttpResponse::ok(format!("user {}", params.get("id").unwrap_or_default()))
//!     }))?
//!     .name("users.show")?;
//!
//! let dispatcher = Dispatcher::builder()
//!     .routes(routes.finish())
//!     .settings(Settings::default())
//!     .build()?;
//!
//! let response = dispatcher.handle(HttpRequest::builder().path("/users/7").build()).await;
//! assert_eq!(response.body(), "user 7");
//! # Ok(())
//! # }
//! ```

/// Settings, logging and error types.
pub use waymark_core as core;

/// Request, response and route match types.
pub use waymark_http as http;

/// Route registration DSL, pattern matching and reverse routing.
#[cfg(feature = "routing")]
pub use waymark_routing as routing;

/// Middleware pipeline, action invocation and the dispatcher.
#[cfg(feature = "dispatch")]
pub use waymark_dispatch as dispatch;

/// Event bus used for deferred request verification.
#[cfg(feature = "signals")]
pub use waymark_signals as signals;

/// Re-exports of the third-party crates that appear in waymark's public API.
pub mod reexports {
    pub use async_trait::async_trait;
    pub use tracing;
}

/// The types most applications need, in one import.
pub mod prelude {
    pub use waymark_core::{RootMatch, Settings, WaymarkError, WaymarkResult};
    pub use waymark_http::{HttpRequest, HttpResponse, RouteMatch, RouteParams};

    #[cfg(feature = "routing")]
    pub use waymark_routing::{callback, HttpMethod, RouteBuilder, RouteRegistry, UrlGenerator};

    #[cfg(feature = "dispatch")]
    pub use waymark_dispatch::{
        Controller, ControllerRegistry, Dispatcher, Middleware, MiddlewareRegistry, StaticViews, TeraViews,
    };

    #[cfg(feature = "signals")]
    pub use waymark_signals::{EventBus, CSRF_VERIFY};

    pub use async_trait::async_trait;
}
