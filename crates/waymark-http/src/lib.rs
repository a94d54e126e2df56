//! # waymark-http
//!
//! Request and response values consumed by the waymark router and
//! dispatcher, plus the request-scoped [`RouteMatch`] the dispatcher
//! publishes once a route has been matched.

pub mod request;
pub mod response;
pub mod route_match;

use std::future::Future;
use std::pin::Pin;

pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::HttpResponse;
pub use route_match::{RouteMatch, RouteParams};

/// A boxed, sendable future resolving to an [`HttpResponse`].
pub type BoxFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;
