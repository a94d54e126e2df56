//! # waymark-dispatch
//!
//! Request dispatch for waymark: the middleware pipeline, controller
//! invocation, view rendering, 404 outcomes and the [`Dispatcher`] that
//! ties them to a route table.
//!
//! ## Modules
//!
//! - [`middleware`] - The [`Middleware`](middleware::Middleware) trait, aliases/groups and the pipeline
//! - [`invoker`] - Controllers and the [`ActionInvoker`](invoker::ActionInvoker) seam
//! - [`views`] - [`ViewRenderer`](views::ViewRenderer) with tera-backed and in-memory views
//! - [`not_found`] - The 404 taxonomy and its rendering
//! - [`dispatcher`] - The dispatch state machine

pub mod dispatcher;
pub mod invoker;
pub mod middleware;
pub mod not_found;
pub mod views;

pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use invoker::{ActionInvoker, Controller, ControllerRegistry};
pub use middleware::{Middleware, MiddlewarePipeline, MiddlewareRegistry, MiddlewareResolver, PipelineOutcome};
pub use not_found::{NotFound, NotFoundKind};
pub use views::{StaticViews, TeraViews, ViewRenderer};
