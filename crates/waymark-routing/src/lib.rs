//! # waymark-routing
//!
//! Route declaration and lookup for waymark.
//!
//! - [`method`]: the supported HTTP verbs
//! - [`pattern`]: path normalization and `{placeholder}` matching
//! - [`action`]: what a route invokes, and how an action value is classified
//! - [`callbacks`]: the table of callable actions referenced by identifier
//! - [`registry`]: the ordered route table and named-route segments
//! - [`builder`]: the registration DSL (`get`, `group`, `prefix`, `middleware`, `name`)
//! - [`reverse`]: URL generation from named routes
//! - [`snapshot`]: precompiled route tables
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//! use waymark_routing::builder::RouteBuilder;
//! use waymark_routing::method::HttpMethod;
//! use waymark_routing::reverse::route_path;
//!
//! let mut routes = RouteBuilder::new();
//! routes.get("/users/{id}", "UserController@show").unwrap().name("users.show").unwrap();
//! let registry = routes.finish();
//!
//! // Forward resolution
//! let (entry, params) = registry.find(HttpMethod::Get, "/users/5").unwrap();
//! assert_eq!(entry.path, "/users/{id}");
//! assert_eq!(params.get("id"), Some("5"));
//!
//! // Reverse resolution
//! let mut params = HashMap::new();
//! params.insert("id", "5");
//! assert_eq!(route_path(&registry, "users.show", &params).unwrap(), "/users/5");
//! ```

pub mod action;
pub mod builder;
pub mod callbacks;
pub mod method;
pub mod pattern;
pub mod registry;
pub mod reverse;
pub mod snapshot;

pub use action::{Action, ActionKind, ActionSpec, RouteAction};
pub use builder::{GroupHandle, RouteBuilder, RouteDefinition};
pub use callbacks::{callback, Callback, CallbackTable};
pub use method::HttpMethod;
pub use registry::{RegistryMarker, RouteEntry, RouteRegistry, Segment};
pub use reverse::UrlGenerator;
pub use snapshot::RouteSnapshot;
