//! The route registration DSL.
//!
//! [`RouteBuilder`] owns the registry while routes are being declared and
//! tracks the active group context: the path prefix, the middleware every
//! route in the group receives, and the pending `middleware`/`name`/`prefix`
//! values set by builder-level calls. Pending values apply to the next
//! route or group and are then cleared.
//!
//! # Examples
//!
//! ```
//! use waymark_routing::{HttpMethod, RouteBuilder};
//!
//! let mut routes = RouteBuilder::new();
//! routes
//!     .prefix("api")
//!     .middleware(["auth"])
//!     .group(|r| {
//!         r.prefix("v1").group(|r| {
//!             r.get("ping", "PingController@show")?;
//!             Ok(())
//!         })?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let registry = routes.finish();
//! let (entry, _) = registry.find(HttpMethod::Get, "/api/v1/ping").unwrap();
//! assert_eq!(entry.middleware, vec!["auth"]);
//! ```

use http::StatusCode;

use waymark_core::{WaymarkError, WaymarkResult};
use waymark_http::HttpResponse;

use crate::action::{ActionSpec, RouteAction};
use crate::callbacks::{callback, Callback};
use crate::method::HttpMethod;
use crate::pattern;
use crate::registry::{RouteEntry, RouteRegistry};

fn merge_unique<I, S>(target: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for item in items {
        let item = item.into();
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

/// The active group context of a [`RouteBuilder`].
#[derive(Debug, Clone)]
pub struct BuilderContext {
    prefix: String,
    group_middleware: Vec<String>,
    pending_middleware: Vec<String>,
    pending_prefix: Option<String>,
    pending_name: Option<String>,
    depth: usize,
}

impl Default for BuilderContext {
    fn default() -> Self {
        Self {
            prefix: "/".to_string(),
            group_middleware: Vec::new(),
            pending_middleware: Vec::new(),
            pending_prefix: None,
            pending_name: None,
            depth: 0,
        }
    }
}

struct GroupFrame {
    prefix: String,
    group_middleware: Vec<String>,
}

impl BuilderContext {
    /// The prefix applied to routes declared at this level.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The middleware every route declared at this level receives.
    pub fn group_middleware(&self) -> &[String] {
        &self.group_middleware
    }

    /// Middleware set by a builder-level `middleware()` call and not yet consumed.
    pub fn pending_middleware(&self) -> &[String] {
        &self.pending_middleware
    }

    /// A name set by a builder-level `name()` call and not yet consumed.
    pub fn pending_name(&self) -> Option<&str> {
        self.pending_name.as_deref()
    }

    pub const fn is_inside_group(&self) -> bool {
        self.depth > 0
    }

    fn take_prefix(&mut self) -> String {
        match self.pending_prefix.take() {
            Some(pending) => pattern::join(&self.prefix, &pending),
            None => self.prefix.clone(),
        }
    }

    fn enter_group(&mut self) -> GroupFrame {
        let frame = GroupFrame {
            prefix: self.prefix.clone(),
            group_middleware: self.group_middleware.clone(),
        };
        self.prefix = self.take_prefix();
        let pending = std::mem::take(&mut self.pending_middleware);
        merge_unique(&mut self.group_middleware, pending);
        if let Some(name) = self.pending_name.take() {
            tracing::warn!(name, "Route name set before a group is ignored");
        }
        self.depth += 1;
        frame
    }

    fn exit_group(&mut self, frame: GroupFrame) {
        self.prefix = frame.prefix;
        self.group_middleware = frame.group_middleware;
        self.pending_middleware.clear();
        self.pending_prefix = None;
        self.pending_name = None;
        self.depth -= 1;
    }

    /// Consumes the pending state for one route: returns the effective path,
    /// the initial middleware list and the pending name.
    fn take_route(&mut self, route_pattern: &str) -> (String, Vec<String>, Option<String>) {
        let path = pattern::join(&self.take_prefix(), route_pattern);
        let mut middleware = self.group_middleware.clone();
        merge_unique(&mut middleware, std::mem::take(&mut self.pending_middleware));
        (path, middleware, self.pending_name.take())
    }
}

/// Declares routes into a [`RouteRegistry`].
#[derive(Debug, Default)]
pub struct RouteBuilder {
    registry: RouteRegistry,
    context: BuilderContext,
}

impl RouteBuilder {
    /// Creates a builder over an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder that adds to an existing registry.
    pub fn with_registry(registry: RouteRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub const fn context(&self) -> &BuilderContext {
        &self.context
    }

    pub const fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RouteRegistry {
        &mut self.registry
    }

    /// Returns the finished registry.
    pub fn finish(self) -> RouteRegistry {
        if !self.context.pending_middleware.is_empty() || self.context.pending_name.is_some() {
            tracing::warn!(
                middleware = ?self.context.pending_middleware,
                name = ?self.context.pending_name,
                "Pending route settings were never applied"
            );
        }
        self.registry
    }

    fn store_action(&mut self, action: RouteAction) -> ActionSpec {
        match action {
            RouteAction::Spec(spec) => spec,
            RouteAction::Closure(cb) => {
                ActionSpec::Callback(self.registry.callbacks_mut().register_anonymous(cb))
            }
        }
    }

    /// Registers `action` at `route_pattern` for every method in `methods`.
    ///
    /// The active prefix is prepended, and the route starts out with the
    /// group middleware plus any pending middleware. A pending name is
    /// attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn add(
        &mut self,
        methods: Vec<HttpMethod>,
        route_pattern: &str,
        action: impl Into<RouteAction>,
    ) -> WaymarkResult<RouteDefinition<'_>> {
        if methods.is_empty() {
            return Err(WaymarkError::ImproperlyConfigured(format!(
                "Route '{route_pattern}' was declared without any method"
            )));
        }
        let action = self.store_action(action.into());
        let (path, middleware, name) = self.context.take_route(route_pattern);

        let mut entry = RouteEntry::new(methods.clone(), &path, action);
        entry.add_middleware(middleware);
        entry.name.clone_from(&name);
        tracing::trace!(methods = ?methods, path = %path, "Registering route");
        self.registry.register(entry)?;

        Ok(RouteDefinition {
            registry: &mut self.registry,
            methods,
            path,
        })
    }

    /// Registers a `GET` route.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn get(&mut self, route_pattern: &str, action: impl Into<RouteAction>) -> WaymarkResult<RouteDefinition<'_>> {
        self.add(vec![HttpMethod::Get], route_pattern, action)
    }

    /// Registers a `POST` route.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn post(&mut self, route_pattern: &str, action: impl Into<RouteAction>) -> WaymarkResult<RouteDefinition<'_>> {
        self.add(vec![HttpMethod::Post], route_pattern, action)
    }

    /// Registers a `PUT` route.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn put(&mut self, route_pattern: &str, action: impl Into<RouteAction>) -> WaymarkResult<RouteDefinition<'_>> {
        self.add(vec![HttpMethod::Put], route_pattern, action)
    }

    /// Registers a `PATCH` route.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn patch(&mut self, route_pattern: &str, action: impl Into<RouteAction>) -> WaymarkResult<RouteDefinition<'_>> {
        self.add(vec![HttpMethod::Patch], route_pattern, action)
    }

    /// Registers a `DELETE` route.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn delete(&mut self, route_pattern: &str, action: impl Into<RouteAction>) -> WaymarkResult<RouteDefinition<'_>> {
        self.add(vec![HttpMethod::Delete], route_pattern, action)
    }

    /// Registers a `HEAD` route.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn head(&mut self, route_pattern: &str, action: impl Into<RouteAction>) -> WaymarkResult<RouteDefinition<'_>> {
        self.add(vec![HttpMethod::Head], route_pattern, action)
    }

    /// Registers an `OPTIONS` route.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn options(&mut self, route_pattern: &str, action: impl Into<RouteAction>) -> WaymarkResult<RouteDefinition<'_>> {
        self.add(vec![HttpMethod::Options], route_pattern, action)
    }

    /// Registers a route under every supported method.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn any(&mut self, route_pattern: &str, action: impl Into<RouteAction>) -> WaymarkResult<RouteDefinition<'_>> {
        self.add(HttpMethod::ALL.to_vec(), route_pattern, action)
    }

    /// Registers a route under the named methods. `any` expands to all of them.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::UnsupportedHttpMethod`] for an unknown verb.
    ///
    /// ```
    /// use waymark_routing::{HttpMethod, RouteBuilder};
    ///
    /// let mut routes = RouteBuilder::new();
    /// routes.match_methods(&["get", "post"], "/form", "FormController@handle").unwrap();
    /// assert!(routes.match_methods(&["brew"], "/coffee", "pot").is_err());
    /// ```
    pub fn match_methods(
        &mut self,
        methods: &[&str],
        route_pattern: &str,
        action: impl Into<RouteAction>,
    ) -> WaymarkResult<RouteDefinition<'_>> {
        let methods = HttpMethod::parse_list(methods)?;
        self.add(methods, route_pattern, action)
    }

    /// Registers a `GET` route that renders a view.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn view(&mut self, route_pattern: &str, view: &str) -> WaymarkResult<RouteDefinition<'_>> {
        self.get(route_pattern, ActionSpec::Text(view.to_string()))
    }

    /// Registers a route on every method that redirects to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn redirect(&mut self, from: &str, to: &str, status: StatusCode) -> WaymarkResult<RouteDefinition<'_>> {
        let to = to.to_string();
        let cb = callback(move |_request, _params| {
            let to = to.clone();
            async move { HttpResponse::redirect(&to, status) }
        });
        self.any(from, cb)
    }

    /// Sets middleware for the next route or group.
    pub fn middleware<I, S>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        merge_unique(&mut self.context.pending_middleware, middleware);
        self
    }

    /// Sets a name for the next route.
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.context.pending_name = Some(name.to_string());
        self
    }

    /// Sets a path prefix for the next route or group.
    pub fn prefix(&mut self, segment: &str) -> &mut Self {
        let joined = match self.context.pending_prefix.take() {
            Some(existing) => pattern::join(&existing, segment),
            None => pattern::normalize(segment),
        };
        self.context.pending_prefix = Some(joined);
        self
    }

    /// Runs `routes` inside a new group.
    ///
    /// The group's prefix is the enclosing prefix plus any pending prefix;
    /// its middleware is the enclosing group middleware plus any pending
    /// middleware. The enclosing context is restored afterwards, even if
    /// `routes` fails. The returned handle can attach more middleware to
    /// every route the group declared.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `routes`.
    pub fn group<F>(&mut self, routes: F) -> WaymarkResult<GroupHandle<'_>>
    where
        F: FnOnce(&mut Self) -> WaymarkResult<()>,
    {
        let frame = self.context.enter_group();
        let marker = self.registry.marker();
        let result = routes(self);
        self.context.exit_group(frame);
        result?;

        let routes = self.registry.added_since(&marker);
        Ok(GroupHandle {
            registry: &mut self.registry,
            routes,
        })
    }

    /// Sets the action used when no route matches.
    pub fn fallback(&mut self, action: impl Into<RouteAction>) -> &mut Self {
        let action = self.store_action(action.into());
        self.registry.set_fallback(action);
        self
    }

    /// Registers a named callback, referenced by `callback:<name>` actions.
    pub fn register_callback(&mut self, name: &str, cb: Callback) -> &mut Self {
        self.registry.callbacks_mut().register(name, cb);
        self
    }
}

/// A freshly registered route, for chaining `name` and `middleware`.
#[derive(Debug)]
pub struct RouteDefinition<'a> {
    registry: &'a mut RouteRegistry,
    methods: Vec<HttpMethod>,
    path: String,
}

impl RouteDefinition<'_> {
    /// Names the route.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::RouteNotFound`] if the route is gone.
    pub fn name(self, name: &str) -> WaymarkResult<Self> {
        self.registry.attach_name(&self.methods, &self.path, name)?;
        Ok(self)
    }

    /// Appends middleware to the route.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::RouteNotFound`] if the route is gone.
    pub fn middleware<I, S>(self, middleware: I) -> WaymarkResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let middleware: Vec<String> = middleware.into_iter().map(Into::into).collect();
        self.registry
            .attach_middleware(&self.methods, &self.path, &middleware)?;
        Ok(self)
    }

    /// The effective, prefixed path of the route.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }
}

/// The routes declared by one [`RouteBuilder::group`] call.
#[derive(Debug)]
pub struct GroupHandle<'a> {
    registry: &'a mut RouteRegistry,
    routes: Vec<(HttpMethod, String)>,
}

impl GroupHandle<'_> {
    /// Appends middleware to every route the group declared.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::RouteNotFound`] if a route is gone.
    pub fn middleware<I, S>(self, middleware: I) -> WaymarkResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let middleware: Vec<String> = middleware.into_iter().map(Into::into).collect();
        for (method, path) in &self.routes {
            self.registry
                .attach_middleware(&[*method], path, &middleware)?;
        }
        Ok(self)
    }

    /// The `(method, path)` pairs the group appended, bucket by bucket.
    pub fn routes(&self) -> &[(HttpMethod, String)] {
        &self.routes
    }
}
