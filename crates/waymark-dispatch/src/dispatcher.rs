//! The request dispatcher.
//!
//! One [`Dispatcher::dispatch`] call takes a request through these steps:
//!
//! 1. global middleware (a short-circuit responds immediately)
//! 2. the CSRF hook: every deferred `csrf.verify` listener is asked, and
//!    the first `403` response any of them returns is sent back
//! 3. route matching against the request method's bucket; the match is
//!    published on the request
//! 4. the matched route's middleware
//! 5. the action: render a view, call a controller method, or run a callback
//!
//! Anything missing along the way (route, view, controller class, controller
//! method) ends in a 404 rendered from the configured view.

use std::sync::Arc;

use http::StatusCode;
use tracing::Instrument;

use waymark_core::logging::dispatch_span;
use waymark_core::{Settings, WaymarkError, WaymarkResult, SETTINGS};
use waymark_http::{HttpRequest, HttpResponse, RouteMatch, RouteParams};
use waymark_routing::{Action, ActionSpec, Callback, HttpMethod, RouteRegistry, UrlGenerator};
use waymark_signals::{EventBus, CSRF_VERIFY};

use crate::invoker::{ActionInvoker, ControllerRegistry};
use crate::middleware::{MiddlewarePipeline, MiddlewareRegistry, MiddlewareResolver, PipelineOutcome};
use crate::not_found::{NotFound, NotFoundKind};
use crate::views::{StaticViews, ViewRenderer};

/// Dispatches requests against a finished route table.
///
/// The dispatcher holds no per-request state and can be shared across
/// tasks behind an `Arc`.
pub struct Dispatcher {
    routes: Arc<RouteRegistry>,
    pipeline: MiddlewarePipeline,
    invoker: Arc<dyn ActionInvoker>,
    views: Arc<dyn ViewRenderer>,
    events: Option<Arc<EventBus<HttpRequest>>>,
    settings: Settings,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("pipeline", &self.pipeline)
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub const fn routes(&self) -> &Arc<RouteRegistry> {
        &self.routes
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns a URL generator over this dispatcher's routes and base URL.
    pub fn url_generator(&self) -> UrlGenerator {
        UrlGenerator::new(Arc::clone(&self.routes), self.settings.base_url.clone())
    }

    /// Dispatches a request.
    ///
    /// # Errors
    ///
    /// Returns an error if a middleware reference cannot be resolved, a
    /// controller action is malformed, a callback is not registered, or an
    /// action fails. Missing routes, views and controllers are not errors;
    /// they produce a 404 response.
    pub async fn dispatch(&self, request: HttpRequest) -> WaymarkResult<HttpResponse> {
        let span = dispatch_span(request.method().as_str(), request.path());
        self.run(request).instrument(span).await
    }

    /// Dispatches a request, turning any error into a `500` response.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Dispatch failed");
                let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let body = if self.settings.debug {
                    e.to_string()
                } else {
                    status.canonical_reason().unwrap_or("Internal Server Error").to_string()
                };
                let mut response = HttpResponse::new(status, body);
                response.set_content_type("text/plain; charset=utf-8");
                response
            }
        }
    }

    /// Dispatches an `http::Request`, for use behind any server that speaks
    /// the `http` crate types.
    pub async fn handle_http(&self, request: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        self.handle(HttpRequest::from_http(request)).await.into_http()
    }

    async fn run(&self, mut request: HttpRequest) -> WaymarkResult<HttpResponse> {
        let mut working = HttpResponse::default();

        if let PipelineOutcome::ShortCircuit(response) = self.pipeline.run_global(&mut request, &mut working).await? {
            return Ok(response);
        }

        if let Some(rejection) = self.csrf_rejection(&request) {
            return Ok(rejection);
        }

        let matched = HttpMethod::try_from(request.method())
            .ok()
            .and_then(|method| self.routes.find(method, request.path()));
        let Some((entry, params)) = matched else {
            return self.no_match(request, &working).await;
        };
        tracing::debug!(pattern = %entry.path, name = ?entry.name, "Route matched");
        request.set_route_match(RouteMatch {
            pattern: entry.path.clone(),
            name: entry.name.clone(),
            params: params.clone(),
        });

        if let PipelineOutcome::ShortCircuit(response) =
            self.pipeline.run(&mut request, &mut working, &entry.middleware).await?
        {
            return Ok(response);
        }

        let mut response = self.invoke(&entry.action, request, params).await?;
        response.inherit_headers(working.headers());
        Ok(response)
    }

    fn csrf_rejection(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let events = self.events.as_ref()?;
        for group in events.emit_deferred(CSRF_VERIFY, request) {
            for result in group.into_iter().flatten() {
                if let Ok(response) = result.downcast::<HttpResponse>() {
                    if response.status() == StatusCode::FORBIDDEN {
                        tracing::warn!(path = %request.path(), "Request rejected by CSRF verification");
                        return Some(*response);
                    }
                }
            }
        }
        None
    }

    async fn no_match(&self, request: HttpRequest, working: &HttpResponse) -> WaymarkResult<HttpResponse> {
        if self.settings.use_fallback {
            if let Some(fallback) = self.routes.fallback() {
                tracing::debug!(path = %request.path(), "No route matched; using fallback");
                let mut response = self.invoke(fallback, request, RouteParams::new()).await?;
                response.inherit_headers(working.headers());
                return Ok(response);
            }
        }
        Ok(self.not_found(NotFoundKind::Url, request.full_url()))
    }

    async fn invoke(&self, spec: &ActionSpec, request: HttpRequest, params: RouteParams) -> WaymarkResult<HttpResponse> {
        match spec.resolve()? {
            Action::View(view) => {
                if !self.views.exists(&view) {
                    return Ok(self.not_found(NotFoundKind::View, view));
                }
                let body = self.views.render(&view, &params.to_json())?;
                Ok(HttpResponse::ok(body))
            }
            Action::Controller { class, method } => {
                if !self.invoker.class_exists(&class) {
                    return Ok(self.not_found(NotFoundKind::Controller, class));
                }
                if !self.invoker.method_exists(&class, &method) {
                    return Ok(self.not_found(NotFoundKind::Method, format!("{class}::{method}")));
                }
                let mut controller = self.invoker.instantiate(&class)?;
                controller.init(&request).await?;
                controller.call(&method, request, params).await
            }
            Action::Callback(key) => {
                let callable = self
                    .routes
                    .callbacks()
                    .get(&key)
                    .ok_or(WaymarkError::CallbackNotRegistered(key))?;
                Ok(callable(request, params).await)
            }
        }
    }

    fn not_found(&self, kind: NotFoundKind, resource: impl Into<String>) -> HttpResponse {
        let outcome = NotFound::new(kind, resource);
        tracing::debug!(kind = %outcome.kind, resource = %outcome.resource, "Not found");
        outcome.render(self.views.as_ref(), &self.settings)
    }
}

/// Assembles a [`Dispatcher`].
///
/// # Examples
///
/// ```
/// use waymark_dispatch::Dispatcher;
/// use waymark_dispatch::views::StaticViews;
/// use waymark_http::HttpRequest;
/// use waymark_routing::RouteBuilder;
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut routes = RouteBuilder::new();
/// routes.get("/", "home.index").unwrap();
///
/// let mut views = StaticViews::new();
/// views.insert("home.index", "Welcome");
///
/// let dispatcher = Dispatcher::builder()
///     .routes(routes.finish())
///     .views(views)
///     .build()
///     .unwrap();
///
/// let response = dispatcher.handle(HttpRequest::builder().path("/").build()).await;
/// assert_eq!(response.body(), "Welcome");
/// # }
/// ```
#[derive(Default)]
pub struct DispatcherBuilder {
    routes: Option<RouteRegistry>,
    middleware: Option<Arc<dyn MiddlewareResolver>>,
    invoker: Option<Arc<dyn ActionInvoker>>,
    views: Option<Arc<dyn ViewRenderer>>,
    events: Option<Arc<EventBus<HttpRequest>>>,
    settings: Option<Settings>,
    callbacks: Vec<(String, Callback)>,
}

impl DispatcherBuilder {
    /// Sets the route table. Without one, the table is loaded from the
    /// settings' `route_cache`, or left empty.
    #[must_use]
    pub fn routes(mut self, routes: RouteRegistry) -> Self {
        self.routes = Some(routes);
        self
    }

    #[must_use]
    pub fn middleware(mut self, resolver: impl MiddlewareResolver + 'static) -> Self {
        self.middleware = Some(Arc::new(resolver));
        self
    }

    #[must_use]
    pub fn invoker(mut self, invoker: impl ActionInvoker + 'static) -> Self {
        self.invoker = Some(Arc::new(invoker));
        self
    }

    #[must_use]
    pub fn views(mut self, views: impl ViewRenderer + 'static) -> Self {
        self.views = Some(Arc::new(views));
        self
    }

    /// Sets the event bus consulted for `csrf.verify`.
    #[must_use]
    pub fn events(mut self, events: Arc<EventBus<HttpRequest>>) -> Self {
        self.events = Some(events);
        self
    }

    /// Sets the settings. Defaults to the global settings if configured.
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Registers a named callback on the route table when it is built.
    /// Needed for `callback:` actions in a table loaded from a snapshot.
    #[must_use]
    pub fn callback(mut self, name: &str, callable: Callback) -> Self {
        self.callbacks.push((name.to_string(), callable));
        self
    }

    /// Builds the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the route cache named in the settings cannot be loaded.
    pub fn build(self) -> WaymarkResult<Dispatcher> {
        let settings = self
            .settings
            .unwrap_or_else(|| SETTINGS.try_get().cloned().unwrap_or_default());

        let mut routes = match (self.routes, &settings.route_cache) {
            (Some(routes), _) => routes,
            (None, Some(path)) => RouteRegistry::load_cached(path)?,
            (None, None) => {
                tracing::warn!("Dispatcher built without any routes");
                RouteRegistry::new()
            }
        };
        routes.set_root_match(settings.root_match);
        for (name, callable) in self.callbacks {
            routes.callbacks_mut().register(name, callable);
        }

        let resolver = self
            .middleware
            .unwrap_or_else(|| Arc::new(MiddlewareRegistry::new()));
        let pipeline = MiddlewarePipeline::new(resolver).with_global(settings.global_middleware.clone());

        Ok(Dispatcher {
            routes: Arc::new(routes),
            pipeline,
            invoker: self
                .invoker
                .unwrap_or_else(|| Arc::new(ControllerRegistry::new())),
            views: self.views.unwrap_or_else(|| Arc::new(StaticViews::new())),
            events: self.events,
            settings,
        })
    }
}
