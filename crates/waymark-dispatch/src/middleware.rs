//! Middleware for waymark.
//!
//! A [`Middleware`] unit sees the request and the working response before
//! the action runs. It can modify either one and let the request continue,
//! or return a response of its own, which short-circuits everything after
//! it: later units, route middleware and the action.
//!
//! Routes refer to middleware by name. A [`MiddlewareResolver`] turns a name
//! into the units to run; [`MiddlewareRegistry`] is the built-in resolver,
//! with aliases and named groups of aliases.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use waymark_core::{WaymarkError, WaymarkResult};
use waymark_http::{HttpRequest, HttpResponse};

/// A middleware unit.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use waymark_dispatch::middleware::Middleware;
/// use waymark_http::{HttpRequest, HttpResponse};
///
/// struct RequireToken;
///
/// #[async_trait]
/// impl Middleware for RequireToken {
///     async fn handle(
///         &self,
///         request: &mut HttpRequest,
///         _response: &mut HttpResponse,
///     ) -> Option<HttpResponse> {
///         if request.header("x-token").is_some() {
///             None
///         } else {
///             Some(HttpResponse::forbidden("missing token"))
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Processes the request.
    ///
    /// Return `Some(response)` to short-circuit the dispatch with that
    /// response, or `None` to continue.
    async fn handle(&self, request: &mut HttpRequest, response: &mut HttpResponse) -> Option<HttpResponse>;
}

/// Turns a middleware reference into executable units.
pub trait MiddlewareResolver: Send + Sync {
    /// Resolves `reference` into the units it stands for, in run order.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::MiddlewareNotRegistered`] for an unknown reference.
    fn resolve(&self, reference: &str) -> WaymarkResult<Vec<Arc<dyn Middleware>>>;
}

/// Middleware aliases and groups.
///
/// ```
/// use async_trait::async_trait;
/// use waymark_dispatch::middleware::{Middleware, MiddlewareRegistry, MiddlewareResolver};
/// use waymark_http::{HttpRequest, HttpResponse};
///
/// struct Noop;
///
/// #[async_trait]
/// impl Middleware for Noop {
///     async fn handle(&self, _: &mut HttpRequest, _: &mut HttpResponse) -> Option<HttpResponse> {
///         None
///     }
/// }
///
/// let mut registry = MiddlewareRegistry::new();
/// registry.register("auth", Noop).register("log", Noop).group("web", ["log", "auth"]);
/// assert_eq!(registry.resolve("web").unwrap().len(), 2);
/// assert!(registry.resolve("missing").is_err());
/// ```
#[derive(Default)]
pub struct MiddlewareRegistry {
    aliases: HashMap<String, Arc<dyn Middleware>>,
    groups: HashMap<String, Vec<String>>,
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut aliases: Vec<&String> = self.aliases.keys().collect();
        aliases.sort();
        f.debug_struct("MiddlewareRegistry")
            .field("aliases", &aliases)
            .field("groups", &self.groups)
            .finish()
    }
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit under an alias, replacing any earlier one.
    pub fn register(&mut self, alias: &str, middleware: impl Middleware + 'static) -> &mut Self {
        self.register_shared(alias, Arc::new(middleware))
    }

    /// Registers an already shared unit under an alias.
    pub fn register_shared(&mut self, alias: &str, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.aliases.insert(alias.to_string(), middleware);
        self
    }

    /// Defines a group: resolving `name` resolves each member in order.
    /// Members may be aliases or other groups.
    pub fn group<I, S>(&mut self, name: &str, members: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .insert(name.to_string(), members.into_iter().map(Into::into).collect());
        self
    }

    /// Returns `true` if `reference` is a known alias or group.
    pub fn contains(&self, reference: &str) -> bool {
        self.aliases.contains_key(reference) || self.groups.contains_key(reference)
    }

    fn expand(
        &self,
        reference: &str,
        stack: &mut Vec<String>,
        out: &mut Vec<Arc<dyn Middleware>>,
    ) -> WaymarkResult<()> {
        if let Some(unit) = self.aliases.get(reference) {
            out.push(Arc::clone(unit));
            return Ok(());
        }
        let Some(members) = self.groups.get(reference) else {
            return Err(WaymarkError::MiddlewareNotRegistered(reference.to_string()));
        };
        if stack.iter().any(|s| s == reference) {
            return Err(WaymarkError::ImproperlyConfigured(format!(
                "Middleware group '{reference}' includes itself"
            )));
        }
        stack.push(reference.to_string());
        for member in members {
            self.expand(member, stack, out)?;
        }
        stack.pop();
        Ok(())
    }
}

impl MiddlewareResolver for MiddlewareRegistry {
    fn resolve(&self, reference: &str) -> WaymarkResult<Vec<Arc<dyn Middleware>>> {
        let mut units = Vec::new();
        self.expand(reference, &mut Vec::new(), &mut units)?;
        Ok(units)
    }
}

/// What a pipeline run decided.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Every unit let the request through.
    Continue,
    /// A unit returned this response; nothing after it ran.
    ShortCircuit(HttpResponse),
}

/// Runs middleware lists against a request and its working response.
///
/// References are resolved one at a time as the run reaches them, so an
/// unknown reference after a short-circuit is never looked up.
pub struct MiddlewarePipeline {
    resolver: Arc<dyn MiddlewareResolver>,
    global: Vec<String>,
}

impl fmt::Debug for MiddlewarePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewarePipeline")
            .field("global", &self.global)
            .finish_non_exhaustive()
    }
}

impl Default for MiddlewarePipeline {
    fn default() -> Self {
        Self::new(Arc::new(MiddlewareRegistry::new()))
    }
}

impl MiddlewarePipeline {
    /// Creates a pipeline with no global middleware.
    pub fn new(resolver: Arc<dyn MiddlewareResolver>) -> Self {
        Self {
            resolver,
            global: Vec::new(),
        }
    }

    /// Sets the references run before route matching.
    #[must_use]
    pub fn with_global<I, S>(mut self, global: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global = global.into_iter().map(Into::into).collect();
        self
    }

    pub fn global(&self) -> &[String] {
        &self.global
    }

    /// Runs the global middleware.
    ///
    /// # Errors
    ///
    /// Returns an error if a reference cannot be resolved.
    pub async fn run_global(
        &self,
        request: &mut HttpRequest,
        response: &mut HttpResponse,
    ) -> WaymarkResult<PipelineOutcome> {
        self.run(request, response, &self.global).await
    }

    /// Runs `middleware` in order, stopping at the first short-circuit.
    ///
    /// # Errors
    ///
    /// Returns an error if a reference cannot be resolved.
    pub async fn run(
        &self,
        request: &mut HttpRequest,
        response: &mut HttpResponse,
        middleware: &[String],
    ) -> WaymarkResult<PipelineOutcome> {
        for reference in middleware {
            for unit in self.resolver.resolve(reference)? {
                if let Some(replacement) = unit.handle(request, response).await {
                    tracing::debug!(
                        middleware = %reference,
                        status = replacement.status().as_u16(),
                        "Middleware short-circuited the request"
                    );
                    return Ok(PipelineOutcome::ShortCircuit(replacement));
                }
            }
        }
        Ok(PipelineOutcome::Continue)
    }
}
