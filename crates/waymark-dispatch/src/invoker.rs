//! Controller actions.
//!
//! A `Class@method` route names a controller class and one of its methods.
//! The dispatcher asks an [`ActionInvoker`] whether both exist, has it build
//! a fresh [`Controller`] per request, runs the controller's `init` hook and
//! then calls the method with the route captures.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use waymark_core::{WaymarkError, WaymarkResult};
use waymark_http::{HttpRequest, HttpResponse, RouteParams};

/// A controller instance.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use waymark_core::{WaymarkError, WaymarkResult};
/// use waymark_dispatch::invoker::Controller;
/// use waymark_http::{HttpRequest, HttpResponse, RouteParams};
///
/// struct UserController;
///
/// #[async_trait]
/// impl Controller for UserController {
///     async fn call(
///         &self,
///         method: &str,
///         _request: HttpRequest,
///         params: RouteParams,
///     ) -> WaymarkResult<HttpResponse> {
///         match method {
///             "show" => Ok(HttpResponse::ok(format!("user {}", params.get("id").unwrap_or("?")))),
///             other => Err(WaymarkError::ControllerError(format!("no method {other}"))),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Controller: Send + Sync {
    /// Runs once per request before the action method.
    async fn init(&mut self, _request: &HttpRequest) -> WaymarkResult<()> {
        Ok(())
    }

    /// Invokes the action method named `method` with the route captures.
    async fn call(&self, method: &str, request: HttpRequest, params: RouteParams) -> WaymarkResult<HttpResponse>;
}

/// Builds and inspects controllers by class name.
pub trait ActionInvoker: Send + Sync {
    fn class_exists(&self, class: &str) -> bool;

    fn method_exists(&self, class: &str, method: &str) -> bool;

    /// Creates a new controller instance.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::ControllerError`] if the class is unknown or
    /// cannot be built.
    fn instantiate(&self, class: &str) -> WaymarkResult<Box<dyn Controller>>;
}

type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

struct ControllerClass {
    methods: Vec<String>,
    factory: ControllerFactory,
}

/// The built-in [`ActionInvoker`]: controller classes registered with their
/// public methods and a factory.
///
/// ```
/// # use async_trait::async_trait;
/// # use waymark_core::WaymarkResult;
/// # use waymark_dispatch::invoker::Controller;
/// # use waymark_http::{HttpRequest, HttpResponse, RouteParams};
/// # struct UserController;
/// # #[async_trait]
/// # impl Controller for UserController {
/// #     async fn call(&self, _: &str, _: HttpRequest, _: RouteParams) -> WaymarkResult<HttpResponse> {
/// #         Ok(HttpResponse::ok(""))
/// #     }
/// # }
/// use waymark_dispatch::invoker::{ActionInvoker, ControllerRegistry};
///
/// let mut controllers = ControllerRegistry::new();
/// controllers.register("UserController", &["index", "show"], || UserController);
///
/// assert!(controllers.class_exists("UserController"));
/// assert!(controllers.method_exists("UserController", "show"));
/// assert!(!controllers.method_exists("UserController", "destroy"));
/// ```
#[derive(Default)]
pub struct ControllerRegistry {
    classes: HashMap<String, ControllerClass>,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (class, spec) in &self.classes {
            map.entry(class, &spec.methods);
        }
        map.finish()
    }
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller class, its callable methods and a factory.
    pub fn register<C, F>(&mut self, class: &str, methods: &[&str], factory: F) -> &mut Self
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.classes.insert(
            class.to_string(),
            ControllerClass {
                methods: methods.iter().map(ToString::to_string).collect(),
                factory: Arc::new(move || Box::new(factory()) as Box<dyn Controller>),
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ActionInvoker for ControllerRegistry {
    fn class_exists(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    fn method_exists(&self, class: &str, method: &str) -> bool {
        self.classes
            .get(class)
            .is_some_and(|c| c.methods.iter().any(|m| m == method))
    }

    fn instantiate(&self, class: &str) -> WaymarkResult<Box<dyn Controller>> {
        self.classes
            .get(class)
            .map(|c| (c.factory)())
            .ok_or_else(|| WaymarkError::ControllerError(format!("Unknown controller class: {class}")))
    }
}
