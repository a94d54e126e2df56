//! 404 outcomes.
//!
//! A request the dispatcher cannot serve ends as a not-found outcome tagged
//! with what was missing. The outcome renders the environment's 404 view
//! (`not_found_view`, or `debug_not_found_view` in debug mode) with the
//! kind and resource as data, falling back to a plain-text body when the
//! view does not exist.

use std::fmt;

use http::StatusCode;

use waymark_core::Settings;
use waymark_http::HttpResponse;

use crate::views::ViewRenderer;

/// What a not-found outcome could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotFoundKind {
    /// No route matched the request URL.
    Url,
    /// The route's view does not exist.
    View,
    /// The route's controller class does not exist.
    Controller,
    /// The controller exists but lacks the method.
    Method,
}

impl NotFoundKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::View => "view",
            Self::Controller => "controller",
            Self::Method => "method",
        }
    }
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A not-found outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub kind: NotFoundKind,
    /// The missing URL, view id, class, or `class::method`.
    pub resource: String,
}

impl NotFound {
    pub fn new(kind: NotFoundKind, resource: impl Into<String>) -> Self {
        Self {
            kind,
            resource: resource.into(),
        }
    }

    /// Renders the 404 response.
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_core::Settings;
    /// use waymark_dispatch::not_found::{NotFound, NotFoundKind};
    /// use waymark_dispatch::views::StaticViews;
    ///
    /// let mut views = StaticViews::new();
    /// views.insert("errors.404-debug", "missing {{ kind }}: {{ resource }}");
    ///
    /// let response = NotFound::new(NotFoundKind::View, "home.index")
    ///     .render(&views, &Settings::default());
    /// assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    /// assert_eq!(response.body(), "missing view: home.index");
    /// ```
    pub fn render(&self, views: &dyn ViewRenderer, settings: &Settings) -> HttpResponse {
        let view = settings.active_not_found_view();
        let data = serde_json::json!({
            "kind": self.kind.as_str(),
            "resource": self.resource,
            "debug": settings.debug,
        });

        let rendered = if views.exists(view) {
            views
                .render(view, &data)
                .map_err(|e| tracing::warn!(view, error = %e, "Failed to render the 404 view"))
                .ok()
        } else {
            None
        };

        if let Some(body) = rendered {
            HttpResponse::new(StatusCode::NOT_FOUND, body)
        } else {
            let mut response = HttpResponse::new(StatusCode::NOT_FOUND, self.plain_body(settings.debug));
            response.set_content_type("text/plain; charset=utf-8");
            response
        }
    }

    fn plain_body(&self, debug: bool) -> String {
        if debug {
            format!("404 Not Found ({}): {}", self.kind, self.resource)
        } else {
            "404 Not Found".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::StaticViews;

    fn production() -> Settings {
        Settings {
            debug: false,
            ..Settings::default()
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(NotFoundKind::Url.as_str(), "url");
        assert_eq!(NotFoundKind::View.to_string(), "view");
        assert_eq!(NotFoundKind::Controller.as_str(), "controller");
        assert_eq!(NotFoundKind::Method.as_str(), "method");
    }

    #[test]
    fn test_debug_view_selected_in_debug() {
        let mut views = StaticViews::new();
        views.insert("errors.404", "prod").insert("errors.404-debug", "debug {{ kind }}");
        let nf = NotFound::new(NotFoundKind::Url, "http://localhost/x");
        assert_eq!(nf.render(&views, &Settings::default()).body(), "debug url");
        assert_eq!(nf.render(&views, &production()).body(), "prod");
    }

    #[test]
    fn test_plain_fallback() {
        let views = StaticViews::new();
        let nf = NotFound::new(NotFoundKind::Method, "UserController::edit");
        let debug = nf.render(&views, &Settings::default());
        assert_eq!(debug.status(), StatusCode::NOT_FOUND);
        assert_eq!(debug.body(), "404 Not Found (method): UserController::edit");
        assert_eq!(debug.content_type(), "text/plain; charset=utf-8");

        let prod = nf.render(&views, &production());
        assert_eq!(prod.body(), "404 Not Found");
    }
}
