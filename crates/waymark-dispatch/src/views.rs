//! View rendering.
//!
//! View identifiers use dots as path separators: `errors.404` names the
//! template `errors/404.html`. [`TeraViews`] renders templates with
//! [`tera`]; [`StaticViews`] keeps view bodies in memory.

use std::collections::HashMap;
use std::path::Path;

use tera::{Context, Tera};

use waymark_core::{WaymarkError, WaymarkResult};

/// Looks up and renders views by identifier.
pub trait ViewRenderer: Send + Sync {
    /// Returns `true` if a view with this identifier exists.
    fn exists(&self, view: &str) -> bool;

    /// Renders a view with `data`, a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::ViewRenderError`] if the view is missing or
    /// fails to render.
    fn render(&self, view: &str, data: &serde_json::Value) -> WaymarkResult<String>;
}

/// Template-backed views.
///
/// # Examples
///
/// ```
/// use waymark_dispatch::views::{TeraViews, ViewRenderer};
///
/// let views = TeraViews::from_templates([("users.show", "User {{ id }}")]).unwrap();
/// assert!(views.exists("users.show"));
/// let html = views.render("users.show", &serde_json::json!({"id": "5"})).unwrap();
/// assert_eq!(html, "User 5");
/// ```
#[derive(Debug)]
pub struct TeraViews {
    tera: Tera,
    extension: String,
}

impl TeraViews {
    /// Loads every `*.{extension}` template under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::ConfigurationError`] if a template fails to parse.
    pub fn from_dir(dir: &Path, extension: &str) -> WaymarkResult<Self> {
        let glob = format!("{}/**/*.{extension}", dir.display());
        let tera = Tera::new(&glob).map_err(|e| {
            WaymarkError::ConfigurationError(format!("Failed to load views from {}: {e}", dir.display()))
        })?;
        tracing::debug!(dir = %dir.display(), count = tera.get_template_names().count(), "Loaded views");
        Ok(Self {
            tera,
            extension: extension.to_string(),
        })
    }

    /// Builds views from `(identifier, source)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::ConfigurationError`] if a template fails to parse.
    pub fn from_templates<I, K, V>(templates: I) -> WaymarkResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut views = Self {
            tera: Tera::default(),
            extension: "html".to_string(),
        };
        for (view, source) in templates {
            views.add(view.as_ref(), source.as_ref())?;
        }
        Ok(views)
    }

    /// Adds or replaces one view.
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::ConfigurationError`] if the template fails to parse.
    pub fn add(&mut self, view: &str, source: &str) -> WaymarkResult<()> {
        let name = self.template_name(view);
        self.tera
            .add_raw_template(&name, source)
            .map_err(|e| WaymarkError::ConfigurationError(format!("Invalid view '{view}': {e}")))
    }

    /// Maps a view identifier to its template name.
    pub fn template_name(&self, view: &str) -> String {
        format!("{}.{}", view.replace('.', "/"), self.extension)
    }
}

impl ViewRenderer for TeraViews {
    fn exists(&self, view: &str) -> bool {
        let name = self.template_name(view);
        self.tera.get_template_names().any(|n| n == name)
    }

    fn render(&self, view: &str, data: &serde_json::Value) -> WaymarkResult<String> {
        let context = Context::from_serialize(data)
            .map_err(|e| WaymarkError::ViewRenderError(format!("{view}: {e}")))?;
        self.tera
            .render(&self.template_name(view), &context)
            .map_err(|e| WaymarkError::ViewRenderError(format!("{view}: {e}")))
    }
}

/// In-memory views.
///
/// Bodies are tera templates rendered on demand without autoescaping, so a
/// view needs no file on disk and no up-front registration with an engine.
///
/// ```
/// use waymark_dispatch::views::{StaticViews, ViewRenderer};
///
/// let mut views = StaticViews::new();
/// views.insert("home.index", "Welcome");
/// views.insert("posts.show", "Post {{ slug }}");
/// assert_eq!(views.render("home.index", &serde_json::json!({})).unwrap(), "Welcome");
/// assert_eq!(
///     views.render("posts.show", &serde_json::json!({"slug": "hello"})).unwrap(),
///     "Post hello"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticViews {
    views: HashMap<String, String>,
}

impl StaticViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a view.
    pub fn insert(&mut self, view: &str, body: &str) -> &mut Self {
        self.views.insert(view.to_string(), body.to_string());
        self
    }
}

impl ViewRenderer for StaticViews {
    fn exists(&self, view: &str) -> bool {
        self.views.contains_key(view)
    }

    fn render(&self, view: &str, data: &serde_json::Value) -> WaymarkResult<String> {
        let body = self
            .views
            .get(view)
            .ok_or_else(|| WaymarkError::ViewRenderError(format!("View not found: {view}")))?;
        let context = Context::from_serialize(data)
            .map_err(|e| WaymarkError::ViewRenderError(format!("{view}: {e}")))?;
        Tera::one_off(body, &context, false).map_err(|e| WaymarkError::ViewRenderError(format!("{view}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_name_mapping() {
        let views = TeraViews::from_templates(Vec::<(&str, &str)>::new()).unwrap();
        assert_eq!(views.template_name("errors.404"), "errors/404.html");
        assert_eq!(views.template_name("home"), "home.html");
    }

    #[test]
    fn test_tera_exists_and_missing() {
        let views = TeraViews::from_templates([("errors.404", "Not here")]).unwrap();
        assert!(views.exists("errors.404"));
        assert!(!views.exists("errors.500"));
        assert!(matches!(
            views.render("errors.500", &serde_json::json!({})),
            Err(WaymarkError::ViewRenderError(_))
        ));
    }

    #[test]
    fn test_tera_invalid_template() {
        let result = TeraViews::from_templates([("broken", "{% if %}")]);
        assert!(matches!(result, Err(WaymarkError::ConfigurationError(_))));
    }

    #[test]
    fn test_tera_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pages")).unwrap();
        std::fs::write(dir.path().join("pages/about.html"), "About {{ team }}").unwrap();

        let views = TeraViews::from_dir(dir.path(), "html").unwrap();
        assert!(views.exists("pages.about"));
        let html = views
            .render("pages.about", &serde_json::json!({"team": "us"}))
            .unwrap();
        assert_eq!(html, "About us");
    }

    #[test]
    fn test_static_views_substitution() {
        let mut views = StaticViews::new();
        views.insert("n", "{{count}} items, {{ count }} total");
        let out = views.render("n", &serde_json::json!({"count": 3})).unwrap();
        assert_eq!(out, "3 items, 3 total");
        assert!(!views.exists("missing"));
        assert!(views.render("missing", &serde_json::json!({})).is_err());
    }

    #[test]
    fn test_static_views_full_template_syntax() {
        let mut views = StaticViews::new();
        views.insert("errors.404-debug", "{% if debug %}DEBUG {% endif %}{{ kind | upper }}");
        let out = views
            .render("errors.404-debug", &serde_json::json!({"debug": true, "kind": "url"}))
            .unwrap();
        assert_eq!(out, "DEBUG URL");
    }

    #[test]
    fn test_static_views_do_not_escape() {
        let mut views = StaticViews::new();
        views.insert("link", "<a href=\"{{ url }}\">go</a>");
        let out = views
            .render("link", &serde_json::json!({"url": "http://example.com/a?b=1&c=2"}))
            .unwrap();
        assert_eq!(out, "<a href=\"http://example.com/a?b=1&c=2\">go</a>");
    }

    #[test]
    fn test_static_views_invalid_template() {
        let mut views = StaticViews::new();
        views.insert("broken", "{% if %}");
        assert!(matches!(
            views.render("broken", &serde_json::json!({})),
            Err(WaymarkError::ViewRenderError(_))
        ));
    }
}
