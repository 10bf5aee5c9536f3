//! Built-in blog templates using the Tera template engine
//!
//! Templates are embedded in the binary; pages are rendered from the view
//! models defined below.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers::html_escape;

/// Template renderer with the embedded blog theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Pages embed pre-rendered HTML (rich text, comment script); every
        // other value goes through `escape` or `attr` in the templates.
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("blog/layout.html")),
            ("index.html", include_str!("blog/index.html")),
            ("post.html", include_str!("blog/post.html")),
            ("fallback.html", include_str!("blog/fallback.html")),
            ("error.html", include_str!("blog/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("blog/partials/header.html"),
            ),
            (
                "partials/post_nav.html",
                include_str!("blog/partials/post_nav.html"),
            ),
        ])?;

        tera.register_filter("attr", attr_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: escape a value for an attribute or text node
///
/// Unlike the built-in `escape`, slashes are left alone so URLs stay readable.
fn attr_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("attr", "value", String, value);
    Ok(tera::Value::String(html_escape(&s)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
    pub logo: String,
    pub home_url: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingItem {
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub datetime: Option<String>,
}

/// State handed to the listing's "load more" script
#[derive(Debug, Clone, Serialize)]
pub struct ListingState {
    pub next_page: Option<String>,
    pub post_base: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub title: String,
    pub banner_url: Option<String>,
    pub banner_alt: String,
    pub author: String,
    pub date: String,
    pub datetime: Option<String>,
    pub reading_time: String,
    pub edited: Option<String>,
    pub sections: Vec<SectionView>,
    pub prev: Option<NavLink>,
    pub next: Option<NavLink>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub heading: String,
    pub anchor: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavLink {
    pub href: String,
    pub title: String,
}

/// Translations exposed to templates as `t`
pub type Translations = HashMap<String, String>;
