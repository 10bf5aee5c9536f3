//! Generator module - builds listing and detail pages from the content store
//! and renders them with the built-in Tera templates
//!
//! Every page has two payloads: the HTML document and a JSON document with
//! the data it was rendered from.

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Context;
use walkdir::WalkDir;

use crate::content::{
    self, adjacent_posts, Adjacent, PostDetail, PostPagination, PostSummary, PostData,
};
use crate::helpers::{
    anchor_id, comments_script, date_xml, format_date, post_path, reduce_title, url_for,
};
use crate::i18n::I18n;
use crate::store::{ContentStore, StoreError};
use crate::templates::{
    ListingItem, ListingState, NavLink, PostView, SectionView, SiteData, TemplateRenderer,
    Translations,
};
use crate::Blog;

/// A rendered page: HTML plus the JSON payload it was built from
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub json: String,
}

/// Data behind one page of the listing
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// 1-based page number
    pub number: u32,
    /// Results and the store's own cursor
    pub pagination: PostPagination,
}

/// Data behind a detail page
#[derive(Debug, Clone)]
pub struct DetailPage {
    pub post: PostDetail,
    pub adjacent: Adjacent,
    pub reading_time: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailPayload<'a> {
    post: &'a PostDetail,
    prev_post: Option<&'a PostSummary>,
    next_post: Option<&'a PostSummary>,
    reading_time: usize,
}

/// Outcome of a full generation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub listed: usize,
    /// Listing pages written, the index included
    pub pages: u32,
    pub generated: Vec<String>,
    pub missing: Vec<String>,
}

/// Page builder shared by the `generate` command and the server
pub struct Generator {
    blog: Blog,
    store: Arc<dyn ContentStore>,
    renderer: TemplateRenderer,
    i18n: I18n,
    tz: chrono_tz::Tz,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog, store: Arc<dyn ContentStore>) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let i18n = blog.i18n()?;
        let tz = blog.config.tz();

        Ok(Self {
            blog: blog.clone(),
            store,
            renderer,
            i18n,
            tz,
        })
    }

    pub fn blog(&self) -> &Blog {
        &self.blog
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    pub fn i18n(&self) -> &I18n {
        &self.i18n
    }

    /// Fetch the first page of the listing
    pub async fn listing(&self) -> Result<ListingPage, StoreError> {
        self.listing_page(1).await
    }

    /// Fetch page `number` of the listing. Pages past the end are not found.
    pub async fn listing_page(&self, number: u32) -> Result<ListingPage, StoreError> {
        let prismic = &self.blog.config.prismic;
        let (doc_type, page_size) = (&prismic.document_type, prismic.page_size);

        if number <= 1 {
            let pagination = content::first_page(self.store(), doc_type, page_size).await?;
            return Ok(ListingPage {
                number: 1,
                pagination,
            });
        }

        let pagination = content::listing_page(self.store(), doc_type, page_size, number).await?;
        if pagination.results.is_empty() {
            return Err(StoreError::NotFound(format!("page {}", number)));
        }
        Ok(ListingPage { number, pagination })
    }

    /// Fetch a post, its neighbours, and its reading time
    pub async fn detail(&self, slug: &str) -> Result<DetailPage, StoreError> {
        let doc_type = &self.blog.config.prismic.document_type;
        let post = self
            .store()
            .get_by_uid(doc_type, slug)
            .await?
            .decode::<PostData>()?;
        let adjacent = adjacent_posts(self.store(), doc_type, &post.id).await?;
        let reading_time = content::reading_time(
            &post.data.content,
            self.blog.config.reading.words_per_minute,
        );

        Ok(DetailPage {
            post,
            adjacent,
            reading_time,
        })
    }

    /// Fetch and render the listing
    pub async fn build_listing(&self) -> Result<RenderedPage> {
        self.build_listing_page(1).await
    }

    /// Fetch and render page `number` of the listing
    pub async fn build_listing_page(&self, number: u32) -> Result<RenderedPage> {
        let page = self.listing_page(number).await?;
        self.render_listing(&page)
    }

    /// Public URL of a listing page's JSON payload
    pub fn page_url(&self, number: u32) -> String {
        if number <= 1 {
            url_for(&self.blog.config, "/index.json")
        } else {
            url_for(&self.blog.config, &format!("/page/{}.json", number))
        }
    }

    /// The pagination handed to browsers: the store cursor is replaced by
    /// the URL of the next listing page, which `generate` and the server
    /// both provide.
    pub fn public_pagination(&self, page: &ListingPage) -> PostPagination {
        PostPagination {
            next_page: page
                .pagination
                .next_page
                .as_ref()
                .map(|_| self.page_url(page.number.saturating_add(1))),
            results: page.pagination.results.clone(),
        }
    }

    /// Fetch and render a detail page
    pub async fn build_detail(&self, slug: &str) -> Result<RenderedPage> {
        let page = self.detail(slug).await?;
        self.render_detail(&page)
    }

    fn site_data(&self) -> SiteData {
        let config = &self.blog.config;
        SiteData {
            title: config.title.clone(),
            language: config.language.clone(),
            logo: if config.logo.is_empty() {
                String::new()
            } else {
                url_for(config, &config.logo)
            },
            home_url: url_for(config, "/"),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn translations(&self) -> Translations {
        self.i18n.get_all_translations()
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site_data());
        context.insert("t", &self.translations());
        context
    }

    fn format(&self, date: &chrono::DateTime<chrono::Utc>, pattern: &str) -> String {
        format_date(date, pattern, &self.blog.config.language, self.tz)
    }

    fn listing_item(&self, post: &PostSummary) -> Option<ListingItem> {
        let config = &self.blog.config;
        let path = post.path()?;
        Some(ListingItem {
            href: url_for(config, &path),
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            date: post
                .first_publication_date
                .map(|d| self.format(&d, &config.date_format))
                .unwrap_or_default(),
            datetime: post.first_publication_date.map(|d| date_xml(&d)),
        })
    }

    fn nav_link(&self, post: &PostSummary) -> Option<NavLink> {
        let path = post.path()?;
        Some(NavLink {
            href: url_for(&self.blog.config, &path),
            title: reduce_title(&post.data.title, self.blog.config.nav_title_length),
        })
    }

    /// Render the listing page
    pub fn render_listing(&self, page: &ListingPage) -> Result<RenderedPage> {
        let config = &self.blog.config;
        let items: Vec<ListingItem> = page
            .pagination
            .results
            .iter()
            .filter_map(|post| {
                let item = self.listing_item(post);
                if item.is_none() {
                    tracing::warn!("Skipping document {} without uid", post.id);
                }
                item
            })
            .collect();

        let public = self.public_pagination(page);
        let state = ListingState {
            next_page: public.next_page.clone(),
            post_base: url_for(config, "/post/"),
            language: config.language.clone(),
        };

        let mut context = self.base_context();
        context.insert("items", &items);
        context.insert("next_page", &public.next_page);
        context.insert("state_json", &script_json(&state)?);

        let html = self.renderer.render("index.html", &context)?;
        let json = serde_json::to_string(&public)?;
        Ok(RenderedPage { html, json })
    }

    /// Build the view model of a detail page
    pub fn post_view(&self, page: &DetailPage) -> PostView {
        let config = &self.blog.config;
        let post = &page.post;

        let sections = post
            .data
            .content
            .iter()
            .map(|section| SectionView {
                heading: section.heading.clone(),
                anchor: anchor_id(&section.heading),
                html: section.body.as_html(),
            })
            .collect();

        let edited = if post.is_edited() {
            post.last_publication_date
                .map(|d| self.format(&d, &config.edited_format))
        } else {
            None
        };

        PostView {
            title: post.data.title.clone(),
            banner_url: post.data.banner.url.clone(),
            banner_alt: post
                .data
                .banner
                .alt
                .clone()
                .unwrap_or_else(|| format!("{} banner", post.data.title)),
            author: post.data.author.clone(),
            date: post
                .first_publication_date
                .map(|d| self.format(&d, &config.date_format))
                .unwrap_or_default(),
            datetime: post.first_publication_date.map(|d| date_xml(&d)),
            reading_time: self.i18n.get_count("reading_time", page.reading_time),
            edited,
            sections,
            prev: page.adjacent.prev.as_ref().and_then(|p| self.nav_link(p)),
            next: page.adjacent.next.as_ref().and_then(|p| self.nav_link(p)),
            comments: comments_script(&config.comments),
        }
    }

    /// Render a detail page
    pub fn render_detail(&self, page: &DetailPage) -> Result<RenderedPage> {
        let mut context = self.base_context();
        context.insert("post", &self.post_view(page));
        let html = self.renderer.render("post.html", &context)?;

        let json = serde_json::to_string(&DetailPayload {
            post: &page.post,
            prev_post: page.adjacent.prev.as_ref(),
            next_post: page.adjacent.next.as_ref(),
            reading_time: page.reading_time,
        })?;
        Ok(RenderedPage { html, json })
    }

    /// Placeholder shown while a detail page is generated on demand
    pub fn render_fallback(&self, slug: &str) -> Result<String> {
        let json_url = url_for(&self.blog.config, &format!("{}.json", post_path(slug)));
        let mut context = self.base_context();
        context.insert("json_url_js", &script_json(&json_url)?);
        self.renderer.render("fallback.html", &context)
    }

    /// Generic error page
    pub fn render_error(&self, message: &str) -> Result<String> {
        let mut context = self.base_context();
        context.insert("message", message);
        self.renderer.render("error.html", &context)
    }

    /// Generate the whole site into the public directory
    ///
    /// Detail pages are generated for the configured static paths, or for
    /// every post when `all` is set or no static path is configured.
    pub async fn generate(&self, all: bool) -> Result<GenerateReport> {
        let public_dir = &self.blog.public_dir;
        fs::create_dir_all(public_dir)?;

        self.copy_static_assets()?;

        let listing = self.listing().await.context("fetching post listing")?;
        let rendered = self.render_listing(&listing)?;
        write_page(public_dir, "index", &rendered)?;

        let mut report = GenerateReport {
            listed: listing.pagination.results.len(),
            pages: 1,
            ..Default::default()
        };

        let mut has_more = listing.pagination.has_more();
        while has_more {
            let number = report.pages + 1;
            let page = self
                .listing_page(number)
                .await
                .with_context(|| format!("fetching listing page {}", number))?;
            let rendered = self.render_listing(&page)?;
            write_entry(public_dir, "page", &number.to_string(), &rendered)?;
            report.listed += page.pagination.results.len();
            report.pages = number;
            has_more = page.pagination.has_more();
        }

        let slugs = self.slugs_to_generate(all).await?;
        for slug in slugs {
            if !is_safe_slug(&slug) {
                tracing::warn!("Skipping unsafe slug {:?}", slug);
                continue;
            }
            match self.detail(&slug).await {
                Ok(page) => {
                    let rendered = self.render_detail(&page)?;
                    write_entry(public_dir, "post", &slug, &rendered)?;
                    report.generated.push(slug);
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!("Post {} not found in the content store", slug);
                    report.missing.push(slug);
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e).context(format!("generating post {}", slug)))
                }
            }
        }

        Ok(report)
    }

    async fn slugs_to_generate(&self, all: bool) -> Result<Vec<String>> {
        let config = &self.blog.config;
        if !all && !config.static_paths.is_empty() {
            return Ok(config.static_paths.clone());
        }
        let prismic = &config.prismic;
        let everything =
            content::collect_all(self.store(), &prismic.document_type, prismic.page_size).await?;
        Ok(everything
            .results
            .into_iter()
            .filter_map(|p| p.uid)
            .collect())
    }

    /// Copy files from the static directory into the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry.path().strip_prefix(static_dir)?;
            let target: PathBuf = self.blog.public_dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            tracing::debug!("Copied: {:?}", relative);
        }

        Ok(())
    }
}

/// Serialize for embedding inside a `<script>` element
fn script_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn write_page(dir: &Path, name: &str, page: &RenderedPage) -> Result<()> {
    fs::write(dir.join(format!("{}.html", name)), &page.html)?;
    fs::write(dir.join(format!("{}.json", name)), &page.json)?;
    tracing::debug!("Generated: {}", name);
    Ok(())
}

/// Write `{section}/{name}/index.html` and `{section}/{name}.json`
fn write_entry(public_dir: &Path, section: &str, name: &str, page: &RenderedPage) -> Result<()> {
    let dir = public_dir.join(section);
    fs::create_dir_all(dir.join(name))?;
    fs::write(dir.join(name).join("index.html"), &page.html)?;
    fs::write(dir.join(format!("{}.json", name)), &page.json)?;
    tracing::debug!("Generated: {}/{}", section, name);
    Ok(())
}

/// Whether a slug can be used as a single path segment on disk
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
        && !slug.contains('\0')
}
