//! Page server with incremental regeneration
//!
//! Pages are rendered on first request and cached. Once a page's interval
//! has elapsed the cached copy is still served while a background task
//! renders a fresh one. Post pages outside the configured static paths are
//! answered with a loading placeholder until their first render completes.

mod cache;

pub use cache::{CachedPage, PageBody, PageCache};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::generator::{Generator, RenderedPage};
use crate::store::StoreError;
use crate::Blog;

const LISTING_ROUTE: &str = "/";

/// A page that can be (re)generated
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Listing,
    /// Listing page after the first
    Page(u32),
    Post(String),
}

impl Target {
    fn route(&self) -> String {
        match self {
            Target::Listing => LISTING_ROUTE.to_string(),
            Target::Page(number) => format!("page/{}", number),
            Target::Post(slug) => format!("post/{}", slug),
        }
    }
}

/// Outcome of looking up a post route
#[derive(Debug, Clone)]
pub enum Resolved {
    Page(RenderedPage),
    /// Generation is in progress
    Fallback,
    NotFound,
    Failed(String),
}

impl From<PageBody> for Resolved {
    fn from(body: PageBody) -> Self {
        match body {
            PageBody::Ready(page) => Resolved::Page(page),
            PageBody::NotFound => Resolved::NotFound,
            PageBody::Failed(message) => Resolved::Failed(message),
        }
    }
}

/// Server state
pub struct ServerState {
    generator: Generator,
    cache: PageCache,
    static_paths: HashSet<String>,
}

impl ServerState {
    pub fn new(generator: Generator) -> Self {
        let static_paths = generator
            .blog()
            .config
            .static_paths
            .iter()
            .cloned()
            .collect();
        Self {
            generator,
            cache: PageCache::new(),
            static_paths,
        }
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    fn revalidate_for(&self, target: &Target) -> Duration {
        let revalidate = &self.generator.blog().config.revalidate;
        match target {
            Target::Listing | Target::Page(_) => revalidate.listing(),
            Target::Post(slug) if self.static_paths.contains(slug) => revalidate.detail(),
            Target::Post(_) => revalidate.fallback(),
        }
    }

    async fn build(&self, target: &Target) -> Result<RenderedPage> {
        match target {
            Target::Listing => self.generator.build_listing().await,
            Target::Page(number) => self.generator.build_listing_page(*number).await,
            Target::Post(slug) => self.generator.build_detail(slug).await,
        }
    }

    /// Render `target` and store the outcome in the cache
    async fn regenerate(&self, target: &Target) -> PageBody {
        let route = target.route();
        let revalidate = self.revalidate_for(target);

        match self.build(target).await {
            Ok(page) => {
                tracing::debug!("Rendered {}", route);
                let body = PageBody::Ready(page);
                self.cache
                    .insert(&route, CachedPage::new(body.clone(), revalidate))
                    .await;
                body
            }
            Err(e) if is_not_found(&e) => {
                tracing::info!("{} not found in the content store", route);
                self.cache
                    .insert(&route, CachedPage::new(PageBody::NotFound, revalidate))
                    .await;
                PageBody::NotFound
            }
            Err(e) => {
                tracing::error!("Failed to render {}: {:#}", route, e);
                let message = e.to_string();
                self.cache
                    .insert_failure(&route, message.clone(), revalidate)
                    .await;
                match self.cache.get(&route).await {
                    Some(cached) => cached.body,
                    None => PageBody::Failed(message),
                }
            }
        }
    }

    /// Regenerate `target` on its own task unless that is already happening.
    ///
    /// The task outlives the request that started it, so a client going away
    /// never leaves the route marked in flight.
    fn spawn_regenerate(self: &Arc<Self>, target: Target) -> Option<JoinHandle<PageBody>> {
        let route = target.route();
        if !self.cache.begin(&route) {
            return None;
        }
        let state = Arc::clone(self);
        Some(tokio::spawn(async move {
            let body = state.regenerate(&target).await;
            state.cache.finish(&route);
            body
        }))
    }

    async fn resolve(self: &Arc<Self>, target: Target, block: bool) -> Resolved {
        let route = target.route();
        loop {
            if let Some(cached) = self.cache.get(&route).await {
                if cached.is_stale() {
                    tracing::debug!("{} is stale, revalidating", route);
                    self.spawn_regenerate(target);
                }
                return cached.body.into();
            }

            if !block {
                self.spawn_regenerate(target);
                return Resolved::Fallback;
            }

            if let Some(handle) = self.spawn_regenerate(target.clone()) {
                return match handle.await {
                    Ok(body) => body.into(),
                    Err(e) => {
                        tracing::error!("Rendering {} panicked: {}", route, e);
                        Resolved::Failed(e.to_string())
                    }
                };
            }

            // another request is rendering this route
            self.cache.wait(&route).await;
        }
    }

    /// Listing page, rendered on the spot the first time
    pub async fn listing(self: &Arc<Self>) -> Resolved {
        self.resolve(Target::Listing, true).await
    }

    /// Listing page `number`, rendered on the spot the first time
    pub async fn listing_page(self: &Arc<Self>, number: u32) -> Resolved {
        match number {
            0 => Resolved::NotFound,
            1 => self.listing().await,
            n => self.resolve(Target::Page(n), true).await,
        }
    }

    /// Post page; slugs outside the static paths get the fallback first
    pub async fn post(self: &Arc<Self>, slug: &str) -> Resolved {
        let block = self.static_paths.contains(slug);
        self.resolve(Target::Post(slug.to_string()), block).await
    }

    /// Render the listing and the static paths ahead of the first request
    pub async fn warm(&self) {
        let mut targets = vec![Target::Listing];
        targets.extend(self.static_paths.iter().cloned().map(Target::Post));
        for target in targets {
            if let PageBody::Failed(message) = self.regenerate(&target).await {
                tracing::warn!("Could not pre-render {}: {}", target.route(), message);
            }
        }
    }

    fn html_response(&self, resolved: Resolved, slug: Option<&str>) -> Response {
        let i18n = self.generator.i18n();
        let rendered = match resolved {
            Resolved::Page(page) => return Html(page.html).into_response(),
            Resolved::Fallback => {
                let slug = slug.unwrap_or_default();
                (StatusCode::OK, self.generator.render_fallback(slug))
            }
            Resolved::NotFound => (
                StatusCode::NOT_FOUND,
                self.generator.render_error(&i18n.get("not_found")),
            ),
            Resolved::Failed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                self.generator.render_error(&i18n.get("error")),
            ),
        };

        match rendered {
            (status, Ok(html)) => (status, Html(html)).into_response(),
            (_, Err(e)) => {
                tracing::error!("Failed to render page: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        }
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StoreError>()
        .map(StoreError::is_not_found)
        .unwrap_or(false)
}

fn json_response(resolved: Resolved) -> Response {
    let (status, body) = match resolved {
        Resolved::Page(page) => (StatusCode::OK, page.json),
        Resolved::Fallback => (StatusCode::ACCEPTED, r#"{"status":"pending"}"#.to_string()),
        Resolved::NotFound => (StatusCode::NOT_FOUND, r#"{"status":"not_found"}"#.to_string()),
        Resolved::Failed(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"status":"error"}"#.to_string(),
        ),
    };
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn listing_handler(State(state): State<Arc<ServerState>>) -> Response {
    let resolved = state.listing().await;
    state.html_response(resolved, None)
}

async fn listing_json_handler(State(state): State<Arc<ServerState>>) -> Response {
    json_response(state.listing().await)
}

async fn page_handler(
    State(state): State<Arc<ServerState>>,
    Path(page): Path<String>,
) -> Response {
    let (number, json) = match page.strip_suffix(".json") {
        Some(number) => (number, true),
        None => (page.as_str(), false),
    };
    let resolved = match number.parse::<u32>() {
        Ok(number) => state.listing_page(number).await,
        Err(_) => Resolved::NotFound,
    };
    if json {
        json_response(resolved)
    } else {
        state.html_response(resolved, None)
    }
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    if let Some(slug) = slug.strip_suffix(".json") {
        return json_response(state.post(slug).await);
    }
    let resolved = state.post(&slug).await;
    state.html_response(resolved, Some(&slug))
}

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    let static_dir = state.generator.blog().static_dir.clone();
    Router::new()
        .route("/", get(listing_handler))
        .route("/index.json", get(listing_json_handler))
        .route("/page/:page", get(page_handler))
        .route("/post/:slug", get(post_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the page server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let store = blog.store()?;
    let generator = Generator::new(blog, store)?;
    let state = Arc::new(ServerState::new(generator));

    tracing::info!("Pre-rendering listing and {} static paths", state.static_paths.len());
    state.warm().await;

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::store::{ContentStore, MemoryStore, Query, RawDocument, SearchResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Store whose queries wait for a permit, to observe in-flight states
    struct GatedStore {
        inner: MemoryStore,
        gate: Semaphore,
        queries: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for GatedStore {
        async fn query(&self, query: &Query) -> Result<SearchResponse, StoreError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await.expect("gate closed");
            self.inner.query(query).await
        }

        async fn follow(&self, cursor: &str) -> Result<SearchResponse, StoreError> {
            self.inner.follow(cursor).await
        }
    }

    fn docs() -> Vec<RawDocument> {
        ["hooks", "cra"]
            .iter()
            .enumerate()
            .map(|(i, uid)| {
                serde_json::from_value(json!({
                    "id": format!("id-{}", i),
                    "uid": uid,
                    "type": "posts",
                    "first_publication_date": format!("2021-03-{:02}T10:00:00+0000", i + 1),
                    "last_publication_date": format!("2021-03-{:02}T10:00:00+0000", i + 1),
                    "data": {"title": format!("Post {}", uid), "subtitle": "s", "author": "a",
                             "content": []}
                }))
                .unwrap()
            })
            .collect()
    }

    fn state_with(store: Arc<dyn ContentStore>, static_paths: &[&str]) -> Arc<ServerState> {
        let dir = std::env::temp_dir();
        let mut config = SiteConfig::default();
        config.static_paths = static_paths.iter().map(|s| s.to_string()).collect();
        let blog = Blog::with_config(dir, config);
        Arc::new(ServerState::new(Generator::new(&blog, store).unwrap()))
    }

    async fn wait_idle(state: &ServerState, route: &str) {
        for _ in 0..200 {
            if !state.cache().is_in_flight(route) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} still in flight", route);
    }

    #[tokio::test]
    async fn test_fallback_then_content() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(docs()),
            gate: Semaphore::new(0),
            queries: AtomicUsize::new(0),
        });
        let state = state_with(store.clone(), &["hooks"]);

        // not a static path: placeholder while the lookup is in flight
        assert!(matches!(state.post("cra").await, Resolved::Fallback));
        assert!(state.cache().is_in_flight("post/cra"));
        assert!(matches!(state.post("cra").await, Resolved::Fallback));

        store.gate.add_permits(100);
        wait_idle(&state, "post/cra").await;

        match state.post("cra").await {
            Resolved::Page(page) => assert!(page.html.contains("Post cra")),
            other => panic!("unexpected {:?}", other),
        }
        let json = json_response(state.post("cra").await);
        assert_eq!(json.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_concurrent_first_hits_render_once() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(docs()),
            gate: Semaphore::new(0),
            queries: AtomicUsize::new(0),
        });
        let state = state_with(store.clone(), &["hooks"]);

        let requests: Vec<_> = (0..5)
            .map(|_| {
                let state = Arc::clone(&state);
                tokio::spawn(async move { state.post("hooks").await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(50)).await;
        // one render is blocked on its first lookup, the others wait for it
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);

        store.gate.add_permits(100);
        for request in requests {
            match request.await.unwrap() {
                Resolved::Page(page) => assert!(page.html.contains("Post hooks")),
                other => panic!("unexpected {:?}", other),
            }
        }
        // post lookup plus the two neighbour lookups, once
        assert_eq!(store.queries.load(Ordering::SeqCst), 3);
        assert!(!state.cache().is_in_flight("post/hooks"));
    }

    #[tokio::test]
    async fn test_listing_pages() {
        let mut config = SiteConfig::default();
        config.prismic.page_size = 1;
        let blog = Blog::with_config(std::env::temp_dir(), config);
        let store = Arc::new(MemoryStore::new(docs()));
        let state = Arc::new(ServerState::new(Generator::new(&blog, store).unwrap()));

        let first = match state.listing().await {
            Resolved::Page(page) => page,
            other => panic!("unexpected {:?}", other),
        };
        let payload: serde_json::Value = serde_json::from_str(&first.json).unwrap();
        assert_eq!(payload["next_page"], "/page/2.json");

        let second = match state.listing_page(2).await {
            Resolved::Page(page) => page,
            other => panic!("unexpected {:?}", other),
        };
        let payload: serde_json::Value = serde_json::from_str(&second.json).unwrap();
        assert_eq!(payload["results"][0]["uid"], "hooks");
        assert!(payload["next_page"].is_null());

        assert!(matches!(state.listing_page(3).await, Resolved::NotFound));
        assert!(matches!(state.listing_page(0).await, Resolved::NotFound));
        let response = json_response(state.listing_page(3).await);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_path_renders_immediately() {
        let state = state_with(Arc::new(MemoryStore::new(docs())), &["hooks"]);
        match state.post("hooks").await {
            Resolved::Page(page) => assert!(page.html.contains("Post hooks")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_slug_becomes_not_found() {
        let state = state_with(Arc::new(MemoryStore::new(docs())), &[]);
        assert!(matches!(state.post("missing").await, Resolved::Fallback));
        wait_idle(&state, "post/missing").await;
        assert!(matches!(state.post("missing").await, Resolved::NotFound));

        let response = json_response(state.post("missing").await);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = state.html_response(Resolved::NotFound, Some("missing"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pending_json_is_accepted() {
        let response = json_response(Resolved::Fallback);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_listing_is_cached_until_stale() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(docs()),
            gate: Semaphore::new(1000),
            queries: AtomicUsize::new(0),
        });
        let state = state_with(store.clone(), &[]);

        assert!(matches!(state.listing().await, Resolved::Page(_)));
        assert!(matches!(state.listing().await, Resolved::Page(_)));
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);

        // force the entry stale: it is served and refreshed in the background
        let cached = state.cache().get(LISTING_ROUTE).await.unwrap();
        state
            .cache()
            .insert(LISTING_ROUTE, CachedPage::new(cached.body, Duration::ZERO))
            .await;
        assert!(matches!(state.listing().await, Resolved::Page(_)));
        wait_idle(&state, LISTING_ROUTE).await;
        assert_eq!(store.queries.load(Ordering::SeqCst), 2);

        let refreshed = state.cache().get(LISTING_ROUTE).await.unwrap();
        assert_eq!(refreshed.revalidate, Duration::from_secs(86400));
    }

    #[tokio::test]
    async fn test_fallback_pages_use_short_interval() {
        let state = state_with(Arc::new(MemoryStore::new(docs())), &["hooks"]);
        state.post("hooks").await;
        state.post("cra").await;
        wait_idle(&state, "post/cra").await;

        let fixed = state.cache().get("post/hooks").await.unwrap();
        let fallback = state.cache().get("post/cra").await.unwrap();
        assert_eq!(fixed.revalidate, Duration::from_secs(86400));
        assert_eq!(fallback.revalidate, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_warm() {
        let state = state_with(Arc::new(MemoryStore::new(docs())), &["hooks", "gone"]);
        state.warm().await;
        assert!(state.cache().get(LISTING_ROUTE).await.is_some());
        assert!(state.cache().get("post/hooks").await.is_some());
        assert!(matches!(
            state.cache().get("post/gone").await.unwrap().body,
            PageBody::NotFound
        ));
    }
}
