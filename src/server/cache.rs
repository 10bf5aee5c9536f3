//! Rendered page cache with per-entry revalidation intervals

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, RwLock};

use crate::generator::RenderedPage;

/// What a route currently renders to
#[derive(Debug, Clone)]
pub enum PageBody {
    Ready(RenderedPage),
    NotFound,
    /// The last generation failed and nothing better is cached
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CachedPage {
    pub body: PageBody,
    pub generated_at: Instant,
    pub revalidate: Duration,
}

impl CachedPage {
    pub fn new(body: PageBody, revalidate: Duration) -> Self {
        Self {
            body,
            generated_at: Instant::now(),
            revalidate,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.generated_at.elapsed() >= self.revalidate
    }
}

/// Pages keyed by route, plus the routes currently being regenerated
#[derive(Debug, Default)]
pub struct PageCache {
    pages: RwLock<HashMap<String, CachedPage>>,
    in_flight: Mutex<HashMap<String, Arc<Notify>>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, route: &str) -> Option<CachedPage> {
        self.pages.read().await.get(route).cloned()
    }

    pub async fn insert(&self, route: &str, page: CachedPage) {
        self.pages.write().await.insert(route.to_string(), page);
    }

    /// Store a failure unless a previous page can keep being served
    pub async fn insert_failure(&self, route: &str, message: String, revalidate: Duration) {
        let mut pages = self.pages.write().await;
        match pages.get_mut(route) {
            Some(existing) if !matches!(existing.body, PageBody::Failed(_)) => {
                // keep serving the stale copy, retry after another interval
                existing.generated_at = Instant::now();
            }
            _ => {
                pages.insert(
                    route.to_string(),
                    CachedPage::new(PageBody::Failed(message), revalidate),
                );
            }
        }
    }

    // a panic while locked cannot leave the map half-updated
    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, Arc<Notify>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `route` as being regenerated. Returns `false` if it already was.
    pub fn begin(&self, route: &str) -> bool {
        let mut in_flight = self.in_flight();
        if in_flight.contains_key(route) {
            return false;
        }
        in_flight.insert(route.to_string(), Arc::new(Notify::new()));
        true
    }

    /// Clear the in-flight mark and wake everyone waiting on `route`
    pub fn finish(&self, route: &str) {
        let notify = self.in_flight().remove(route);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }

    pub fn is_in_flight(&self, route: &str) -> bool {
        self.in_flight().contains_key(route)
    }

    /// Wait until the regeneration of `route` running now has finished
    pub async fn wait(&self, route: &str) {
        let Some(notify) = self.in_flight().get(route).cloned() else {
            return;
        };
        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        // finish() may have run before the waiter was registered
        let still_running = self
            .in_flight()
            .get(route)
            .is_some_and(|current| Arc::ptr_eq(current, &notify));
        if still_running {
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(html: &str) -> PageBody {
        PageBody::Ready(RenderedPage {
            html: html.to_string(),
            json: "{}".to_string(),
        })
    }

    #[tokio::test]
    async fn test_staleness() {
        let fresh = CachedPage::new(ready("a"), Duration::from_secs(60));
        assert!(!fresh.is_stale());
        let stale = CachedPage::new(ready("a"), Duration::ZERO);
        assert!(stale.is_stale());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_page() {
        let cache = PageCache::new();
        cache
            .insert("/", CachedPage::new(ready("old"), Duration::ZERO))
            .await;
        cache
            .insert_failure("/", "boom".to_string(), Duration::from_secs(10))
            .await;
        match cache.get("/").await.unwrap().body {
            PageBody::Ready(page) => assert_eq!(page.html, "old"),
            other => panic!("unexpected {:?}", other),
        }

        cache
            .insert_failure("post/x", "boom".to_string(), Duration::from_secs(10))
            .await;
        assert!(matches!(
            cache.get("post/x").await.unwrap().body,
            PageBody::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_wait_returns_after_finish() {
        let cache = Arc::new(PageCache::new());
        // nothing in flight
        cache.wait("/").await;

        assert!(cache.begin("/"));
        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.wait("/").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        cache.finish("/");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_in_flight_survives_poisoning() {
        let cache = Arc::new(PageCache::new());
        let poisoner = Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.in_flight.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(cache.in_flight.is_poisoned());

        assert!(cache.begin("/"));
        assert!(!cache.begin("/"));
        cache.finish("/");
        assert!(cache.begin("/"));
    }

    #[test]
    fn test_in_flight() {
        let cache = PageCache::new();
        assert!(cache.begin("/"));
        assert!(!cache.begin("/"));
        assert!(cache.is_in_flight("/"));
        cache.finish("/");
        assert!(!cache.is_in_flight("/"));
        assert!(cache.begin("/"));
    }
}
