//! Content store access
//!
//! The blog never owns its content: every post is read from a headless CMS
//! through the [`ContentStore`] trait. [`PrismicClient`] talks to the Prismic
//! REST API and [`MemoryStore`] serves documents from a JSON fixture file.

mod document;
mod error;
mod memory;
mod prismic;
mod query;

use async_trait::async_trait;

pub use document::{Document, RawDocument, SearchResponse};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use prismic::PrismicClient;
pub use query::{Direction, Ordering, Predicate, Query};

/// Read-only access to the documents of a content repository
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Run a search query
    async fn query(&self, query: &Query) -> Result<SearchResponse, StoreError>;

    /// Fetch the page a `next_page` cursor points to
    async fn follow(&self, cursor: &str) -> Result<SearchResponse, StoreError>;

    /// Fetch a single document of `doc_type` by its uid
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument, StoreError> {
        let query = Query::by_type(doc_type)
            .filter(Predicate::at(format!("my.{}.uid", doc_type), uid))
            .page_size(1);
        let response = self.query(&query).await?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(uid.to_string()))
    }
}
