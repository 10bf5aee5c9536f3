//! Listing pagination
//!
//! The listing starts with the store's first page; every "load more" follows
//! the page's cursor and appends the new results in store order.

use serde::{Deserialize, Serialize};

use super::{summary_fields, PostSummary, SummaryData};
use crate::store::{ContentStore, Direction, Query, SearchResponse, StoreError};

/// Accumulated listing state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPagination {
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
}

impl PostPagination {
    /// Decode a search page
    pub fn from_response(response: SearchResponse) -> Result<Self, StoreError> {
        let results = response
            .results
            .into_iter()
            .map(|doc| doc.decode::<SummaryData>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            next_page: response.next_page,
            results,
        })
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Append `next`'s results and take over its cursor
    pub fn merge(&mut self, next: PostPagination) {
        self.results.extend(next.results);
        self.next_page = next.next_page;
    }
}

/// The listing query: every post, newest first, listing fields only
pub fn listing_query(doc_type: &str, page_size: u32) -> Query {
    Query::by_type(doc_type)
        .fetch(summary_fields(doc_type))
        .page_size(page_size)
        .order_by("document.first_publication_date", Direction::Desc)
}

/// Fetch the first page of the listing
pub async fn first_page(
    store: &dyn ContentStore,
    doc_type: &str,
    page_size: u32,
) -> Result<PostPagination, StoreError> {
    let response = store.query(&listing_query(doc_type, page_size)).await?;
    PostPagination::from_response(response)
}

/// Fetch page `number` of the listing directly, without following cursors
pub async fn listing_page(
    store: &dyn ContentStore,
    doc_type: &str,
    page_size: u32,
    number: u32,
) -> Result<PostPagination, StoreError> {
    let query = listing_query(doc_type, page_size).page(number.max(1));
    let response = store.query(&query).await?;
    PostPagination::from_response(response)
}

/// Follow the cursor once. Returns `false` when the listing was exhausted.
pub async fn load_more(
    store: &dyn ContentStore,
    pagination: &mut PostPagination,
) -> Result<bool, StoreError> {
    let Some(cursor) = pagination.next_page.clone() else {
        return Ok(false);
    };
    let response = store.follow(&cursor).await?;
    pagination.merge(PostPagination::from_response(response)?);
    Ok(true)
}

/// Follow cursors until the listing is exhausted
pub async fn collect_all(
    store: &dyn ContentStore,
    doc_type: &str,
    page_size: u32,
) -> Result<PostPagination, StoreError> {
    let mut pagination = first_page(store, doc_type, page_size).await?;
    while load_more(store, &mut pagination).await? {}
    Ok(pagination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::collections::HashSet;

    fn store(count: usize) -> MemoryStore {
        let docs = (0..count)
            .map(|i| {
                serde_json::from_value(json!({
                    "id": format!("id-{}", i),
                    "uid": format!("post-{}", i),
                    "type": "posts",
                    "first_publication_date": format!("2021-01-{:02}T10:00:00+0000", i + 1),
                    "data": {"title": format!("Post {}", i), "subtitle": "s", "author": "a"}
                }))
                .unwrap()
            })
            .collect();
        MemoryStore::new(docs)
    }

    fn uids(pagination: &PostPagination) -> Vec<String> {
        pagination
            .results
            .iter()
            .filter_map(|p| p.uid.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_merge_preserves_order_without_duplicates() {
        let store = store(5);
        let mut pagination = first_page(&store, "posts", 2).await.unwrap();
        assert_eq!(uids(&pagination), vec!["post-4", "post-3"]);
        assert!(pagination.has_more());

        assert!(load_more(&store, &mut pagination).await.unwrap());
        assert_eq!(uids(&pagination), vec!["post-4", "post-3", "post-2", "post-1"]);

        assert!(load_more(&store, &mut pagination).await.unwrap());
        let all = uids(&pagination);
        assert_eq!(all, vec!["post-4", "post-3", "post-2", "post-1", "post-0"]);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
        assert!(!pagination.has_more());
    }

    #[tokio::test]
    async fn test_load_more_when_exhausted() {
        let store = store(1);
        let mut pagination = first_page(&store, "posts", 20).await.unwrap();
        assert!(!load_more(&store, &mut pagination).await.unwrap());
        assert_eq!(pagination.results.len(), 1);
    }

    #[tokio::test]
    async fn test_listing_page_by_number() {
        let store = store(5);
        let second = listing_page(&store, "posts", 2, 2).await.unwrap();
        assert_eq!(uids(&second), vec!["post-2", "post-1"]);
        assert!(second.has_more());

        let last = listing_page(&store, "posts", 2, 3).await.unwrap();
        assert_eq!(uids(&last), vec!["post-0"]);
        assert!(!last.has_more());

        let past_end = listing_page(&store, "posts", 2, 9).await.unwrap();
        assert!(past_end.results.is_empty());
    }

    #[tokio::test]
    async fn test_collect_all() {
        let store = store(7);
        let pagination = collect_all(&store, "posts", 3).await.unwrap();
        assert_eq!(pagination.results.len(), 7);
        assert!(pagination.next_page.is_none());
    }

    #[test]
    fn test_merge_replaces_cursor() {
        let mut a = PostPagination {
            next_page: Some("cursor-1".to_string()),
            results: Vec::new(),
        };
        a.merge(PostPagination {
            next_page: None,
            results: Vec::new(),
        });
        assert!(a.next_page.is_none());
    }
}
