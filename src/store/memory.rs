//! In-memory content store backed by a JSON fixture file
//!
//! Mirrors the subset of Prismic search semantics the blog relies on:
//! `at` predicates, field projection, ordering by publication date,
//! `after`, and page-based cursors.

use async_trait::async_trait;
use std::cmp::Ordering as CmpOrdering;
use std::fs;
use std::path::Path;

use super::{ContentStore, Direction, Predicate, Query, RawDocument, SearchResponse, StoreError};

const CURSOR_PREFIX: &str = "memory:";
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Documents held in memory, in repository order
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<RawDocument>,
}

impl MemoryStore {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self { documents }
    }

    /// Load a JSON array of documents
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path.as_ref())?;
        let documents: Vec<RawDocument> = serde_json::from_str(&content)?;
        tracing::debug!(
            "Loaded {} documents from {:?}",
            documents.len(),
            path.as_ref()
        );
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn matching(&self, query: &Query) -> Vec<RawDocument> {
        let mut docs: Vec<RawDocument> = self
            .documents
            .iter()
            .filter(|doc| query.predicates.iter().all(|p| matches(doc, p)))
            .cloned()
            .collect();

        if !query.orderings.is_empty() {
            docs.sort_by(|a, b| {
                query
                    .orderings
                    .iter()
                    .map(|o| {
                        let ord = compare_field(a, b, &o.field);
                        match o.direction {
                            Direction::Asc => ord,
                            Direction::Desc => ord.reverse(),
                        }
                    })
                    .find(|ord| *ord != CmpOrdering::Equal)
                    .unwrap_or(CmpOrdering::Equal)
            });
        }

        if let Some(after) = &query.after {
            docs = match docs.iter().position(|d| &d.id == after) {
                Some(pos) => docs.split_off(pos + 1),
                None => Vec::new(),
            };
        }

        docs
    }
}

fn matches(doc: &RawDocument, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::At { path, value } => match path.as_str() {
            "document.type" => &doc.doc_type == value,
            "document.id" => &doc.id == value,
            _ => match path.strip_prefix("my.").and_then(|p| p.split_once('.')) {
                Some((doc_type, "uid")) => {
                    doc.doc_type == doc_type && doc.uid.as_deref() == Some(value.as_str())
                }
                Some((doc_type, field)) => {
                    doc.doc_type == doc_type
                        && doc.data.get(field).and_then(|v| v.as_str()) == Some(value.as_str())
                }
                None => false,
            },
        },
    }
}

fn compare_field(a: &RawDocument, b: &RawDocument, field: &str) -> CmpOrdering {
    match field {
        "document.first_publication_date" => {
            a.first_publication_date.cmp(&b.first_publication_date)
        }
        "document.last_publication_date" => a.last_publication_date.cmp(&b.last_publication_date),
        _ => CmpOrdering::Equal,
    }
}

fn project(mut doc: RawDocument, fetch: &[String]) -> RawDocument {
    if fetch.is_empty() {
        return doc;
    }
    if let Some(data) = doc.data.as_object_mut() {
        let doc_type = doc.doc_type.as_str();
        data.retain(|key, _| {
            fetch
                .iter()
                .any(|f| f.split_once('.') == Some((doc_type, key.as_str())))
        });
    }
    doc
}

fn encode_cursor(query: &Query) -> Result<String, StoreError> {
    Ok(format!("{}{}", CURSOR_PREFIX, serde_json::to_string(query)?))
}

fn decode_cursor(cursor: &str) -> Result<Query, StoreError> {
    let raw = cursor
        .strip_prefix(CURSOR_PREFIX)
        .ok_or_else(|| StoreError::InvalidCursor(cursor.to_string()))?;
    serde_json::from_str(raw).map_err(|_| StoreError::InvalidCursor(cursor.to_string()))
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<SearchResponse, StoreError> {
        let docs = self.matching(query);
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = query.page.unwrap_or(1).max(1);
        let total = docs.len() as u32;
        let total_pages = total.div_ceil(page_size);

        let results: Vec<RawDocument> = docs
            .into_iter()
            .skip((page as usize - 1).saturating_mul(page_size as usize))
            .take(page_size as usize)
            .map(|d| project(d, &query.fetch))
            .collect();

        let next_page = if page < total_pages {
            Some(encode_cursor(&query.clone().page(page + 1))?)
        } else {
            None
        };
        let prev_page = if page > 1 {
            Some(encode_cursor(&query.clone().page(page - 1))?)
        } else {
            None
        };

        Ok(SearchResponse {
            page,
            results_per_page: page_size,
            results_size: results.len() as u32,
            total_results_size: total,
            total_pages,
            next_page,
            prev_page,
            results,
        })
    }

    async fn follow(&self, cursor: &str) -> Result<SearchResponse, StoreError> {
        let query = decode_cursor(cursor)?;
        self.query(&query).await
    }
}
