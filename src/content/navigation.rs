//! Previous/next post lookup

use super::{PostSummary, SummaryData};
use crate::store::{ContentStore, Direction, Query, StoreError};

/// Posts published right before and right after a given post
#[derive(Debug, Clone, Default)]
pub struct Adjacent {
    pub prev: Option<PostSummary>,
    pub next: Option<PostSummary>,
}

async fn neighbour(
    store: &dyn ContentStore,
    doc_type: &str,
    id: &str,
    direction: Direction,
) -> Result<Option<PostSummary>, StoreError> {
    let query = Query::by_type(doc_type)
        .page_size(1)
        .after(id)
        .order_by("document.first_publication_date", direction);
    let response = store.query(&query).await?;
    response
        .results
        .into_iter()
        .next()
        .map(|doc| doc.decode::<SummaryData>())
        .transpose()
}

/// Look up the neighbours of document `id` by first publication date
pub async fn adjacent_posts(
    store: &dyn ContentStore,
    doc_type: &str,
    id: &str,
) -> Result<Adjacent, StoreError> {
    let prev = neighbour(store, doc_type, id, Direction::Desc).await?;
    let next = neighbour(store, doc_type, id, Direction::Asc).await?;
    Ok(Adjacent { prev, next })
}
