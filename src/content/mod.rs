//! Content module - post models and the logic built on top of them

mod navigation;
mod pagination;
mod post;
mod reading_time;
mod richtext;

pub use navigation::{adjacent_posts, Adjacent};
pub use pagination::{
    collect_all, first_page, listing_page, listing_query, load_more, PostPagination,
};
pub use post::{
    summary_fields, Banner, ContentSection, PostData, PostDetail, PostSummary, SummaryData,
};
pub use reading_time::{body_text, reading_time, WORDS_PER_MINUTE};
pub use richtext::{Block, RichText, Span, TextBlock};
