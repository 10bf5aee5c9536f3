//! List the posts in the content store

use anyhow::Result;

use crate::content::{self, PostPagination};
use crate::helpers::format_date;
use crate::Blog;

/// Fetch every post, newest first
pub async fn fetch(blog: &Blog) -> Result<PostPagination> {
    let store = blog.store()?;
    let prismic = &blog.config.prismic;
    Ok(content::collect_all(store.as_ref(), &prismic.document_type, prismic.page_size).await?)
}

/// Print every post
pub async fn run(blog: &Blog) -> Result<()> {
    let posts = fetch(blog).await?;
    let tz = blog.config.tz();

    println!("Posts ({}):", posts.results.len());
    for post in &posts.results {
        let date = post
            .first_publication_date
            .map(|d| format_date(&d, "yyyy-MM-dd", &blog.config.language, tz))
            .unwrap_or_else(|| "unpublished".to_string());
        println!(
            "  {} - {} [{}]",
            date,
            post.data.title,
            post.uid.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
