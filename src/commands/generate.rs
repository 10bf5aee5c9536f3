//! Generate static files

use anyhow::Result;

use crate::generator::{GenerateReport, Generator};
use crate::Blog;

/// Generate the static site
pub async fn run(blog: &Blog, all: bool) -> Result<GenerateReport> {
    let start = std::time::Instant::now();

    let store = blog.store()?;
    let generator = Generator::new(blog, store)?;
    let report = generator.generate(all).await?;

    tracing::info!(
        "Listed {} posts on {} pages, generated {} post pages",
        report.listed,
        report.pages,
        report.generated.len()
    );
    if !report.missing.is_empty() {
        tracing::warn!("Missing posts: {}", report.missing.join(", "));
    }

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}
