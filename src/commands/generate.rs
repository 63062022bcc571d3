//! Generate static files

use anyhow::Result;

use crate::content::ContentRepository;
use crate::generator::{GenerateSummary, Generator};
use crate::Blog;

/// Generate the static site from the configured content API
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.connect().await?;
    tracing::debug!("Using content ref {}", client.master_ref());
    run_with_repository(blog, &client).await?;
    Ok(())
}

/// Generate the static site from any content repository
pub async fn run_with_repository(
    blog: &Blog,
    repo: &dyn ContentRepository,
) -> Result<GenerateSummary> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog)?;
    let summary = generator.generate(repo).await?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(summary)
}
