//! List posts, loading further pages on demand

use anyhow::Result;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::content::{ContentRepository, ListPost};
use crate::generator::generate_listing_page;
use crate::helpers::Helpers;
use crate::pagination::{IncrementalList, LoadOutcome};
use crate::Blog;

/// List posts from the configured content API
///
/// With `all`, every page is fetched; otherwise Enter loads the next page
/// and any other input stops.
pub async fn run(blog: &Blog, all: bool) -> Result<()> {
    let client = Arc::new(blog.connect().await?);
    let input = (!all).then(|| BufReader::new(tokio::io::stdin()));
    list_posts(blog, client, &mut io::stdout(), input).await
}

/// Print the listing, reading a line from `input` before each further page
///
/// Without `input` every page is loaded. An empty line loads the next page;
/// anything else, or end of input, stops.
pub async fn list_posts<R, W, I>(
    blog: &Blog,
    repo: Arc<R>,
    out: &mut W,
    input: Option<I>,
) -> Result<()>
where
    R: ContentRepository + 'static,
    W: Write,
    I: AsyncBufRead + Unpin,
{
    let mut lines = input.map(|input| input.lines());
    let helpers = Helpers::new(blog.config.clone());
    let initial = generate_listing_page(repo.as_ref(), &blog.config.listing).await?;
    let list = IncrementalList::new(repo, initial);

    let mut printed = 0;
    loop {
        let posts = list.posts();
        for post in &posts[printed..] {
            writeln!(out, "{}", format_post(&helpers, post))?;
        }
        printed = posts.len();

        if !list.has_more() {
            break;
        }
        if let Some(lines) = lines.as_mut() {
            write!(out, "-- load more? [Enter] ")?;
            out.flush()?;
            match lines.next_line().await? {
                Some(line) if line.trim().is_empty() => {}
                _ => break,
            }
        }
        match list.load_more().await? {
            LoadOutcome::Loaded(count) => tracing::debug!("Loaded {} more posts", count),
            LoadOutcome::Exhausted => break,
            LoadOutcome::Busy | LoadOutcome::Discarded => continue,
        }
    }

    writeln!(out, "Posts ({}):", printed)?;
    Ok(())
}

fn format_post(helpers: &Helpers, post: &ListPost) -> String {
    let date = helpers.date(post.first_publication_date.as_deref());
    format!(
        "  {} - {} [{}]",
        if date.is_empty() { "-".to_string() } else { date },
        post.data.title.as_deref().unwrap_or("(untitled)"),
        post.uid.as_deref().unwrap_or("")
    )
}
