//! Generator module - builds page props from the content API and renders them
//!
//! The three props functions are what a page needs at build time:
//! the first listing page, one post by slug, and the set of slugs to
//! precompute. [`Generator`] turns those props into files.

use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tera::Context;

use crate::config::ListingConfig;
use crate::content::{
    normalize_detail, normalize_list_page, ContentError, ContentRepository, ContentResult,
    DetailPost, Ordering, PostPagination, Predicate, QueryOptions,
};
use crate::helpers::{html_escape, is_safe_slug, Helpers};
use crate::i18n::I18n;
use crate::richtext;
use crate::templates::{
    LabelsData, ListingData, PostCardData, PostPageData, SectionData, SiteData, TemplateRenderer,
};
use crate::Blog;

/// Custom type of blog posts
pub const POST_TYPE: &str = "post";

/// Largest page size the API accepts
const MAX_PAGE_SIZE: u32 = 100;

/// Fields projected for the listing
const LISTING_FIELDS: [&str; 4] = ["post.title", "post.content", "post.author", "post.subtitle"];

/// What happens to a slug that was not precomputed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Generate the page on first request
    Enabled,
    /// Unknown slugs are not found
    Disabled,
}

/// Slugs to precompute at build time
#[derive(Debug, Clone, PartialEq)]
pub struct StaticPaths {
    pub paths: Vec<String>,
    pub fallback: Fallback,
}

impl StaticPaths {
    pub fn contains(&self, slug: &str) -> bool {
        self.paths.iter().any(|p| p == slug)
    }
}

/// Initial props of the listing page: the first page of posts and its cursor
pub async fn generate_listing_page(
    repo: &dyn ContentRepository,
    listing: &ListingConfig,
) -> ContentResult<PostPagination> {
    let mut options = QueryOptions::new()
        .page_size(listing.page_size.max(1))
        .fetch(LISTING_FIELDS);
    match Ordering::parse(&listing.order_by) {
        Some(ordering) => options = options.order_by(ordering),
        None => tracing::warn!("Ignoring invalid ordering {:?}", listing.order_by),
    }

    let page = repo
        .query(&[Predicate::document_type(POST_TYPE)], &options)
        .await?;
    Ok(normalize_list_page(page))
}

/// Props of a post page; fails with `NotFound` for an unknown slug
pub async fn generate_detail_page(
    repo: &dyn ContentRepository,
    slug: &str,
) -> ContentResult<DetailPost> {
    let doc = repo.get_by_uid(POST_TYPE, slug).await?;
    Ok(normalize_detail(doc))
}

/// Every known post slug, with fallback generation for the rest
pub async fn enumerate_slugs(repo: &dyn ContentRepository) -> ContentResult<StaticPaths> {
    let options = QueryOptions::new()
        .order_by(Ordering::desc("my.post.date"))
        .page_size(MAX_PAGE_SIZE)
        .fetch(["post.uid"]);

    let mut page = repo
        .query(&[Predicate::document_type(POST_TYPE)], &options)
        .await?;
    let mut paths = Vec::new();

    loop {
        paths.extend(page.results.iter().filter_map(|doc| doc.uid.clone()));
        match page.next_page.take() {
            Some(url) => page = repo.fetch_page(&url).await?,
            None => break,
        }
    }

    Ok(StaticPaths {
        paths,
        fallback: Fallback::Enabled,
    })
}

/// Counts of one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub posts: usize,
    pub skipped: usize,
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    helpers: Helpers,
    i18n: I18n,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let mut i18n = I18n::with_builtin(&blog.config.language);
        i18n.load_languages(blog.base_dir.join(&blog.config.i18n_dir))?;

        Ok(Self {
            blog: blog.clone(),
            renderer,
            helpers: Helpers::new(blog.config.clone()),
            i18n,
        })
    }

    /// Generate the entire site
    pub async fn generate(&self, repo: &dyn ContentRepository) -> Result<GenerateSummary> {
        fs::create_dir_all(&self.blog.public_dir)?;

        // Listing page and its props
        let listing = generate_listing_page(repo, &self.blog.config.listing).await?;
        let html = self.render_listing(&listing)?;
        fs::write(self.blog.public_dir.join("index.html"), html)?;
        fs::write(
            self.blog.public_dir.join("posts.json"),
            serde_json::to_string_pretty(&listing)?,
        )?;
        tracing::info!(
            "Generated listing with {} posts (more: {})",
            listing.results.len(),
            listing.has_more()
        );

        // Post pages
        let paths = enumerate_slugs(repo).await?;
        let mut summary = GenerateSummary::default();

        for slug in &paths.paths {
            if !is_safe_slug(slug) {
                tracing::warn!("Skipping post with unsafe slug {:?}", slug);
                summary.skipped += 1;
                continue;
            }

            match generate_detail_page(repo, slug).await {
                Ok(post) => {
                    let html = self.render_post(&post)?;
                    let output_path = self.write_post(slug, &html)?;
                    tracing::debug!("Generated post: {:?}", output_path);
                    summary.posts += 1;
                }
                Err(ContentError::NotFound { .. }) => {
                    tracing::warn!("Post {} disappeared during generation, skipping", slug);
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Provisional page for slugs generated on demand
        if paths.fallback == Fallback::Enabled {
            let fallback_path = self.blog.public_dir.join("post").join("fallback.html");
            if let Some(parent) = fallback_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&fallback_path, self.render_fallback()?)?;
        }

        fs::write(
            self.blog.public_dir.join("404.html"),
            self.render_not_found()?,
        )?;

        tracing::info!(
            "Generated {} post pages ({} skipped)",
            summary.posts,
            summary.skipped
        );
        Ok(summary)
    }

    /// Write a rendered post page to `post/<slug>/index.html`
    pub fn write_post(&self, slug: &str, html: &str) -> Result<PathBuf> {
        if !is_safe_slug(slug) {
            anyhow::bail!("Refusing to write post with unsafe slug {:?}", slug);
        }
        let output_path = self
            .blog
            .public_dir
            .join("post")
            .join(slug)
            .join("index.html");
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        // Readers see the old page or the new one, never a partial write
        let parent = output_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("No parent for {:?}", output_path))?;
        let mut file = tempfile::NamedTempFile::new_in(parent)?;
        file.write_all(html.as_bytes())?;
        file.persist(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
        Ok(output_path)
    }

    /// Render the listing page
    pub fn render_listing(&self, listing: &PostPagination) -> Result<String> {
        let posts = listing
            .results
            .iter()
            .map(|post| PostCardData {
                path: self.helpers.post_url(post.uid.as_deref().unwrap_or("")),
                title: escape_opt(&post.data.title),
                subtitle: escape_opt(&post.data.subtitle),
                author: escape_opt(&post.data.author),
                date: html_escape(&self.helpers.date(post.first_publication_date.as_deref())),
                datetime: self
                    .helpers
                    .date_attr(post.first_publication_date.as_deref()),
            })
            .collect();

        let data = ListingData {
            posts,
            next_page: listing.next_page.as_deref().map(html_escape),
        };

        let mut context = self.create_base_context();
        context.insert("listing", &data);
        self.renderer.render("index.html", &context)
    }

    /// Render a post page
    pub fn render_post(&self, post: &DetailPost) -> Result<String> {
        let minutes = post.reading_minutes(self.blog.config.words_per_minute);
        let data = PostPageData {
            title: escape_opt(&post.data.title),
            subtitle: escape_opt(&post.data.subtitle),
            author: escape_opt(&post.data.author),
            date: html_escape(&self.helpers.date(post.first_publication_date.as_deref())),
            datetime: self.helpers.date_attr(post.first_publication_date.as_deref()),
            banner: post
                .data
                .banner
                .url
                .as_deref()
                .map(|url| {
                    let alt = self.i18n.get("banner_alt");
                    self.helpers.image_tag(url, Some(alt.as_str()), Some("banner"))
                })
                .unwrap_or_default(),
            reading_time: html_escape(&self.i18n.get_count("reading_time", minutes)),
            sections: post
                .data
                .content
                .iter()
                .map(|section| SectionData {
                    heading: section.heading.as_deref().map(html_escape),
                    html: richtext::as_html(&section.body),
                })
                .collect(),
        };

        let mut context = self.create_base_context();
        context.insert("post", &data);
        self.renderer.render("post.html", &context)
    }

    /// Render the provisional page shown while a post is generated
    pub fn render_fallback(&self) -> Result<String> {
        self.renderer
            .render("fallback.html", &self.create_base_context())
    }

    /// Render the page for unknown posts
    pub fn render_not_found(&self) -> Result<String> {
        self.renderer
            .render("not_found.html", &self.create_base_context())
    }

    /// Create a base context with common variables
    fn create_base_context(&self) -> Context {
        let config = &self.blog.config;
        let site = SiteData {
            title: html_escape(&config.title),
            description: html_escape(&config.description),
            language: html_escape(&config.language),
            root: html_escape(&self.helpers.url_for("")),
            generator: crate::helpers::meta_generator(),
        };
        let labels = LabelsData {
            load_more: html_escape(&self.i18n.get("load_more")),
            loading: html_escape(&self.i18n.get("loading")),
            not_found: html_escape(&self.i18n.get("not_found")),
            banner_alt: html_escape(&self.i18n.get("banner_alt")),
        };

        let mut context = Context::new();
        context.insert("site", &site);
        context.insert("labels", &labels);
        context
    }
}

fn escape_opt(value: &Option<String>) -> String {
    value.as_deref().map(html_escape).unwrap_or_default()
}
