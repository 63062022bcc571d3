//! Development server with on-demand post generation
//!
//! A post page that was not generated at build time is answered with the
//! fallback page while a background task fetches and writes it. The
//! fallback page refreshes itself until the real page is on disk.

use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    Router,
};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::{ContentError, ContentRepository};
use crate::generator::{generate_detail_page, Fallback, Generator};
use crate::helpers::is_safe_slug;
use crate::Blog;

/// Server state
struct ServerState {
    blog: Blog,
    generator: Generator,
    repo: Arc<dyn ContentRepository>,
    fallback: Fallback,
    /// Slugs with a generation task running
    generating: Mutex<HashSet<String>>,
    /// Outcome of the last failed generation per slug, reported once
    failures: Mutex<HashMap<String, StatusCode>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Build the router serving `public_dir`
pub fn router(
    blog: &Blog,
    repo: Arc<dyn ContentRepository>,
    fallback: Fallback,
) -> Result<Router> {
    let state = Arc::new(ServerState {
        blog: blog.clone(),
        generator: Generator::new(blog)?,
        repo,
        fallback,
        generating: Mutex::new(HashSet::new()),
        failures: Mutex::new(HashMap::new()),
    });

    Ok(Router::new()
        .fallback(fallback_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http()))
}

/// Start the development server
pub async fn start(
    blog: &Blog,
    repo: Arc<dyn ContentRepository>,
    fallback: Fallback,
    ip: &str,
    port: u16,
) -> Result<()> {
    let app = router(blog, repo, fallback)?;

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if fallback == Fallback::Enabled {
        println!("Unknown posts are generated on first request.");
    }
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Slug of a `/post/{slug}` route
fn post_slug(path: &str) -> Option<String> {
    let rest = path.strip_prefix("/post/")?.trim_end_matches('/');
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    percent_encoding::percent_decode_str(rest)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Serve generated files, generating missing posts on demand
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();

    if let Some(slug) = post_slug(&path) {
        if !is_safe_slug(&slug) {
            return not_found(&state).await;
        }
        let target = state.blog.public_dir.join("post").join(&slug);
        if !target.is_file() && !target.join("index.html").exists() {
            return generate_on_demand(&state, slug).await;
        }
    }

    let mut service = ServeDir::new(&state.blog.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => not_found(&state).await,
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Answer a post that is not on disk yet
async fn generate_on_demand(state: &Arc<ServerState>, slug: String) -> Response {
    if state.fallback == Fallback::Disabled {
        return not_found(state).await;
    }

    let failure = lock(&state.failures).remove(&slug);
    if let Some(status) = failure {
        if status == StatusCode::NOT_FOUND {
            return not_found(state).await;
        }
        let message = if status == StatusCode::BAD_GATEWAY {
            "Content API unavailable"
        } else {
            "Server error"
        };
        return (status, message).into_response();
    }

    if lock(&state.generating).insert(slug.clone()) {
        tracing::info!("Generating post {} on demand", slug);
        let state = Arc::clone(state);
        tokio::spawn(async move {
            if let Err(status) = generate_post(&state, &slug).await {
                lock(&state.failures).insert(slug.clone(), status);
            }
            lock(&state.generating).remove(&slug);
        });
    }

    fallback_page(state).await
}

/// Fetch, render and store one post
async fn generate_post(state: &ServerState, slug: &str) -> Result<(), StatusCode> {
    let post = match generate_detail_page(state.repo.as_ref(), slug).await {
        Ok(post) => post,
        Err(ContentError::NotFound { .. }) => {
            tracing::info!("Post {} does not exist", slug);
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            tracing::error!("Failed to generate post {}: {}", slug, e);
            return Err(StatusCode::BAD_GATEWAY);
        }
    };

    let stored = state
        .generator
        .render_post(&post)
        .and_then(|html| state.generator.write_post(slug, &html));
    match stored {
        Ok(path) => {
            tracing::debug!("Generated post: {:?}", path);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to store post {}: {}", slug, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn fallback_page(state: &ServerState) -> Response {
    let path = state.blog.public_dir.join("post").join("fallback.html");
    let html = match tokio::fs::read_to_string(path).await {
        Ok(html) => html,
        Err(_) => state.generator.render_fallback().unwrap_or_default(),
    };
    ([(header::CACHE_CONTROL, "no-store")], Html(html)).into_response()
}

async fn not_found(state: &ServerState) -> Response {
    let html = match tokio::fs::read_to_string(state.blog.public_dir.join("404.html")).await {
        Ok(html) => html,
        Err(_) => state.generator.render_not_found().unwrap_or_default(),
    };
    (StatusCode::NOT_FOUND, Html(html)).into_response()
}
