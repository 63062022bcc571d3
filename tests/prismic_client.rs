//! Prismic client against a local stub of the REST API

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::{json, Value};

use spacetraveling::config::{ApiConfig, ListingConfig};
use spacetraveling::content::{ContentError, ContentRepository, PrismicClient};
use spacetraveling::generator::{enumerate_slugs, generate_detail_page, generate_listing_page};
use spacetraveling::pagination::{IncrementalList, LoadOutcome};

const MASTER_REF: &str = "YGvB5BIAACIAyZ6k";

struct Stub {
    base: String,
    posts: Vec<Value>,
}

fn post(uid: &str, date: &str, title: &str) -> Value {
    json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "post",
        "tags": [],
        "first_publication_date": format!("{}T19:25:28+0000", date),
        "last_publication_date": format!("{}T19:25:28+0000", date),
        "lang": "pt-br",
        "data": {
            "title": title,
            "subtitle": "Pensando em sincronização em vez de ciclos de vida",
            "author": "Joseph Oliveira",
            "banner": { "url": "https://images.prismic.io/banner.png", "alt": null },
            "date": date,
            "content": [{
                "heading": "Proin et varius",
                "body": [{ "type": "paragraph", "text": "Lorem ipsum dolor sit amet", "spans": [] }]
            }]
        }
    })
}

async fn api_root() -> impl IntoResponse {
    Json(json!({
        "refs": [
            { "id": "master", "ref": MASTER_REF, "label": "Master", "isMasterRef": true }
        ],
        "types": { "post": "Post" }
    }))
}

async fn search(
    State(stub): State<Arc<Stub>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if params.get("ref").map(String::as_str) != Some(MASTER_REF) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad ref" })));
    }

    let q = params.get("q").cloned().unwrap_or_default();
    let matched: Vec<&Value> = stub
        .posts
        .iter()
        .filter(|doc| {
            !q.contains("my.post.uid") || q.contains(&format!("\"{}\"", doc["uid"].as_str().unwrap()))
        })
        .collect();

    let size: usize = params
        .get("pageSize")
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);
    let page: usize = params.get("page").and_then(|s| s.parse().ok()).unwrap_or(1);
    let total_pages = matched.len().div_ceil(size);
    let results: Vec<&Value> = matched.iter().skip((page - 1) * size).take(size).copied().collect();

    let next_page = (page < total_pages).then(|| {
        format!(
            "{}/api/v2/documents/search?ref={}&q={}&pageSize={}&page={}",
            stub.base,
            MASTER_REF,
            utf8_percent_encode(&q, NON_ALPHANUMERIC),
            size,
            page + 1
        )
    });

    (
        StatusCode::OK,
        Json(json!({
            "page": page,
            "results_per_page": size,
            "results_size": results.len(),
            "total_results_size": matched.len(),
            "total_pages": total_pages,
            "next_page": next_page,
            "prev_page": null,
            "results": results,
        })),
    )
}

async fn broken_search() -> impl IntoResponse {
    Json(json!({ "page": 1, "results": "not a list" }))
}

async fn start_stub(posts: Vec<Value>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let stub = Arc::new(Stub {
        base: base.clone(),
        posts,
    });

    let app = Router::new()
        .route("/api/v2", get(api_root))
        .route("/api/v2/documents/search", get(search))
        .route("/broken/api/v2", get(api_root))
        .route("/broken/api/v2/documents/search", get(broken_search))
        .with_state(stub);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

fn fixture() -> Vec<Value> {
    vec![
        post("como-utilizar-hooks", "2021-03-15", "Como utilizar Hooks"),
        post("criando-um-app-cra-do-zero", "2021-03-25", "Criando um app CRA do zero"),
        post("mapas-com-react", "2021-04-01", "Mapas com React"),
    ]
}

fn api(base: &str) -> ApiConfig {
    ApiConfig {
        endpoint: format!("{}/api/v2", base),
        access_token: None,
    }
}

#[tokio::test]
async fn test_connect_resolves_master_ref() {
    let base = start_stub(fixture()).await;
    let client = PrismicClient::connect(&api(&base)).await.unwrap();
    assert_eq!(client.master_ref(), MASTER_REF);
}

#[tokio::test]
async fn test_listing_and_load_more() {
    let base = start_stub(fixture()).await;
    let client = Arc::new(PrismicClient::connect(&api(&base)).await.unwrap());

    let initial = generate_listing_page(client.as_ref(), &ListingConfig::default())
        .await
        .unwrap();
    assert_eq!(initial.results.len(), 1);
    assert!(initial.next_page.is_some());

    let list = IncrementalList::new(client, initial);
    assert_eq!(list.load_more().await.unwrap(), LoadOutcome::Loaded(1));
    assert_eq!(list.load_more().await.unwrap(), LoadOutcome::Loaded(1));
    assert_eq!(list.load_more().await.unwrap(), LoadOutcome::Exhausted);
    assert_eq!(list.posts().len(), 3);
}

#[tokio::test]
async fn test_enumerate_and_detail() {
    let base = start_stub(fixture()).await;
    let client = PrismicClient::connect(&api(&base)).await.unwrap();

    let paths = enumerate_slugs(&client).await.unwrap();
    assert_eq!(paths.paths.len(), 3);
    assert!(paths.contains("mapas-com-react"));

    let post = generate_detail_page(&client, "como-utilizar-hooks")
        .await
        .unwrap();
    assert_eq!(post.data.title.as_deref(), Some("Como utilizar Hooks"));
    assert_eq!(
        post.data.banner.url.as_deref(),
        Some("https://images.prismic.io/banner.png")
    );
    assert_eq!(post.data.content.len(), 1);
}

#[tokio::test]
async fn test_missing_slug_is_not_found() {
    let base = start_stub(fixture()).await;
    let client = PrismicClient::connect(&api(&base)).await.unwrap();

    let err = generate_detail_page(&client, "missing-slug")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_stale_ref_is_network_failure() {
    let base = start_stub(fixture()).await;
    let client = PrismicClient::with_ref(&api(&base), "old-ref").unwrap();

    let err = client.get_by_uid("post", "como-utilizar-hooks").await.unwrap_err();
    assert!(matches!(err, ContentError::NetworkFailure(_)));
}

#[tokio::test]
async fn test_mistyped_results_are_malformed() {
    let base = start_stub(fixture()).await;
    let client = PrismicClient::connect(&ApiConfig {
        endpoint: format!("{}/broken/api/v2", base),
        access_token: None,
    })
    .await
    .unwrap();

    let err = generate_listing_page(&client, &ListingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = PrismicClient::connect(&api(&format!("http://{}", addr)))
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::NetworkFailure(_)));
}
