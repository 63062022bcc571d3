//! Content repository client

use async_trait::async_trait;
use serde::Deserialize;

use super::document::{RawDocument, ResponsePage};
use super::error::{ContentError, ContentResult};
use super::query::{render_predicates, Predicate, QueryOptions};
use crate::config::ApiConfig;

/// Read access to a content repository.
///
/// Every call is a single round trip: no retry, no caching.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Search documents matching all predicates
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> ContentResult<ResponsePage>;

    /// Fetch one document by custom type and uid
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> ContentResult<RawDocument>;

    /// Fetch a page by the absolute `next_page` URL of a previous response
    async fn fetch_page(&self, url: &str) -> ContentResult<ResponsePage>;
}

/// API root document, only the parts needed to pick a ref
#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Prismic REST API v2 client
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    master_ref: String,
}

impl PrismicClient {
    /// Connect to the repository and resolve its master ref
    pub async fn connect(config: &ApiConfig) -> ContentResult<Self> {
        let http = build_http()?;
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(ContentError::NetworkFailure(
                "no API endpoint configured".to_string(),
            ));
        }

        let mut params = Vec::new();
        if let Some(token) = &config.access_token {
            params.push(("access_token", token.clone()));
        }
        let root: ApiRoot = get_json(&http, &endpoint, &params).await?;
        let master_ref = root
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| {
                ContentError::MalformedResponse("API root lists no master ref".to_string())
            })?;

        tracing::debug!("Connected to {} (ref {})", endpoint, master_ref);

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone(),
            master_ref,
        })
    }

    /// Build a client pinned to a known ref, skipping the API root lookup
    pub fn with_ref(config: &ApiConfig, reference: &str) -> ContentResult<Self> {
        Ok(Self {
            http: build_http()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            master_ref: reference.to_string(),
        })
    }

    /// The ref every query is made against
    pub fn master_ref(&self) -> &str {
        &self.master_ref
    }

    fn search_url(&self) -> String {
        format!("{}/documents/search", self.endpoint)
    }

    fn search_params(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![("ref", self.master_ref.clone())];
        if !predicates.is_empty() {
            params.push(("q", render_predicates(predicates)));
        }
        params.extend(options.to_params());
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }
        params
    }
}

#[async_trait]
impl ContentRepository for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> ContentResult<ResponsePage> {
        let params = self.search_params(predicates, options);
        tracing::debug!("Querying {} {:?}", self.search_url(), params);
        get_json(&self.http, &self.search_url(), &params).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> ContentResult<RawDocument> {
        let predicates = [
            Predicate::document_type(doc_type),
            Predicate::at(&format!("my.{}.uid", doc_type), uid),
        ];
        let options = QueryOptions::new().page_size(1);
        let page = self.query(&predicates, &options).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::not_found(doc_type, uid))
    }

    async fn fetch_page(&self, url: &str) -> ContentResult<ResponsePage> {
        tracing::debug!("Fetching page {}", url);
        get_json(&self.http, url, &[]).await
    }
}

fn build_http() -> ContentResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// GET a JSON body; transport and status errors are network failures,
/// anything serde rejects is a malformed response
async fn get_json<T>(
    http: &reqwest::Client,
    url: &str,
    params: &[(&'static str, String)],
) -> ContentResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut request = http.get(url);
    if !params.is_empty() {
        request = request.query(params);
    }
    let response = request.send().await?.error_for_status()?;
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
