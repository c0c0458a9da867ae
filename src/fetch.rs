//! Asset search and suggestion clients.
//!
//! `HttpAssetClient` is the client-side view of the companion backend. The
//! backend itself answers with `PixabayClient` or `SampleCatalog`.

use crate::error::{GalleryError, GalleryResult};
use crate::model::{Asset, ErrorBody, FilterOptions, SearchPage};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub(crate) const HTTP_TIMEOUT_SECS: u64 = 20;
pub(crate) const HTTP_CONNECT_TIMEOUT_SECS: u64 = 4;
const GALLERY_USER_AGENT: &str = concat!("AssetGallery/", env!("CARGO_PKG_VERSION"));

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetFetchClient: Send + Sync {
    /// One page of results. `page` starts at 1. An empty query is allowed.
    async fn search(
        &self,
        query: &str,
        filters: FilterOptions,
        page: u32,
    ) -> GalleryResult<SearchPage>;

    /// Query completions. A blank query yields an empty list, never an error.
    async fn suggestions(&self, query: &str) -> GalleryResult<Vec<String>>;
}

pub(crate) fn build_http_client(timeout_secs: u64) -> GalleryResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .user_agent(GALLERY_USER_AGENT)
        .build()?;
    Ok(client)
}

/// Turns a non-2xx response into a `Provider` error, preferring the
/// backend's `{message}` body over the bare status text.
pub(crate) async fn provider_error(response: reqwest::Response) -> GalleryError {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("unexpected response")
        .to_string();
    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorBody>(&body)
            .map(|parsed| parsed.message)
            .unwrap_or(fallback),
        Err(err) => {
            tracing::warn!("failed to read error body: {}", err);
            fallback
        }
    };
    GalleryError::provider(status.as_u16(), message)
}

/// Search responses come in the paged shape or as a bare asset list from
/// older backends.
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Paged(SearchPage),
    Legacy(Vec<Asset>),
}

impl From<SearchResponse> for SearchPage {
    fn from(response: SearchResponse) -> Self {
        match response {
            SearchResponse::Paged(page) => page,
            SearchResponse::Legacy(assets) => SearchPage {
                assets,
                has_more: false,
            },
        }
    }
}

pub struct HttpAssetClient {
    http: reqwest::Client,
    api_base: Url,
}

impl HttpAssetClient {
    pub fn new(api_base: Url) -> GalleryResult<Self> {
        Ok(Self {
            http: build_http_client(HTTP_TIMEOUT_SECS)?,
            api_base,
        })
    }

    fn endpoint(&self, path: &str) -> GalleryResult<Url> {
        Ok(self.api_base.join(path)?)
    }
}

#[async_trait]
impl AssetFetchClient for HttpAssetClient {
    async fn search(
        &self,
        query: &str,
        filters: FilterOptions,
        page: u32,
    ) -> GalleryResult<SearchPage> {
        let url = self.endpoint("/api/search")?;
        let page_param = page.max(1).to_string();
        tracing::debug!(query, page, "searching assets");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .query(&[
                ("q", query),
                ("type", filters.type_filter.as_str()),
                ("orientation", filters.orientation.as_str()),
                ("page", page_param.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }
        let body: SearchResponse = response.json().await?;
        Ok(body.into())
    }

    async fn suggestions(&self, query: &str) -> GalleryResult<Vec<String>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint("/api/suggestions")?;
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .query(&[("q", query)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }
        Ok(response.json().await?)
    }
}
