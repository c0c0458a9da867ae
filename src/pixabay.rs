use crate::error::{GalleryError, GalleryResult};
use crate::fetch::{build_http_client, AssetFetchClient, HTTP_TIMEOUT_SECS};
use crate::model::{
    Asset, AssetSource, AssetType, FilterOptions, Orientation, SearchPage, TypeFilter,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

const PIXABAY_API_BASE: &str = "https://pixabay.com/api/";
const PIXABAY_LICENSE: &str = "Pixabay License";
pub const PIXABAY_PAGE_SIZE: u32 = 30;
const SUGGESTION_HITS: u32 = 10;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    total_hits: u64,
    #[serde(default)]
    hits: Vec<ImageHit>,
}

#[derive(Deserialize)]
struct ImageHit {
    id: u64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "webformatURL", default)]
    webformat_url: String,
    #[serde(rename = "largeImageURL", default)]
    large_image_url: String,
    #[serde(rename = "pageURL", default)]
    page_url: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    tags: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    #[serde(default)]
    total_hits: u64,
    #[serde(default)]
    hits: Vec<VideoHit>,
}

#[derive(Deserialize)]
struct VideoHit {
    id: u64,
    #[serde(rename = "pageURL", default)]
    page_url: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    videos: VideoRenditions,
}

#[derive(Deserialize, Default)]
struct VideoRenditions {
    large: Option<VideoRendition>,
    medium: Option<VideoRendition>,
    small: Option<VideoRendition>,
}

#[derive(Deserialize)]
struct VideoRendition {
    #[serde(default)]
    url: String,
    #[serde(default)]
    thumbnail: Option<String>,
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_image_type(kind: &str) -> AssetType {
    match kind {
        "illustration" => AssetType::Illustration,
        "film" => AssetType::Video,
        kind if kind.starts_with("vector") => AssetType::Icon,
        _ => AssetType::Photo,
    }
}

fn normalize_image_hit(hit: ImageHit) -> Asset {
    Asset {
        id: hit.id.to_string(),
        asset_type: normalize_image_type(&hit.kind),
        preview_url: hit.webformat_url,
        large_image_url: hit.large_image_url,
        author: hit.user,
        source: AssetSource::Pixabay,
        license: PIXABAY_LICENSE.to_string(),
        tags: split_tags(&hit.tags),
        download_url: hit.page_url,
    }
}

fn normalize_video_hit(hit: VideoHit) -> Asset {
    let renditions = [
        hit.videos.large.as_ref(),
        hit.videos.medium.as_ref(),
        hit.videos.small.as_ref(),
    ];
    let best_url = renditions
        .iter()
        .flatten()
        .map(|r| r.url.as_str())
        .find(|url| !url.is_empty())
        .unwrap_or_default()
        .to_string();
    let thumbnail = renditions
        .iter()
        .flatten()
        .filter_map(|r| r.thumbnail.as_deref())
        .find(|thumb| !thumb.is_empty())
        .unwrap_or_default()
        .to_string();
    Asset {
        id: format!("video-{}", hit.id),
        asset_type: AssetType::Video,
        preview_url: thumbnail,
        large_image_url: best_url,
        author: hit.user,
        source: AssetSource::Pixabay,
        license: PIXABAY_LICENSE.to_string(),
        tags: split_tags(&hit.tags),
        download_url: hit.page_url,
    }
}

fn has_more_pages(page: u32, page_size: u32, total_hits: u64) -> bool {
    u64::from(page) * u64::from(page_size) < total_hits
}

/// Pixabay `image_type` for a type filter. Icons are Pixabay vectors.
fn image_type_param(filter: TypeFilter) -> &'static str {
    match filter {
        TypeFilter::All => "all",
        TypeFilter::Photo => "photo",
        TypeFilter::Illustration => "illustration",
        TypeFilter::Icon => "vector",
        TypeFilter::Video => "all",
    }
}

pub struct PixabayClient {
    http: reqwest::Client,
    api_key: String,
    image_api: Url,
    video_api: Url,
}

impl PixabayClient {
    pub fn new(api_key: impl Into<String>) -> GalleryResult<Self> {
        Self::with_api_base(api_key, Url::parse(PIXABAY_API_BASE)?)
    }

    /// `api_base` is the image endpoint; videos live under `videos/` below it.
    pub fn with_api_base(api_key: impl Into<String>, api_base: Url) -> GalleryResult<Self> {
        Ok(Self {
            http: build_http_client(HTTP_TIMEOUT_SECS)?,
            api_key: api_key.into(),
            video_api: api_base.join("videos/")?,
            image_api: api_base,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> GalleryResult<T> {
        let response = self
            .http
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            // Pixabay answers errors as plain text, e.g. "[ERROR 400] ..."
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                format!("Pixabay API error: {}", status)
            } else {
                format!("Pixabay API error: {}", body.trim())
            };
            return Err(GalleryError::provider(status.as_u16(), message));
        }
        Ok(response.json().await?)
    }

    async fn search_videos(
        &self,
        query: &str,
        page: u32,
        filters: FilterOptions,
    ) -> GalleryResult<SearchPage> {
        if filters.orientation != Orientation::All {
            tracing::debug!("orientation filter is not supported by the video endpoint");
        }
        let params = [
            ("q", query.to_string()),
            ("page", page.to_string()),
            ("per_page", PIXABAY_PAGE_SIZE.to_string()),
            ("safesearch", "true".to_string()),
        ];
        let body: VideoResponse = self.get_json(self.video_api.clone(), &params).await?;
        Ok(SearchPage {
            has_more: has_more_pages(page, PIXABAY_PAGE_SIZE, body.total_hits),
            assets: body.hits.into_iter().map(normalize_video_hit).collect(),
        })
    }
}

#[async_trait]
impl AssetFetchClient for PixabayClient {
    async fn search(
        &self,
        query: &str,
        filters: FilterOptions,
        page: u32,
    ) -> GalleryResult<SearchPage> {
        let page = page.max(1);
        tracing::info!(query, page, filter = filters.type_filter.as_str(), "pixabay search");
        if filters.type_filter == TypeFilter::Video {
            return self.search_videos(query, page, filters).await;
        }
        let params = [
            ("q", query.to_string()),
            ("image_type", image_type_param(filters.type_filter).to_string()),
            ("orientation", filters.orientation.as_str().to_string()),
            ("page", page.to_string()),
            ("per_page", PIXABAY_PAGE_SIZE.to_string()),
            ("safesearch", "true".to_string()),
        ];
        let body: ImageResponse = self.get_json(self.image_api.clone(), &params).await?;
        Ok(SearchPage {
            has_more: has_more_pages(page, PIXABAY_PAGE_SIZE, body.total_hits),
            assets: body.hits.into_iter().map(normalize_image_hit).collect(),
        })
    }

    async fn suggestions(&self, query: &str) -> GalleryResult<Vec<String>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let params = [
            ("q", query.to_string()),
            ("per_page", SUGGESTION_HITS.to_string()),
        ];
        let body: ImageResponse = self.get_json(self.image_api.clone(), &params).await?;
        Ok(distinct_tags(body.hits.iter().map(|hit| hit.tags.as_str())))
    }
}

/// Distinct trimmed tags in first-seen order.
fn distinct_tags<'a>(raw_tag_lists: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for raw in raw_tag_lists {
        for tag in split_tags(raw) {
            if seen.insert(tag.clone()) {
                tags.push(tag);
            }
        }
    }
    tags
}
