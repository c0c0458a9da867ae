//! Built-in catalog served when no Pixabay key is configured.

use crate::error::GalleryResult;
use crate::fetch::AssetFetchClient;
use crate::model::{Asset, AssetSource, AssetType, FilterOptions, SearchPage};
use async_trait::async_trait;

pub const SAMPLE_PAGE_SIZE: usize = 30;

const SAMPLE_SUGGESTIONS: [&str; 11] = [
    "synthwave",
    "retro",
    "80s",
    "neon",
    "futuristic",
    "cyberpunk",
    "galaxy",
    "nature",
    "vintage car",
    "abstract",
    "landscape",
];

// (id, type, preview, large, author, tags, download)
const SAMPLE_ASSETS: [(&str, AssetType, &str, &str, &str, &[&str], &str); 9] = [
    (
        "3139371",
        AssetType::Photo,
        "https://cdn.pixabay.com/photo/2018/02/08/22/27/fantasy-3139371_150.jpg",
        "https://cdn.pixabay.com/photo/2018/02/08/22/27/fantasy-3139371_1280.jpg",
        "KELLEPICS",
        &["fantasy", "city", "futuristic", "synthwave", "neon"],
        "https://pixabay.com/photos/fantasy-3139371/",
    ),
    (
        "5044810",
        AssetType::Illustration,
        "https://cdn.pixabay.com/photo/2020/04/13/20/01/background-5044810_150.jpg",
        "https://cdn.pixabay.com/photo/2020/04/13/20/01/background-5044810_1280.jpg",
        "u_d83d1162",
        &["background", "retro", "80s", "synthwave"],
        "https://pixabay.com/illustrations/background-5044810/",
    ),
    (
        "2675031",
        AssetType::Photo,
        "https://cdn.pixabay.com/photo/2017/08/20/10/44/volkswagen-2675031_150.jpg",
        "https://cdn.pixabay.com/photo/2017/08/20/10/44/volkswagen-2675031_1280.jpg",
        "27707",
        &["volkswagen", "car", "retro", "vintage"],
        "https://pixabay.com/photos/volkswagen-2675031/",
    ),
    (
        "1867616",
        AssetType::Photo,
        "https://cdn.pixabay.com/photo/2016/11/29/05/45/astronomy-1867616_150.jpg",
        "https://cdn.pixabay.com/photo/2016/11/29/05/45/astronomy-1867616_1280.jpg",
        "Pixabay",
        &["milky way", "galaxy", "space", "stars"],
        "https://pixabay.com/photos/astronomy-1867616/",
    ),
    (
        "4369793",
        AssetType::Photo,
        "https://cdn.pixabay.com/photo/2019/07/28/21/42/vhs-4369793_150.jpg",
        "https://cdn.pixabay.com/photo/2019/07/28/21/42/vhs-4369793_1280.jpg",
        "felix_w",
        &["vhs", "retro", "80s", "cassette"],
        "https://pixabay.com/photos/vhs-4369793/",
    ),
    (
        "video-8210",
        AssetType::Video,
        "https://cdn.pixabay.com/vimeo/169993951/sea-8210_150.jpg",
        "https://cdn.pixabay.com/vimeo/169993951/sea-8210_1280.jpg",
        "SeaStock",
        &["sea", "waves", "beach", "video"],
        "https://pixabay.com/videos/sea-8210/",
    ),
    (
        "icon-27633",
        AssetType::Icon,
        "https://cdn.pixabay.com/photo/2013/07/12/12/33/cancel-145890_150.png",
        "https://cdn.pixabay.com/photo/2013/07/12/12/33/cancel-145890_1280.png",
        "OpenClipart-Vectors",
        &["cancel", "close", "icon", "x"],
        "https://pixabay.com/vectors/cancel-27633/",
    ),
    (
        "video-22774",
        AssetType::Video,
        "https://cdn.pixabay.com/vimeo/240113653/trees-22774_150.jpg",
        "https://cdn.pixabay.com/vimeo/240113653/trees-22774_1280.jpg",
        "Motion-Design",
        &["trees", "fog", "forest", "video"],
        "https://pixabay.com/videos/trees-22774/",
    ),
    (
        "icon-304623",
        AssetType::Icon,
        "https://cdn.pixabay.com/photo/2014/04/02/10/24/attention-303861_150.png",
        "https://cdn.pixabay.com/photo/2014/04/02/10/24/attention-303861_1280.png",
        "OpenClipart-Vectors",
        &["attention", "warning", "icon", "sign"],
        "https://pixabay.com/vectors/attention-304623/",
    ),
];

/// In-process catalog with tag-substring search. Orientation is not
/// modelled by the sample data and is ignored.
#[derive(Debug, Clone)]
pub struct SampleCatalog {
    assets: Vec<Asset>,
    suggestions: Vec<String>,
    page_size: usize,
}

impl Default for SampleCatalog {
    fn default() -> Self {
        let assets = SAMPLE_ASSETS
            .iter()
            .map(|(id, asset_type, preview, large, author, tags, download)| Asset {
                id: id.to_string(),
                asset_type: *asset_type,
                preview_url: preview.to_string(),
                large_image_url: large.to_string(),
                author: author.to_string(),
                source: AssetSource::Pixabay,
                license: "Pixabay License".to_string(),
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
                download_url: download.to_string(),
            })
            .collect();
        Self {
            assets,
            suggestions: SAMPLE_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            page_size: SAMPLE_PAGE_SIZE,
        }
    }
}

impl SampleCatalog {
    pub fn new(assets: Vec<Asset>, suggestions: Vec<String>, page_size: usize) -> Self {
        Self {
            assets,
            suggestions,
            page_size: page_size.max(1),
        }
    }

    pub fn matching(&self, query: &str, filters: FilterOptions) -> Vec<&Asset> {
        let query = query.trim();
        self.assets
            .iter()
            .filter(|asset| filters.type_filter.matches(asset.asset_type))
            .filter(|asset| query.is_empty() || asset.has_tag_containing(query))
            .collect()
    }

    pub fn page(&self, query: &str, filters: FilterOptions, page: u32) -> SearchPage {
        let matches = self.matching(query, filters);
        let page_index = page.max(1) as usize - 1;
        let start = page_index.saturating_mul(self.page_size).min(matches.len());
        let end = start.saturating_add(self.page_size).min(matches.len());
        SearchPage {
            assets: matches[start..end].iter().map(|asset| (*asset).clone()).collect(),
            has_more: end < matches.len(),
        }
    }

    pub fn suggest(&self, query: &str) -> Vec<String> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.suggestions
            .iter()
            .filter(|s| s.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AssetFetchClient for SampleCatalog {
    async fn search(
        &self,
        query: &str,
        filters: FilterOptions,
        page: u32,
    ) -> GalleryResult<SearchPage> {
        Ok(self.page(query, filters, page))
    }

    async fn suggestions(&self, query: &str) -> GalleryResult<Vec<String>> {
        Ok(self.suggest(query))
    }
}
