use serde::{Deserialize, Serialize};

pub const DEFAULT_SEARCH_QUERY: &str = "synthwave";
pub const DEFAULT_COLLECTION_NAME: &str = "My Favorites";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Photo,
    Video,
    Illustration,
    Icon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetSource {
    Pixabay,
    Pexels,
    Unsplash,
    #[serde(rename = "AI")]
    Ai,
}

/// A single discoverable media item. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    #[serde(rename = "previewURL")]
    pub preview_url: String,
    #[serde(rename = "largeImageURL")]
    pub large_image_url: String,
    pub author: String,
    pub source: AssetSource,
    pub license: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
}

impl Asset {
    /// Case-insensitive substring match against any tag.
    pub fn has_tag_containing(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub asset_ids: Vec<String>,
}

impl Collection {
    pub fn contains(&self, asset_id: &str) -> bool {
        self.asset_ids.iter().any(|id| id == asset_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Photo,
    Illustration,
    Video,
    Icon,
}

impl TypeFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Photo => "photo",
            Self::Illustration => "illustration",
            Self::Video => "video",
            Self::Icon => "icon",
        }
    }

    pub fn matches(self, asset_type: AssetType) -> bool {
        match self {
            Self::All => true,
            Self::Photo => asset_type == AssetType::Photo,
            Self::Illustration => asset_type == AssetType::Illustration,
            Self::Video => asset_type == AssetType::Video,
            Self::Icon => asset_type == AssetType::Icon,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    All,
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

/// Transient search filters. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(rename = "type", default)]
    pub type_filter: TypeFilter,
    #[serde(default)]
    pub orientation: Orientation,
}

impl FilterOptions {
    pub fn new(type_filter: TypeFilter, orientation: Orientation) -> Self {
        Self {
            type_filter,
            orientation,
        }
    }

    /// Initial filters of the search view.
    pub fn app_default() -> Self {
        Self::new(TypeFilter::Photo, Orientation::All)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub assets: Vec<Asset>,
    pub has_more: bool,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiProviderAccount {
    pub id: String,
    pub name: String,
    pub api_key: Option<String>,
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProviderAccount {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    pub provider_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Body of every non-2xx backend response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_uses_camel_case_url_wire_names() {
        let raw = r#"{
            "id": "3139371",
            "type": "photo",
            "previewURL": "p.jpg",
            "largeImageURL": "l.jpg",
            "author": "KELLEPICS",
            "source": "Pixabay",
            "license": "Pixabay License",
            "tags": ["fantasy", "Synthwave"],
            "downloadURL": "d"
        }"#;
        let asset: Asset = serde_json::from_str(raw).unwrap();
        assert_eq!(asset.asset_type, AssetType::Photo);
        assert_eq!(asset.preview_url, "p.jpg");
        assert!(asset.has_tag_containing("synth"));

        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["largeImageURL"], "l.jpg");
        assert_eq!(json["type"], "photo");
    }

    #[test]
    fn ai_source_and_aspect_ratios_serialize_like_the_frontend() {
        assert_eq!(serde_json::to_string(&AssetSource::Ai).unwrap(), "\"AI\"");
        assert_eq!(
            serde_json::to_string(&AspectRatio::Portrait).unwrap(),
            "\"9:16\""
        );
        let filters: FilterOptions =
            serde_json::from_str(r#"{"type":"icon","orientation":"vertical"}"#).unwrap();
        assert_eq!(filters, FilterOptions::new(TypeFilter::Icon, Orientation::Vertical));
    }

    #[test]
    fn collection_membership_lookup() {
        let collection = Collection {
            id: "c1".into(),
            name: "Moodboard".into(),
            asset_ids: vec!["a".into(), "b".into()],
        };
        assert!(collection.contains("b"));
        assert!(!collection.contains("c"));
    }
}
