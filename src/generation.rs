//! Backend side of AI generation: linked provider accounts and dispatch to
//! the selected provider.

use crate::ai::AiGenerationClient;
use crate::error::{GalleryError, GalleryResult};
use crate::fetch::build_http_client;
use crate::model::{
    AiProviderAccount, AspectRatio, Asset, AssetSource, AssetType, NewProviderAccount,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;
use uuid::Uuid;

pub const GEMINI_PROVIDER_ID: &str = "gemini-default";

const IMAGEN_MODEL: &str = "imagen-4.0-generate-001";
const IMAGEN_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models/";
const IMAGEN_TIMEOUT_SECS: u64 = 120;
const PROMPT_TAG_CHARS: usize = 50;
const MOCK_PREVIEW_BASE: &str = "https://source.unsplash.com/random/400x300";
const MOCK_LARGE_BASE: &str = "https://source.unsplash.com/random/800x600";

fn seed_accounts() -> Vec<AiProviderAccount> {
    vec![
        AiProviderAccount {
            id: GEMINI_PROVIDER_ID.to_string(),
            name: "Gemini AI".to_string(),
            api_key: None,
            is_default: true,
            description: Some("Google's powerful AI model.".to_string()),
        },
        AiProviderAccount {
            id: "dalle-mock".to_string(),
            name: "DALL-E (Mock)".to_string(),
            api_key: Some("mock-key".to_string()),
            is_default: false,
            description: Some("A mock provider simulating DALL-E.".to_string()),
        },
        AiProviderAccount {
            id: "stable-diffusion-mock".to_string(),
            name: "Stable Diffusion (Mock)".to_string(),
            api_key: Some("mock-key".to_string()),
            is_default: false,
            description: Some("A mock provider simulating Stable Diffusion.".to_string()),
        },
    ]
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

/// Lowercase ASCII words joined by `-`, so ids never need escaping in a
/// URL path.
fn slugify(name: &str) -> String {
    let slug = name
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "provider".to_string()
    } else {
        slug
    }
}

/// Linked AI provider accounts. Lives for the whole backend process and is
/// shared by the request handlers.
pub struct ProviderRegistry {
    accounts: Mutex<Vec<AiProviderAccount>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_accounts(seed_accounts())
    }
}

impl ProviderRegistry {
    pub fn with_accounts(accounts: Vec<AiProviderAccount>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
        }
    }

    // The list is always left consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<AiProviderAccount>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn list(&self) -> Vec<AiProviderAccount> {
        self.lock().clone()
    }

    pub fn find(&self, provider_id: &str) -> Option<AiProviderAccount> {
        self.lock()
            .iter()
            .find(|account| account.id == provider_id)
            .cloned()
    }

    pub fn add(&self, new_account: NewProviderAccount) -> GalleryResult<AiProviderAccount> {
        let name = new_account.name.trim();
        if name.is_empty() {
            return Err(GalleryError::Validation(
                "Provider name is required.".to_string(),
            ));
        }

        let mut accounts = self.lock();
        let base_id = format!("{}-{}", slugify(name), Utc::now().timestamp_millis());
        let mut id = base_id.clone();
        let mut suffix = 2;
        while accounts.iter().any(|account| account.id == id) {
            id = format!("{}-{}", base_id, suffix);
            suffix += 1;
        }

        let account = AiProviderAccount {
            id,
            name: name.to_string(),
            api_key: normalize_optional(new_account.api_key),
            is_default: false,
            description: normalize_optional(new_account.description),
        };
        accounts.push(account.clone());
        tracing::info!(provider_id = %account.id, name = %account.name, "added AI provider");
        Ok(account)
    }

    pub fn remove(&self, provider_id: &str) -> GalleryResult<AiProviderAccount> {
        let mut accounts = self.lock();
        let index = accounts
            .iter()
            .position(|account| account.id == provider_id)
            .ok_or_else(|| GalleryError::NotFound("Account".to_string()))?;
        let removed = accounts.remove(index);
        tracing::info!(provider_id, "removed AI provider");
        Ok(removed)
    }
}

#[derive(Serialize)]
struct ImagenRequest<'a> {
    instances: [ImagenInstance<'a>; 1],
    parameters: ImagenParameters<'a>,
}

#[derive(Serialize)]
struct ImagenInstance<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters<'a> {
    sample_count: u32,
    aspect_ratio: &'a str,
    output_options: ImagenOutputOptions<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenOutputOptions<'a> {
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct ImagenResponse {
    #[serde(default)]
    predictions: Vec<ImagenPrediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagenPrediction {
    #[serde(default)]
    bytes_base64_encoded: String,
    #[serde(default)]
    mime_type: Option<String>,
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn prompt_tag(prompt: &str) -> Vec<String> {
    vec![prompt.chars().take(PROMPT_TAG_CHARS).collect()]
}

fn generated_asset(prediction: &ImagenPrediction, prompt: &str) -> Asset {
    let mime_type = prediction.mime_type.as_deref().unwrap_or("image/jpeg");
    let data_url = format!("data:{};base64,{}", mime_type, prediction.bytes_base64_encoded);
    let hash = content_hash(prediction.bytes_base64_encoded.as_bytes());
    Asset {
        id: format!("ai-{}", &hash[..16]),
        asset_type: AssetType::Photo,
        preview_url: data_url.clone(),
        large_image_url: data_url.clone(),
        author: "Gemini AI".to_string(),
        source: AssetSource::Ai,
        license: "Generated Content".to_string(),
        tags: prompt_tag(prompt),
        download_url: data_url,
    }
}

fn mock_asset(account: &AiProviderAccount, prompt: &str) -> Asset {
    let encoded: String = url::form_urlencoded::byte_serialize(prompt.as_bytes()).collect();
    let large = format!("{}?{}", MOCK_LARGE_BASE, encoded);
    Asset {
        id: format!("ai-mock-{}", Uuid::new_v4()),
        asset_type: AssetType::Photo,
        preview_url: format!("{}?{}", MOCK_PREVIEW_BASE, encoded),
        large_image_url: large.clone(),
        author: account.name.clone(),
        source: AssetSource::Ai,
        license: "Generated Content (Mock)".to_string(),
        tags: prompt_tag(prompt),
        download_url: large,
    }
}

/// Calls the Imagen `predict` REST endpoint.
pub struct ImagenClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: Url,
}

impl ImagenClient {
    pub fn new(api_key: impl Into<String>) -> GalleryResult<Self> {
        let endpoint = Url::parse(&format!("{}{}:predict", IMAGEN_API_BASE, IMAGEN_MODEL))?;
        Ok(Self {
            http: build_http_client(IMAGEN_TIMEOUT_SECS)?,
            api_key: api_key.into(),
            endpoint,
        })
    }

    pub async fn generate(&self, prompt: &str, aspect_ratio: AspectRatio) -> GalleryResult<Vec<Asset>> {
        let request = ImagenRequest {
            instances: [ImagenInstance { prompt }],
            parameters: ImagenParameters {
                sample_count: 1,
                aspect_ratio: aspect_ratio.as_str(),
                output_options: ImagenOutputOptions {
                    mime_type: "image/jpeg",
                },
            },
        };
        let response = self
            .http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "imagen request failed");
            return Err(GalleryError::provider(
                status.as_u16(),
                "Failed to generate image with Gemini.",
            ));
        }
        let body: ImagenResponse = response.json().await?;
        assets_from_predictions(&body.predictions, prompt)
    }
}

fn assets_from_predictions(
    predictions: &[ImagenPrediction],
    prompt: &str,
) -> GalleryResult<Vec<Asset>> {
    let assets: Vec<Asset> = predictions
        .iter()
        .filter(|prediction| !prediction.bytes_base64_encoded.is_empty())
        .map(|prediction| generated_asset(prediction, prompt))
        .collect();
    if assets.is_empty() {
        return Err(GalleryError::provider(
            502,
            "No images were generated by Gemini.",
        ));
    }
    Ok(assets)
}

/// Routes a generation request to the selected account. There is no
/// fallback: whichever account is named must serve the request.
pub struct GenerationService {
    registry: Arc<ProviderRegistry>,
    gemini: Option<ImagenClient>,
}

impl GenerationService {
    pub fn new(registry: Arc<ProviderRegistry>, gemini_api_key: Option<String>) -> GalleryResult<Self> {
        let gemini = gemini_api_key.map(ImagenClient::new).transpose()?;
        Ok(Self { registry, gemini })
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }
}

#[async_trait]
impl AiGenerationClient for GenerationService {
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        provider_id: &str,
    ) -> GalleryResult<Vec<Asset>> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GalleryError::Validation("Please enter a prompt.".to_string()));
        }
        let account = self
            .registry
            .find(provider_id)
            .ok_or_else(|| GalleryError::UnknownProvider(provider_id.to_string()))?;
        tracing::info!(provider = %account.name, aspect_ratio = aspect_ratio.as_str(), "generating image");

        if account.id == GEMINI_PROVIDER_ID {
            let client = self.gemini.as_ref().ok_or_else(|| {
                GalleryError::MissingCredentials(
                    "Gemini API key is not configured on the server.".to_string(),
                )
            })?;
            return client.generate(prompt, aspect_ratio).await;
        }

        if account.api_key.as_deref().map_or(true, |key| key.trim().is_empty()) {
            return Err(GalleryError::MissingCredentials(format!(
                "No API key is stored for {}.",
                account.name
            )));
        }
        Ok(vec![mock_asset(&account, prompt)])
    }
}
