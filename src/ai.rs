//! AI image generation as seen from the client, plus linked provider
//! account management on the companion backend.

use crate::error::GalleryResult;
use crate::fetch::{build_http_client, provider_error};
use crate::model::{AiProviderAccount, AspectRatio, Asset, GenerateRequest, NewProviderAccount};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use url::Url;

/// Generation can take far longer than a search.
const GENERATION_TIMEOUT_SECS: u64 = 120;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiGenerationClient: Send + Sync {
    /// Generates assets with exactly the requested provider. Unknown
    /// providers, missing credentials and upstream failures are errors.
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        provider_id: &str,
    ) -> GalleryResult<Vec<Asset>>;
}

pub struct HttpAiClient {
    http: reqwest::Client,
    api_base: Url,
}

impl HttpAiClient {
    pub fn new(api_base: Url) -> GalleryResult<Self> {
        Ok(Self {
            http: build_http_client(GENERATION_TIMEOUT_SECS)?,
            api_base,
        })
    }

    fn endpoint(&self, path: &str) -> GalleryResult<Url> {
        Ok(self.api_base.join(path)?)
    }

    pub async fn linked_accounts(&self) -> GalleryResult<Vec<AiProviderAccount>> {
        let response = self
            .http
            .get(self.endpoint("/api/linked-accounts")?)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }
        Ok(response.json().await?)
    }

    pub async fn add_provider(
        &self,
        account: &NewProviderAccount,
    ) -> GalleryResult<AiProviderAccount> {
        let response = self
            .http
            .post(self.endpoint("/api/add-ai-provider")?)
            .json(account)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }
        let created: AiProviderAccount = response.json().await?;
        tracing::info!(provider_id = %created.id, "linked AI provider");
        Ok(created)
    }

    fn remove_url(&self, provider_id: &str) -> GalleryResult<Url> {
        let mut url = self.endpoint("/api/remove-linked-account/")?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(provider_id);
        Ok(url)
    }

    pub async fn remove_provider(&self, provider_id: &str) -> GalleryResult<()> {
        let url = self.remove_url(provider_id)?;
        let response = self.http.delete(url).send().await?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }
        tracing::info!(provider_id, "removed AI provider");
        Ok(())
    }
}

#[async_trait]
impl AiGenerationClient for HttpAiClient {
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        provider_id: &str,
    ) -> GalleryResult<Vec<Asset>> {
        let body = GenerateRequest {
            prompt: prompt.to_string(),
            aspect_ratio,
            provider_id: provider_id.to_string(),
        };
        tracing::debug!(provider_id, aspect_ratio = aspect_ratio.as_str(), "requesting generation");
        let response = self
            .http
            .post(self.endpoint("/api/ai-generate")?)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }
        Ok(response.json().await?)
    }
}
