//! Client-side application state wired to its store and backend clients.

use crate::ai::{AiGenerationClient, HttpAiClient};
use crate::collections::{CollectionManager, MigrationOutcome};
use crate::config::AppConfig;
use crate::error::GalleryResult;
use crate::fetch::{AssetFetchClient, HttpAssetClient};
use crate::kv_store::{KeyValueStore, SqliteKvStore};
use crate::model::{AspectRatio, Asset, FilterOptions};
use crate::preferences::Preferences;
use crate::search::{CompletionOutcome, ScrollMetrics, SearchController};
use crate::suggestions::SuggestionTracker;
use std::sync::Arc;

pub struct ClientSession<S: KeyValueStore + Clone> {
    collections: CollectionManager<S>,
    preferences: Preferences<S>,
    search: SearchController,
    suggestions: SuggestionTracker,
    assets: Arc<dyn AssetFetchClient>,
    generator: Arc<dyn AiGenerationClient>,
    migration: MigrationOutcome,
}

impl ClientSession<SqliteKvStore> {
    /// Opens `gallery.db` under the configured data directory and talks to
    /// the backend at `api_base`.
    pub fn open(config: &AppConfig) -> GalleryResult<Self> {
        let store = SqliteKvStore::open(&config.database_path())?;
        let assets = Arc::new(HttpAssetClient::new(config.api_base.clone())?);
        let generator = Arc::new(HttpAiClient::new(config.api_base.clone())?);
        Self::bootstrap(store, assets, generator)
    }
}

impl<S: KeyValueStore + Clone> ClientSession<S> {
    /// Loads persisted state and runs the legacy favorites migration. This
    /// is the only place the migration is triggered.
    pub fn bootstrap(
        store: S,
        assets: Arc<dyn AssetFetchClient>,
        generator: Arc<dyn AiGenerationClient>,
    ) -> GalleryResult<Self> {
        let mut collections = CollectionManager::load(store.clone())?;
        let migration = collections.migrate_legacy_favorites()?;
        tracing::info!(?migration, collections = collections.collections().len(), "session ready");
        Ok(Self {
            collections,
            preferences: Preferences::new(store),
            search: SearchController::with_defaults(),
            suggestions: SuggestionTracker::new(),
            assets,
            generator,
            migration,
        })
    }

    pub fn migration(&self) -> &MigrationOutcome {
        &self.migration
    }

    pub fn collections(&self) -> &CollectionManager<S> {
        &self.collections
    }

    pub fn collections_mut(&mut self) -> &mut CollectionManager<S> {
        &mut self.collections
    }

    pub fn preferences(&self) -> &Preferences<S> {
        &self.preferences
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub fn suggestions(&self) -> &SuggestionTracker {
        &self.suggestions
    }

    /// Loads the first page of the current query.
    pub async fn start(&mut self) -> Option<CompletionOutcome> {
        let ticket = self.search.refresh()?;
        Some(self.search.fetch_and_apply(self.assets.as_ref(), ticket).await)
    }

    /// A submitted query is remembered in the search history before it runs.
    pub async fn submit_query(&mut self, query: &str) -> GalleryResult<Option<CompletionOutcome>> {
        self.preferences.record_search(query)?;
        let Some(ticket) = self.search.set_query(query) else {
            return Ok(None);
        };
        Ok(Some(
            self.search.fetch_and_apply(self.assets.as_ref(), ticket).await,
        ))
    }

    pub async fn change_filters(&mut self, filters: FilterOptions) -> Option<CompletionOutcome> {
        let ticket = self.search.set_filters(filters)?;
        Some(self.search.fetch_and_apply(self.assets.as_ref(), ticket).await)
    }

    pub async fn scrolled(&mut self, metrics: ScrollMetrics) -> Option<CompletionOutcome> {
        let ticket = self.search.on_scroll(metrics)?;
        Some(self.search.fetch_and_apply(self.assets.as_ref(), ticket).await)
    }

    pub async fn retry_search(&mut self) -> Option<CompletionOutcome> {
        let ticket = self.search.retry()?;
        Some(self.search.fetch_and_apply(self.assets.as_ref(), ticket).await)
    }

    /// Returns whether fresh suggestions were applied.
    pub async fn type_ahead(&mut self, text: &str) -> bool {
        match self.suggestions.input_changed(text) {
            Some(ticket) => {
                self.suggestions
                    .fetch_and_apply(self.assets.as_ref(), ticket)
                    .await
            }
            None => false,
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        provider_id: &str,
    ) -> GalleryResult<Vec<Asset>> {
        self.generator
            .generate(prompt, aspect_ratio, provider_id)
            .await
    }
}
