//! Theme, signed-in user and recent searches.

use crate::error::GalleryResult;
use crate::kv_store::{get_json, keys, put_json, KeyValueStore, KvWrite};
use crate::model::{Theme, User, UserUpdate};
use serde::{Deserialize, Serialize};

pub const SEARCH_HISTORY_LIMIT: usize = 10;

const DEMO_USER_ID: &str = "demo-user";
const DEMO_USER_NAME: &str = "Demo User";
const DEMO_USER_EMAIL: &str = "demo@assethub.ai";

/// Most-recent-first list of distinct queries (case-insensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHistory {
    entries: Vec<String>,
}

impl SearchHistory {
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Returns false for blank queries, which are not recorded.
    pub fn record(&mut self, query: &str) -> bool {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return false;
        }
        let lowered = trimmed.to_lowercase();
        self.entries.retain(|entry| entry.to_lowercase() != lowered);
        self.entries.insert(0, trimmed.to_string());
        self.entries.truncate(SEARCH_HISTORY_LIMIT);
        true
    }
}

pub struct Preferences<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn theme(&self) -> GalleryResult<Theme> {
        Ok(get_json(&self.store, keys::THEME)?.unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> GalleryResult<()> {
        put_json(&self.store, keys::THEME, &theme)?;
        Ok(())
    }

    pub fn toggle_theme(&self) -> GalleryResult<Theme> {
        let next = self.theme()?.toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn user(&self) -> GalleryResult<Option<User>> {
        Ok(get_json(&self.store, keys::USER)?)
    }

    pub fn login_demo(&self) -> GalleryResult<User> {
        let user = User {
            id: DEMO_USER_ID.to_string(),
            name: DEMO_USER_NAME.to_string(),
            email: DEMO_USER_EMAIL.to_string(),
        };
        put_json(&self.store, keys::USER, &user)?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    pub fn logout(&self) -> GalleryResult<()> {
        self.store.apply(&[KvWrite::delete(keys::USER)])?;
        Ok(())
    }

    /// Merges the given fields into the signed-in user. No-op when signed out.
    pub fn update_user(&self, update: UserUpdate) -> GalleryResult<Option<User>> {
        let Some(mut user) = self.user()? else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        put_json(&self.store, keys::USER, &user)?;
        Ok(Some(user))
    }

    pub fn history(&self) -> GalleryResult<SearchHistory> {
        Ok(get_json(&self.store, keys::SEARCH_HISTORY)?.unwrap_or_default())
    }

    pub fn record_search(&self, query: &str) -> GalleryResult<SearchHistory> {
        let mut history = self.history()?;
        if history.record(query) {
            put_json(&self.store, keys::SEARCH_HISTORY, &history)?;
        }
        Ok(history)
    }
}
