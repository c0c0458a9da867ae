//! Collections and the favorited-asset pool.
//!
//! The manager owns the list of collections and the pool of full asset
//! records referenced by them. Every mutation is staged on a copy, written to
//! the store as one batch, and only then swapped into memory. A failed write
//! leaves both the in-memory state and the persisted state as they were.
//!
//! Pool entries are never pruned: deleting a collection or removing an asset
//! from one keeps its record in the pool.

use crate::error::{GalleryError, GalleryResult};
use crate::kv_store::{get_json, keys, KeyValueStore, KvWrite};
use crate::model::{Asset, Collection, DEFAULT_COLLECTION_NAME};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

pub type AssetPool = BTreeMap<String, Asset>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// No collection has the requested id; nothing changed.
    CollectionMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The persisted migration flag is already set.
    AlreadyComplete,
    NoLegacyData,
    Migrated { collection_id: String, assets: usize },
    /// Legacy data existed but was unusable or collections already existed;
    /// it was removed without conversion.
    Discarded,
}

fn new_collection_id() -> String {
    format!("collection-{}", Uuid::new_v4())
}

fn normalize_collection_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub struct CollectionManager<S: KeyValueStore> {
    store: S,
    collections: Vec<Collection>,
    pool: AssetPool,
}

impl<S: KeyValueStore> CollectionManager<S> {
    /// Loads persisted collections and pool. Missing or unreadable values
    /// start out empty.
    pub fn load(store: S) -> GalleryResult<Self> {
        let collections: Vec<Collection> =
            get_json(&store, keys::COLLECTIONS)?.unwrap_or_default();
        let pool: AssetPool = get_json(&store, keys::FAVORITED_ASSETS)?.unwrap_or_default();
        tracing::debug!(
            collections = collections.len(),
            pooled_assets = pool.len(),
            "loaded collection state"
        );
        Ok(Self {
            store,
            collections,
            pool,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Collections in insertion order.
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Collections sorted by name for display.
    pub fn collections_by_name(&self) -> Vec<&Collection> {
        let mut sorted: Vec<&Collection> = self.collections.iter().collect();
        sorted.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        sorted
    }

    pub fn collection(&self, collection_id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == collection_id)
    }

    pub fn pool(&self) -> &AssetPool {
        &self.pool
    }

    pub fn favorited_asset(&self, asset_id: &str) -> Option<&Asset> {
        self.pool.get(asset_id)
    }

    /// Member assets of a collection in membership order.
    pub fn assets_in_collection(&self, collection_id: &str) -> Vec<&Asset> {
        match self.collection(collection_id) {
            Some(collection) => collection
                .asset_ids
                .iter()
                .filter_map(|id| self.pool.get(id))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_asset_in_any_collection(&self, asset_id: &str) -> bool {
        self.collections.iter().any(|c| c.contains(asset_id))
    }

    pub fn collections_containing(&self, asset_id: &str) -> Vec<String> {
        self.collections
            .iter()
            .filter(|c| c.contains(asset_id))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Creates a collection, optionally seeded with one asset.
    ///
    /// Returns `Ok(None)` without touching any state when `name` is blank.
    pub fn create_collection(
        &mut self,
        name: &str,
        seed_asset: Option<&Asset>,
    ) -> GalleryResult<Option<Collection>> {
        let Some(normalized_name) = normalize_collection_name(name) else {
            tracing::debug!("ignoring collection with blank name");
            return Ok(None);
        };

        let mut next_pool = None;
        if let Some(asset) = seed_asset {
            if !self.pool.contains_key(&asset.id) {
                let mut pool = self.pool.clone();
                pool.insert(asset.id.clone(), asset.clone());
                next_pool = Some(pool);
            }
        }

        let collection = Collection {
            id: new_collection_id(),
            name: normalized_name,
            asset_ids: seed_asset.map(|a| vec![a.id.clone()]).unwrap_or_default(),
        };
        let mut next_collections = self.collections.clone();
        next_collections.push(collection.clone());

        self.commit(Some(next_collections), next_pool)?;
        tracing::info!(collection_id = %collection.id, "created collection");
        Ok(Some(collection))
    }

    /// Removes a collection. Unknown ids are a no-op. The pool is untouched.
    pub fn delete_collection(&mut self, collection_id: &str) -> GalleryResult<bool> {
        if self.collection(collection_id).is_none() {
            return Ok(false);
        }
        let next_collections: Vec<Collection> = self
            .collections
            .iter()
            .filter(|c| c.id != collection_id)
            .cloned()
            .collect();
        self.commit(Some(next_collections), None)?;
        tracing::info!(collection_id, "deleted collection");
        Ok(true)
    }

    pub fn rename_collection(&mut self, collection_id: &str, name: &str) -> GalleryResult<()> {
        let normalized_name = normalize_collection_name(name)
            .ok_or_else(|| GalleryError::Validation("Collection name cannot be empty.".into()))?;
        if self.collection(collection_id).is_none() {
            return Err(GalleryError::NotFound(format!("collection {}", collection_id)));
        }
        let next_collections: Vec<Collection> = self
            .collections
            .iter()
            .map(|c| {
                if c.id == collection_id {
                    Collection {
                        name: normalized_name.clone(),
                        ..c.clone()
                    }
                } else {
                    c.clone()
                }
            })
            .collect();
        self.commit(Some(next_collections), None)
    }

    /// Adds the asset to the collection, or removes it if already a member.
    ///
    /// The asset record enters the pool even when the collection is missing.
    pub fn toggle_asset_in_collection(
        &mut self,
        asset: &Asset,
        collection_id: &str,
    ) -> GalleryResult<ToggleOutcome> {
        let next_pool = if self.pool.contains_key(&asset.id) {
            None
        } else {
            let mut pool = self.pool.clone();
            pool.insert(asset.id.clone(), asset.clone());
            Some(pool)
        };

        let Some(position) = self.collections.iter().position(|c| c.id == collection_id) else {
            if next_pool.is_some() {
                self.commit(None, next_pool)?;
            }
            tracing::debug!(collection_id, "toggle ignored for missing collection");
            return Ok(ToggleOutcome::CollectionMissing);
        };

        let mut next_collections = self.collections.clone();
        let target = &mut next_collections[position];
        let outcome = if target.contains(&asset.id) {
            target.asset_ids.retain(|id| id != &asset.id);
            ToggleOutcome::Removed
        } else {
            target.asset_ids.push(asset.id.clone());
            ToggleOutcome::Added
        };

        self.commit(Some(next_collections), next_pool)?;
        tracing::debug!(asset_id = %asset.id, collection_id, ?outcome, "toggled membership");
        Ok(outcome)
    }

    /// Converts the legacy single-list favorites into one default collection.
    ///
    /// Runs at most once: the persisted flag written with the conversion
    /// batch short-circuits every later call. The legacy key is removed
    /// whether or not conversion happened, including when it shows up again
    /// after the flag was set.
    pub fn migrate_legacy_favorites(&mut self) -> GalleryResult<MigrationOutcome> {
        let already_done: Option<bool> = get_json(&self.store, keys::FAVORITES_MIGRATED)?;
        if already_done == Some(true) {
            if self.store.get_raw(keys::LEGACY_FAVORITES)?.is_some() {
                self.store.apply(&[KvWrite::delete(keys::LEGACY_FAVORITES)])?;
                tracing::info!("removed legacy favorites written after migration");
            }
            return Ok(MigrationOutcome::AlreadyComplete);
        }

        let Some(raw) = self.store.get_raw(keys::LEGACY_FAVORITES)? else {
            return Ok(MigrationOutcome::NoLegacyData);
        };

        let cleanup = [
            KvWrite::delete(keys::LEGACY_FAVORITES),
            KvWrite::put_json(keys::FAVORITES_MIGRATED, &true)?,
        ];

        let legacy_assets = match serde_json::from_str::<Vec<Asset>>(&raw) {
            Ok(assets) => assets,
            Err(err) => {
                tracing::warn!("failed to read legacy favorites, discarding: {}", err);
                self.store.apply(&cleanup)?;
                return Ok(MigrationOutcome::Discarded);
            }
        };

        if legacy_assets.is_empty() || !self.collections.is_empty() {
            self.store.apply(&cleanup)?;
            tracing::info!(
                legacy_assets = legacy_assets.len(),
                existing_collections = self.collections.len(),
                "legacy favorites removed without conversion"
            );
            return Ok(MigrationOutcome::Discarded);
        }

        let mut next_pool = self.pool.clone();
        let mut seen = BTreeSet::new();
        let mut asset_ids = Vec::new();
        for asset in legacy_assets {
            if seen.insert(asset.id.clone()) {
                asset_ids.push(asset.id.clone());
            }
            next_pool.insert(asset.id.clone(), asset);
        }

        let collection = Collection {
            id: new_collection_id(),
            name: DEFAULT_COLLECTION_NAME.to_string(),
            asset_ids,
        };
        let migrated_count = collection.asset_ids.len();
        let collection_id = collection.id.clone();
        let next_collections = vec![collection];

        let mut writes = vec![
            KvWrite::put_json(keys::COLLECTIONS, &next_collections)?,
            KvWrite::put_json(keys::FAVORITED_ASSETS, &next_pool)?,
        ];
        writes.extend(cleanup);
        self.store.apply(&writes)?;

        self.collections = next_collections;
        self.pool = next_pool;
        tracing::info!(assets = migrated_count, "migrated legacy favorites");
        Ok(MigrationOutcome::Migrated {
            collection_id,
            assets: migrated_count,
        })
    }

    fn commit(
        &mut self,
        next_collections: Option<Vec<Collection>>,
        next_pool: Option<AssetPool>,
    ) -> GalleryResult<()> {
        let mut writes = Vec::with_capacity(2);
        if let Some(collections) = next_collections.as_ref() {
            writes.push(KvWrite::put_json(keys::COLLECTIONS, collections)?);
        }
        if let Some(pool) = next_pool.as_ref() {
            writes.push(KvWrite::put_json(keys::FAVORITED_ASSETS, pool)?);
        }
        if let Err(err) = self.store.apply(&writes) {
            tracing::error!("collection change not committed: {}", err);
            return Err(err.into());
        }
        if let Some(collections) = next_collections {
            self.collections = collections;
        }
        if let Some(pool) = next_pool {
            self.pool = pool;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::kv_store::{put_json, MemoryKvStore};
    use crate::model::{AssetSource, AssetType};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn asset(id: &str) -> Asset {
        Asset {
            id: id.to_string(),
            asset_type: AssetType::Photo,
            preview_url: format!("https://cdn.example/{}_150.jpg", id),
            large_image_url: format!("https://cdn.example/{}_1280.jpg", id),
            author: "tester".to_string(),
            source: AssetSource::Pixabay,
            license: "Pixabay License".to_string(),
            tags: vec!["retro".to_string()],
            download_url: format!("https://pixabay.example/{}", id),
        }
    }

    /// Memory store whose writes can be switched off.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: MemoryKvStore,
        fail_writes: Arc<AtomicBool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get_raw(key)
        }

        fn apply(&self, writes: &[KvWrite]) -> StoreResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("disk full".to_string()));
            }
            self.inner.apply(writes)
        }
    }

    fn manager() -> CollectionManager<MemoryKvStore> {
        CollectionManager::load(MemoryKvStore::new()).unwrap()
    }

    #[test]
    fn blank_names_never_create_collections() {
        let mut manager = manager();
        assert!(manager.create_collection("", None).unwrap().is_none());
        assert!(manager.create_collection("   ", None).unwrap().is_none());
        assert!(manager.collections().is_empty());
        assert!(manager.store().get_raw(keys::COLLECTIONS).unwrap().is_none());
    }

    #[test]
    fn seeded_collection_adds_asset_to_pool() {
        let mut manager = manager();
        let seed = asset("3139371");
        let created = manager
            .create_collection("  Neon  ", Some(&seed))
            .unwrap()
            .unwrap();
        assert_eq!(created.name, "Neon");
        assert_eq!(created.asset_ids, vec!["3139371".to_string()]);
        assert!(created.id.starts_with("collection-"));
        assert_eq!(manager.favorited_asset("3139371"), Some(&seed));
        assert_eq!(manager.assets_in_collection(&created.id), vec![&seed]);
    }

    #[test]
    fn membership_follows_toggle_parity() {
        let mut manager = manager();
        let target = manager.create_collection("Moodboard", None).unwrap().unwrap();
        let item = asset("a1");
        for toggles in 1..=7 {
            manager.toggle_asset_in_collection(&item, &target.id).unwrap();
            let present = manager.collection(&target.id).unwrap().contains("a1");
            assert_eq!(present, toggles % 2 == 1, "after {} toggles", toggles);
        }
        let ids = &manager.collection(&target.id).unwrap().asset_ids;
        assert_eq!(ids.iter().filter(|id| *id == "a1").count(), 1);
    }

    #[test]
    fn toggle_on_missing_collection_leaves_list_unchanged() {
        let mut manager = manager();
        manager.create_collection("Only", None).unwrap();
        let before = manager.collections().to_vec();
        let outcome = manager
            .toggle_asset_in_collection(&asset("x"), "collection-missing")
            .unwrap();
        assert_eq!(outcome, ToggleOutcome::CollectionMissing);
        assert_eq!(manager.collections(), before.as_slice());
        assert!(manager.favorited_asset("x").is_some());
    }

    #[test]
    fn delete_keeps_pool_and_other_collections() {
        let mut manager = manager();
        let shared = asset("shared");
        let first = manager.create_collection("First", Some(&shared)).unwrap().unwrap();
        let second = manager.create_collection("Second", Some(&shared)).unwrap().unwrap();

        assert!(manager.delete_collection(&first.id).unwrap());
        assert!(!manager.delete_collection(&first.id).unwrap());

        assert!(manager.favorited_asset("shared").is_some());
        assert_eq!(manager.collections_containing("shared"), vec![second.id.clone()]);
        assert!(manager.is_asset_in_any_collection("shared"));
    }

    #[test]
    fn any_collection_agrees_with_containing_list() {
        let mut manager = manager();
        let a = manager.create_collection("A", Some(&asset("1"))).unwrap().unwrap();
        manager.create_collection("B", None).unwrap();
        manager.toggle_asset_in_collection(&asset("2"), &a.id).unwrap();
        manager.toggle_asset_in_collection(&asset("1"), &a.id).unwrap();
        for id in ["1", "2", "3"] {
            assert_eq!(
                manager.is_asset_in_any_collection(id),
                !manager.collections_containing(id).is_empty()
            );
        }
    }

    #[test]
    fn failed_write_leaves_state_untouched() {
        let store = FlakyStore::default();
        let mut manager = CollectionManager::load(store.clone()).unwrap();
        let collection = manager.create_collection("Keep", None).unwrap().unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = manager
            .toggle_asset_in_collection(&asset("lost"), &collection.id)
            .unwrap_err();
        assert!(matches!(err, GalleryError::Store(_)));
        assert!(manager.favorited_asset("lost").is_none());
        assert!(manager.collection(&collection.id).unwrap().asset_ids.is_empty());

        store.fail_writes.store(false, Ordering::SeqCst);
        let reloaded = CollectionManager::load(store).unwrap();
        assert_eq!(reloaded.collections(), manager.collections());
        assert!(reloaded.pool().is_empty());
    }

    #[test]
    fn rename_validates_and_persists() {
        let mut manager = manager();
        let c = manager.create_collection("Old", None).unwrap().unwrap();
        assert!(matches!(
            manager.rename_collection(&c.id, " "),
            Err(GalleryError::Validation(_))
        ));
        assert!(matches!(
            manager.rename_collection("nope", "New"),
            Err(GalleryError::NotFound(_))
        ));
        manager.rename_collection(&c.id, "New").unwrap();
        let reloaded = CollectionManager::load(manager.store().clone()).unwrap();
        assert_eq!(reloaded.collection(&c.id).unwrap().name, "New");
    }

    #[test]
    fn display_order_is_by_name() {
        let mut manager = manager();
        manager.create_collection("zebra", None).unwrap();
        manager.create_collection("Apple", None).unwrap();
        manager.create_collection("mango", None).unwrap();
        let names: Vec<&str> = manager
            .collections_by_name()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Apple", "mango", "zebra"]);
    }

    #[test]
    fn legacy_favorites_migrate_exactly_once() {
        let store = MemoryKvStore::new();
        put_json(
            &store,
            keys::LEGACY_FAVORITES,
            &vec![asset("1"), asset("2"), asset("1")],
        )
        .unwrap();
        let mut manager = CollectionManager::load(store.clone()).unwrap();

        let outcome = manager.migrate_legacy_favorites().unwrap();
        assert!(matches!(outcome, MigrationOutcome::Migrated { assets: 2, .. }));
        assert_eq!(manager.collections().len(), 1);
        assert_eq!(manager.collections()[0].name, DEFAULT_COLLECTION_NAME);
        assert_eq!(manager.collections()[0].asset_ids, vec!["1", "2"]);
        assert_eq!(manager.pool().len(), 2);
        assert!(store.get_raw(keys::LEGACY_FAVORITES).unwrap().is_none());

        let collections_before = manager.collections().to_vec();
        let pool_before = manager.pool().clone();
        assert_eq!(
            manager.migrate_legacy_favorites().unwrap(),
            MigrationOutcome::AlreadyComplete
        );
        assert_eq!(manager.collections(), collections_before.as_slice());
        assert_eq!(manager.pool(), &pool_before);
    }

    #[test]
    fn reappearing_legacy_data_is_removed_after_migration() {
        let store = MemoryKvStore::new();
        put_json(&store, keys::LEGACY_FAVORITES, &vec![asset("1")]).unwrap();
        let mut manager = CollectionManager::load(store.clone()).unwrap();
        manager.migrate_legacy_favorites().unwrap();
        let collections_before = manager.collections().to_vec();

        put_json(&store, keys::LEGACY_FAVORITES, &vec![asset("2")]).unwrap();
        assert_eq!(
            manager.migrate_legacy_favorites().unwrap(),
            MigrationOutcome::AlreadyComplete
        );
        assert!(store.get_raw(keys::LEGACY_FAVORITES).unwrap().is_none());
        assert_eq!(manager.collections(), collections_before.as_slice());
        assert!(manager.favorited_asset("2").is_none());
    }

    #[test]
    fn legacy_data_is_dropped_when_collections_exist() {
        let store = MemoryKvStore::new();
        let mut manager = CollectionManager::load(store.clone()).unwrap();
        manager.create_collection("Existing", None).unwrap();
        put_json(&store, keys::LEGACY_FAVORITES, &vec![asset("1")]).unwrap();

        assert_eq!(
            manager.migrate_legacy_favorites().unwrap(),
            MigrationOutcome::Discarded
        );
        assert_eq!(manager.collections().len(), 1);
        assert!(manager.pool().is_empty());
        assert!(store.get_raw(keys::LEGACY_FAVORITES).unwrap().is_none());
    }

    #[test]
    fn corrupt_legacy_data_is_removed() {
        let store = MemoryKvStore::new();
        store
            .apply(&[KvWrite::Put {
                key: keys::LEGACY_FAVORITES.to_string(),
                value: "[{broken".to_string(),
            }])
            .unwrap();
        let mut manager = CollectionManager::load(store.clone()).unwrap();
        assert_eq!(
            manager.migrate_legacy_favorites().unwrap(),
            MigrationOutcome::Discarded
        );
        assert!(store.get_raw(keys::LEGACY_FAVORITES).unwrap().is_none());
        assert!(manager.collections().is_empty());
    }

    #[test]
    fn migration_without_legacy_data_is_a_no_op() {
        let mut manager = manager();
        assert_eq!(
            manager.migrate_legacy_favorites().unwrap(),
            MigrationOutcome::NoLegacyData
        );
        assert_eq!(
            manager.migrate_legacy_favorites().unwrap(),
            MigrationOutcome::NoLegacyData
        );
        assert!(manager.collections().is_empty());
    }
}
