use asset_gallery_lib::generation::{GenerationService, ProviderRegistry};
use asset_gallery_lib::kv_store::{get_json, keys, put_json};
use asset_gallery_lib::model::{
    Asset, AssetSource, AssetType, FilterOptions, Orientation, TypeFilter, DEFAULT_COLLECTION_NAME,
};
use asset_gallery_lib::sample_catalog::SampleCatalog;
use asset_gallery_lib::{
    ClientSession, KeyValueStore, MigrationOutcome, SearchPhase, SqliteKvStore, ToggleOutcome,
};
use std::path::Path;
use std::sync::Arc;

fn asset(id: &str, tags: &[&str]) -> Asset {
    Asset {
        id: id.to_string(),
        asset_type: AssetType::Photo,
        preview_url: format!("https://cdn.example/{}_150.jpg", id),
        large_image_url: format!("https://cdn.example/{}_1280.jpg", id),
        author: "tester".to_string(),
        source: AssetSource::Pixabay,
        license: "Pixabay License".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        download_url: format!("https://pixabay.example/{}", id),
    }
}

fn open_session(path: &Path) -> ClientSession<SqliteKvStore> {
    let store = SqliteKvStore::open(path).unwrap();
    let providers = Arc::new(ProviderRegistry::default());
    ClientSession::bootstrap(
        store,
        Arc::new(SampleCatalog::default()),
        Arc::new(GenerationService::new(providers, None).unwrap()),
    )
    .unwrap()
}

#[test]
fn legacy_favorites_migrate_once_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gallery.db");
    {
        let store = SqliteKvStore::open(&path).unwrap();
        let legacy = vec![
            asset("1", &["neon"]),
            asset("2", &["retro"]),
            asset("1", &["neon"]),
        ];
        put_json(&store, keys::LEGACY_FAVORITES, &legacy).unwrap();
    }

    let first = open_session(&path);
    match first.migration() {
        MigrationOutcome::Migrated { assets, .. } => assert_eq!(*assets, 2),
        other => panic!("unexpected migration outcome: {:?}", other),
    }
    let collections = first.collections().collections();
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].name, DEFAULT_COLLECTION_NAME);
    assert_eq!(collections[0].asset_ids, vec!["1", "2"]);
    drop(first);

    let second = open_session(&path);
    assert_eq!(second.migration(), &MigrationOutcome::AlreadyComplete);
    assert_eq!(second.collections().collections().len(), 1);
    assert_eq!(second.collections().pool().len(), 2);

    let store = SqliteKvStore::open(&path).unwrap();
    assert!(store.get_raw(keys::LEGACY_FAVORITES).unwrap().is_none());
    let flag: Option<bool> = get_json(&store, keys::FAVORITES_MIGRATED).unwrap();
    assert_eq!(flag, Some(true));
}

#[test]
fn collection_changes_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gallery.db");
    let galaxy = asset("1867616", &["galaxy", "space"]);
    let collection_id = {
        let mut session = open_session(&path);
        assert_eq!(session.migration(), &MigrationOutcome::NoLegacyData);
        let created = session
            .collections_mut()
            .create_collection("Space", None)
            .unwrap()
            .unwrap();
        let outcome = session
            .collections_mut()
            .toggle_asset_in_collection(&galaxy, &created.id)
            .unwrap();
        assert_eq!(outcome, ToggleOutcome::Added);
        created.id
    };

    let session = open_session(&path);
    assert!(session.collections().is_asset_in_any_collection("1867616"));
    assert_eq!(
        session.collections().collections_containing("1867616"),
        vec![collection_id]
    );
    assert_eq!(session.collections().favorited_asset("1867616"), Some(&galaxy));
}

#[tokio::test]
async fn searching_records_history_and_applies_filters() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&dir.path().join("gallery.db"));

    session.start().await;
    let ids: Vec<&str> = session.search().results().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["3139371"]);

    session.submit_query("retro").await.unwrap();
    assert_eq!(session.search().results().len(), 2);
    assert_eq!(session.search().phase(), &SearchPhase::Loaded { has_more: false });

    let everything = FilterOptions::new(TypeFilter::All, Orientation::All);
    session.change_filters(everything).await;
    assert_eq!(session.search().results().len(), 3);

    let history = session.preferences().history().unwrap();
    assert_eq!(history.entries(), ["retro"]);

    assert!(session.type_ahead("vintage").await);
    assert_eq!(session.suggestions().suggestions(), ["vintage car"]);
}
