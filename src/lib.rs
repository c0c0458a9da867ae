pub mod ai;
pub mod collections;
pub mod config;
pub mod error;
pub mod fetch;
pub mod generation;
pub mod kv_store;
pub mod logging;
pub mod model;
pub mod pixabay;
pub mod preferences;
pub mod sample_catalog;
pub mod search;
pub mod server;
pub mod session;
pub mod suggestions;

pub use collections::{CollectionManager, MigrationOutcome, ToggleOutcome};
pub use config::AppConfig;
pub use error::{GalleryError, GalleryResult, StoreError};
pub use kv_store::{KeyValueStore, MemoryKvStore, SqliteKvStore};
pub use search::{SearchController, SearchPhase};
pub use session::ClientSession;

/// Starts the companion backend and blocks until it shuts down.
pub fn run() -> GalleryResult<()> {
    logging::init();
    let config = AppConfig::from_env()?;
    tracing::debug!(data_dir = %config.data_dir.display(), "configuration loaded");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(&config))
}
