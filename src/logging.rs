//! Tracing setup for the backend binary.

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "info,asset_gallery_lib=debug";

/// Installs the stderr subscriber. Later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        );
        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("[asset-gallery] failed to set tracing subscriber: {}", err);
        }
    });
}
