fn main() {
    if let Err(err) = asset_gallery_lib::run() {
        tracing::error!("asset gallery backend failed: {}", err);
        eprintln!("asset-gallery: {}", err);
        std::process::exit(1);
    }
}
