//! Environment-driven configuration.
//!
//! Resolution order for the data directory:
//! 1. `$GALLERY_DATA_DIR`
//! 2. `$APPDATA/AssetGallery`
//! 3. platform data directory (`dirs::data_dir()`) + `asset-gallery`

use crate::error::ConfigError;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use url::Url;

const DATA_DIR_ENV: &str = "GALLERY_DATA_DIR";
const HOST_ENV: &str = "GALLERY_HOST";
const PORT_ENV: &str = "GALLERY_PORT";
const FRONTEND_DIR_ENV: &str = "GALLERY_FRONTEND_DIR";
const API_BASE_ENV: &str = "GALLERY_API_BASE";
const PIXABAY_KEY_ENV: &str = "PIXABAY_API_KEY";
const GEMINI_KEY_ENVS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

const DEFAULT_HOST: [u8; 4] = [127, 0, 0, 1];
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_FRONTEND_DIR: &str = "frontend";
const DATABASE_FILENAME: &str = "gallery.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub frontend_dir: PathBuf,
    pub api_base: Url,
    pub pixabay_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenv::dotenv() {
            tracing::debug!("no .env file loaded: {}", err);
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let data_dir = match non_empty(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => match non_empty("APPDATA") {
                Some(app_data) => PathBuf::from(app_data).join("AssetGallery"),
                None => dirs::data_dir()
                    .map(|dir| dir.join("asset-gallery"))
                    .ok_or(ConfigError::NoDataDirectory)?,
            },
        };

        let host = match non_empty(HOST_ENV) {
            Some(raw) => raw.parse::<IpAddr>().map_err(|err| ConfigError::InvalidValue {
                variable: HOST_ENV.to_string(),
                reason: err.to_string(),
            })?,
            None => IpAddr::from(DEFAULT_HOST),
        };

        let port = match non_empty(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|err| ConfigError::InvalidValue {
                variable: PORT_ENV.to_string(),
                reason: err.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let api_base_raw =
            non_empty(API_BASE_ENV).unwrap_or_else(|| format!("http://{}:{}", host, port));
        let api_base = Url::parse(&api_base_raw).map_err(|err| ConfigError::InvalidValue {
            variable: API_BASE_ENV.to_string(),
            reason: err.to_string(),
        })?;

        let frontend_dir = PathBuf::from(
            non_empty(FRONTEND_DIR_ENV).unwrap_or_else(|| DEFAULT_FRONTEND_DIR.to_string()),
        );

        let gemini_api_key = GEMINI_KEY_ENVS.iter().find_map(|name| non_empty(*name));

        Ok(Self {
            data_dir,
            host,
            port,
            frontend_dir,
            api_base,
            pixabay_api_key: non_empty(PIXABAY_KEY_ENV),
            gemini_api_key,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILENAME)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
