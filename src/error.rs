//! Error types shared by the gallery client core and the companion backend.

/// Failures of the persistent key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The store handle cannot be used (poisoned lock, closed backend).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration problems found while reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {variable}: {reason}")]
    InvalidValue { variable: String, reason: String },

    #[error("no usable application data directory could be resolved")]
    NoDataDirectory,
}

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    /// Rejected input (blank names, blank prompts).
    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown AI provider: {0}")]
    UnknownProvider(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Never carries the request URL, which may hold an API key.
    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The upstream answered, but not with something usable.
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("persistence error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("server error: {0}")]
    Server(#[from] warp::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GalleryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.without_url())
    }
}

impl GalleryError {
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    /// True for failures that came from talking to a remote service.
    pub fn is_network_or_provider(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Provider { .. })
    }

    /// Text suitable for showing inline in the view.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::NotFound(what) => format!("{} was not found.", what),
            Self::UnknownProvider(_) => "Selected AI provider not found.".to_string(),
            Self::MissingCredentials(message) => message.clone(),
            Self::Network(_) => {
                "Network request failed. Please check your connection and try again.".to_string()
            }
            Self::Provider { message, .. } => message.clone(),
            Self::InvalidUrl(err) => format!("Invalid address: {}", err),
            Self::Store(_) => "Your changes could not be saved.".to_string(),
            Self::Config(err) => err.to_string(),
            Self::Server(err) => err.to_string(),
            Self::Io(err) => err.to_string(),
        }
    }
}

pub type GalleryResult<T> = Result<T, GalleryError>;
pub type StoreResult<T> = Result<T, StoreError>;
