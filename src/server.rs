//! Companion backend: search proxy, provider accounts, AI generation and the
//! static frontend.

use crate::ai::AiGenerationClient;
use crate::config::AppConfig;
use crate::error::{GalleryError, GalleryResult};
use crate::fetch::AssetFetchClient;
use crate::generation::{GenerationService, ProviderRegistry};
use crate::model::{ErrorBody, FilterOptions, GenerateRequest, NewProviderAccount, Orientation, TypeFilter};
use crate::pixabay::PixabayClient;
use crate::sample_catalog::SampleCatalog;
use serde::Deserialize;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const JSON_BODY_LIMIT: u64 = 10 * 1024 * 1024;

/// Everything the handlers share. Built once at startup.
pub struct BackendState {
    pub assets: Arc<dyn AssetFetchClient>,
    pub providers: Arc<ProviderRegistry>,
    pub generator: Arc<dyn AiGenerationClient>,
}

impl BackendState {
    pub fn from_config(config: &AppConfig) -> GalleryResult<Self> {
        let assets: Arc<dyn AssetFetchClient> = match &config.pixabay_api_key {
            Some(key) => Arc::new(PixabayClient::new(key.clone())?),
            None => {
                tracing::warn!("PIXABAY_API_KEY not set; serving the sample catalog");
                Arc::new(SampleCatalog::default())
            }
        };
        if config.gemini_api_key.is_none() {
            tracing::warn!("no Gemini API key configured; Gemini generation will be refused");
        }
        let providers = Arc::new(ProviderRegistry::default());
        let generator = Arc::new(GenerationService::new(
            providers.clone(),
            config.gemini_api_key.clone(),
        )?);
        Ok(Self {
            assets,
            providers,
            generator,
        })
    }
}

pub type SharedState = Arc<BackendState>;

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(rename = "type", default)]
    type_filter: TypeFilter,
    #[serde(default)]
    orientation: Orientation,
    #[serde(default)]
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SuggestionParams {
    #[serde(default)]
    q: String,
}

fn with_state(state: SharedState) -> impl Filter<Extract = (SharedState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn message_reply(status: StatusCode, message: impl Into<String>) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ErrorBody {
        message: message.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn generation_status(err: &GalleryError) -> StatusCode {
    match err {
        GalleryError::Validation(_) => StatusCode::BAD_REQUEST,
        GalleryError::UnknownProvider(_) | GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
        GalleryError::Network(_) | GalleryError::Provider { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn handle_search(params: SearchParams, state: SharedState) -> Result<impl Reply, Infallible> {
    let filters = FilterOptions::new(params.type_filter, params.orientation);
    let page = params.page.unwrap_or(1).max(1);
    tracing::info!(query = %params.q, page, "search request");
    match state.assets.search(params.q.trim(), filters, page).await {
        Ok(results) => Ok(warp::reply::with_status(
            warp::reply::json(&results),
            StatusCode::OK,
        )),
        Err(err) => {
            tracing::error!("search failed: {}", err);
            Ok(message_reply(StatusCode::BAD_GATEWAY, "Failed to fetch assets."))
        }
    }
}

async fn handle_suggestions(
    params: SuggestionParams,
    state: SharedState,
) -> Result<impl Reply, Infallible> {
    let suggestions = match state.assets.suggestions(&params.q).await {
        Ok(suggestions) => suggestions,
        Err(err) => {
            tracing::warn!(query = %params.q, "suggestions failed: {}", err);
            Vec::new()
        }
    };
    Ok(warp::reply::json(&suggestions))
}

async fn handle_linked_accounts(state: SharedState) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.providers.list()))
}

async fn handle_add_provider(
    body: NewProviderAccount,
    state: SharedState,
) -> Result<impl Reply, Infallible> {
    match state.providers.add(body) {
        Ok(account) => Ok(warp::reply::with_status(
            warp::reply::json(&account),
            StatusCode::CREATED,
        )),
        Err(err) => Ok(message_reply(StatusCode::BAD_REQUEST, err.user_message())),
    }
}

async fn handle_remove_account(
    provider_id: String,
    state: SharedState,
) -> Result<impl Reply, Infallible> {
    match state.providers.remove(&provider_id) {
        Ok(_) => Ok(message_reply(StatusCode::OK, "Account removed successfully.")),
        Err(_) => Ok(message_reply(StatusCode::NOT_FOUND, "Account not found.")),
    }
}

async fn handle_generate(
    body: GenerateRequest,
    state: SharedState,
) -> Result<impl Reply, Infallible> {
    let result = state
        .generator
        .generate(&body.prompt, body.aspect_ratio, &body.provider_id)
        .await;
    match result {
        Ok(assets) => Ok(warp::reply::with_status(
            warp::reply::json(&assets),
            StatusCode::OK,
        )),
        Err(err) => {
            let status = generation_status(&err);
            tracing::error!(provider_id = %body.provider_id, status = status.as_u16(), "generation failed: {}", err);
            Ok(message_reply(status, err.user_message()))
        }
    }
}

pub fn api_routes(
    state: SharedState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let search = warp::path!("api" / "search")
        .and(warp::get())
        .and(warp::query::<SearchParams>())
        .and(with_state(state.clone()))
        .and_then(handle_search);

    let suggestions = warp::path!("api" / "suggestions")
        .and(warp::get())
        .and(warp::query::<SuggestionParams>())
        .and(with_state(state.clone()))
        .and_then(handle_suggestions);

    let linked_accounts = warp::path!("api" / "linked-accounts")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_linked_accounts);

    let add_provider = warp::path!("api" / "add-ai-provider")
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handle_add_provider);

    let remove_account = warp::path!("api" / "remove-linked-account" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(handle_remove_account);

    let generate = warp::path!("api" / "ai-generate")
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(handle_generate);

    search
        .or(suggestions)
        .or(linked_accounts)
        .or(add_provider)
        .or(remove_account)
        .or(generate)
}

/// Static files, falling back to `index.html` for client-side routes.
pub fn frontend_routes(
    frontend_dir: &Path,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index: PathBuf = frontend_dir.join("index.html");
    warp::get()
        .and(warp::fs::dir(frontend_dir.to_path_buf()))
        .or(warp::get().and(warp::fs::file(index)))
}

/// The API answers cross-origin calls from a separately hosted frontend.
fn api_cors() -> warp::filters::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "DELETE"])
        .allow_headers(vec!["content-type", "accept"])
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found.".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", err))
    } else if rejection.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query parameters.".to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large.".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, err.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.".to_string())
    } else {
        tracing::error!("unhandled rejection: {:?}", rejection);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".to_string())
    };
    Ok(message_reply(status, message))
}

pub fn routes(
    state: SharedState,
    frontend_dir: &Path,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    api_routes(state)
        .with(api_cors())
        .or(frontend_routes(frontend_dir))
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: &AppConfig) -> GalleryResult<()> {
    let state = Arc::new(BackendState::from_config(config)?);
    let filter = routes(state, &config.frontend_dir);
    let (addr, server) = warp::serve(filter).try_bind_with_graceful_shutdown(
        config.listen_addr(),
        async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", err);
            }
        },
    )?;
    tracing::info!(%addr, frontend = %config.frontend_dir.display(), "asset gallery backend listening");
    server.await;
    tracing::info!("backend stopped");
    Ok(())
}
