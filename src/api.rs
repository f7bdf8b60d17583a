use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, RawQuery, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;

use crate::live::LiveChannel;
use crate::store::HaikuStore;
use crate::translate::{TranslateError, Translator};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<HaikuStore>,
    pub live: LiveChannel,
    pub translator: Translator,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/haikus", get(haiku_events))
        .route("/api/translate", post(translate))
        .route("/api/translations", get(translations))
        .route("/debug/store", get(debug_store))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Request errors, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Upstream(String),
    Internal(String),
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<TranslateError> for ApiError {
    fn from(e: TranslateError) -> Self {
        match e {
            TranslateError::Upstream => ApiError::Upstream("Translation failed".to_string()),
            TranslateError::Cache(_) => ApiError::Internal("Internal server error".to_string()),
        }
    }
}

async fn haiku_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.live.open();

    let stream = ReceiverStream::new(rx).filter_map(|ev| async move {
        match ev.to_sse() {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!(target: "api", error = %e, event = ev.name(), "failed to serialize live event");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[derive(serde::Deserialize)]
struct TranslateReq {
    #[serde(default)]
    text: Option<String>,
}

#[derive(serde::Serialize)]
struct TranslateResp {
    translation: String,
}

async fn translate(
    State(state): State<AppState>,
    body: Result<Json<TranslateReq>, JsonRejection>,
) -> Result<Json<TranslateResp>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let text = req
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required field: text".to_string()))?;

    let translation = state.translator.translate(&text).await.map_err(|e| {
        tracing::error!(target: "api", error = %e, "translation request failed");
        ApiError::from(e)
    })?;
    Ok(Json(TranslateResp { translation }))
}

#[derive(serde::Serialize)]
struct TranslationsResp {
    translations: BTreeMap<String, String>,
}

/// Pull `texts` out of the raw query and decode each comma-separated entry on its own,
/// so encoded commas inside a text survive.
pub fn parse_texts_param(query: &str) -> Vec<String> {
    query
        .split('&')
        .filter_map(|pair| pair.strip_prefix("texts="))
        .flat_map(|raw| raw.split(','))
        .filter(|t| !t.is_empty())
        .filter_map(|t| {
            url::form_urlencoded::parse(t.as_bytes())
                .next()
                .map(|(decoded, _)| decoded.into_owned())
        })
        .collect()
}

async fn translations(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<TranslationsResp>, ApiError> {
    let texts = query.as_deref().map(parse_texts_param).unwrap_or_default();
    if texts.is_empty() {
        return Ok(Json(TranslationsResp {
            translations: BTreeMap::new(),
        }));
    }

    let translations = state.translator.cached(texts).await.map_err(|e| {
        tracing::error!(target: "api", error = %e, "translation lookup failed");
        ApiError::from(e)
    })?;
    Ok(Json(TranslationsResp { translations }))
}

#[derive(serde::Serialize)]
struct StoreInfo {
    haikus: usize,
    processed: usize,
    secs_since_clear: Option<u64>,
}

async fn debug_store(State(state): State<AppState>) -> Json<StoreInfo> {
    Json(StoreInfo {
        haikus: state.store.len(),
        processed: state.store.processed_count(),
        secs_since_clear: state.store.last_clear().map(|t| t.elapsed().as_secs()),
    })
}
