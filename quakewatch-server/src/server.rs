///! HTTP surface: pull endpoint, SSE event stream, pass-throughs

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::module::faults;
use crate::module::quake::{Quake, QuakeError, SnapshotCache, SubscriberRegistry};
use crate::module::usgs::{self, CatalogQuery};

/// Interval between SSE keep-alive comment frames
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Accepted formats for the `start`/`end` query parameters
const QUERY_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SnapshotCache>,
    pub registry: Arc<SubscriberRegistry>,
    /// Client for the pass-through endpoints; verifies TLS normally
    pub client: reqwest::Client,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .route("/api/quakes", get(list_quakes))
        .route("/api/quakes/stream", get(quake_stream))
        .route("/api/usgs", get(usgs_passthrough))
        .route("/api/faults", get(faults_passthrough))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error responses for the JSON endpoints
enum ApiError {
    BadRequest(String),
    Upstream,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Upstream => (
                StatusCode::BAD_GATEWAY,
                "upstream data source unavailable".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<QuakeError> for ApiError {
    fn from(e: QuakeError) -> Self {
        tracing::error!("Quake query failed: {}", e);
        ApiError::Upstream
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "service": "quakewatch-server",
        "version": env!("CARGO_PKG_VERSION"),
        "subscribers": state.registry.subscriber_count().await,
        "cache_age_seconds": state.cache.age().await.map(|age| age.as_secs()),
    }))
}

#[derive(Debug, Deserialize)]
struct QuakeListQuery {
    start: Option<String>,
    end: Option<String>,
    /// Presence alone bypasses the cache TTL
    #[serde(rename = "forceRefresh")]
    force_refresh: Option<String>,
}

/// Pull endpoint: current snapshot, optionally time-filtered.
async fn list_quakes(
    State(state): State<AppState>,
    Query(params): Query<QuakeListQuery>,
) -> Result<Json<Vec<Quake>>, ApiError> {
    let start = parse_bound(params.start.as_deref(), "start")?;
    let end = parse_bound(params.end.as_deref(), "end")?;
    let force = params.force_refresh.is_some();

    let mut quakes = state.cache.get_or_refresh(force).await?;

    if start.is_some() || end.is_some() {
        quakes.retain(|quake| match quake.parsed_datetime() {
            // Inclusive at both bounds
            Some(dt) => start.is_none_or(|s| dt >= s) && end.is_none_or(|e| dt <= e),
            // Unparsable timestamps are dropped from filtered results
            None => false,
        });
    }

    Ok(Json(quakes))
}

fn parse_bound(text: Option<&str>, name: &str) -> Result<Option<NaiveDateTime>, ApiError> {
    match text {
        None => Ok(None),
        Some(raw) => parse_query_time(raw).map(Some).ok_or_else(|| {
            ApiError::BadRequest(format!("unparseable '{}' timestamp: {}", name, raw))
        }),
    }
}

fn parse_query_time(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    for fmt in QUERY_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    // Date-only bounds resolve to midnight
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Event-stream endpoint: pushes each newly detected earthquake as a
/// `data: <JSON>` frame. No replay on connect; keep-alive comment frames
/// hold the connection open through idle intermediaries.
async fn quake_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (_id, rx) = state.registry.subscribe().await;
    let stream = ReceiverStream::new(rx).map(|quake| Event::default().json_data(&quake));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

async fn usgs_passthrough(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let body = usgs::query_catalog(&state.client, &query).await.map_err(|e| {
        tracing::error!("USGS pass-through failed: {:#}", e);
        ApiError::Upstream
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

async fn faults_passthrough(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let body = faults::query_active_faults(&state.client).await.map_err(|e| {
        tracing::error!("Active-faults pass-through failed: {:#}", e);
        ApiError::Upstream
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}
