pub mod error;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use error::ApiError;
use media_core::tokenizer::normalize_term;
use media_core::{
    now_ms, CatalogWriter, CounterService, FanInAggregator, Ingestor, MediaKind, MediaProvider, SearchQuery,
    StoreHandle,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const DEFAULT_FEED_LIMIT: usize = 50;
pub const MAX_FEED_LIMIT: usize = 200;

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogWriter,
    pub counters: CounterService,
    pub feed: FanInAggregator,
    pub ingest: Ingestor,
    pub provider: Arc<dyn MediaProvider>,
    /// Cancelled on shutdown; every feed wait runs on a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(handle: StoreHandle, provider: Arc<dyn MediaProvider>, feed_window: Duration) -> Self {
        Self {
            catalog: CatalogWriter::new(handle.clone()),
            counters: CounterService::new(handle.clone()),
            feed: FanInAggregator::with_window(handle.clone(), feed_window),
            ingest: Ingestor::new(handle),
            provider,
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/search", get(search_handler))
        .route("/api/feed", get(feed_handler))
        .route("/api/media", get(media_handler))
        .route("/api/like", post(like_handler))
        .route("/api/unlike", post(unlike_handler))
        .route("/api/download", post(download_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub orientation: Option<String>,
    pub safesearch: Option<String>,
    pub per_page: Option<String>,
}

impl SearchParams {
    fn to_query(&self) -> SearchQuery {
        SearchQuery {
            q: pick_query(&self.query, &self.q),
            kind: self.kind.as_deref().map(MediaKind::parse_lenient).unwrap_or_default(),
            category: self.category.clone(),
            orientation: self.orientation.clone(),
            safesearch: self.safesearch.as_deref().map(parse_flag).unwrap_or(true),
            per_page: self.per_page.as_deref().and_then(|s| s.trim().parse().ok()).unwrap_or(DEFAULT_PER_PAGE),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub query: Option<String>,
    pub q: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaParams {
    pub id: Option<String>,
}

/// JSON body of like/unlike/download. Ids may arrive as strings or numbers.
#[derive(Debug, Default, Deserialize)]
pub struct CounterBody {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub uid: Option<Value>,
}

fn pick_query(query: &Option<String>, q: &Option<String>) -> String {
    query.as_deref().or(q.as_deref()).unwrap_or_default().trim().to_string()
}

fn parse_flag(raw: &str) -> bool {
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off")
}

fn field(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult {
    let query = params.to_query();
    let hits = state.provider.search(&query).await?;
    let term = normalize_term(&query.q);
    let items = state.ingest.ingest(&hits, query.kind, &term, now_ms()).await?;
    Ok(Json(json!({
        "ok": true,
        "count": items.len(),
        "query": query.q,
        "type": query.kind,
        "items": items,
    })))
}

pub async fn feed_handler(State(state): State<AppState>, Query(params): Query<FeedParams>) -> ApiResult {
    let query = pick_query(&params.query, &params.q);
    let limit = params
        .limit
        .as_deref()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_FEED_LIMIT)
        .clamp(1, MAX_FEED_LIMIT);
    // dropping this handler (client went away) cancels the wait
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let items = state.feed.list_by_term(&query, limit, &cancel).await?;
    Ok(Json(json!({
        "ok": true,
        "count": items.len(),
        "query": query,
        "items": items,
    })))
}

pub async fn media_handler(State(state): State<AppState>, Query(params): Query<MediaParams>) -> ApiResult {
    let id = params
        .id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("id required"))?;
    let item = state.catalog.get_with_counters(&id).await?;
    Ok(Json(json!({ "ok": true, "item": item })))
}

fn id_and_uid(body: Result<Json<CounterBody>, JsonRejection>) -> Result<(String, String), ApiError> {
    let missing = || ApiError::validation("id and uid required");
    let Json(body) = body.map_err(|_| missing())?;
    match (field(&body.id), field(&body.uid)) {
        (Some(id), Some(uid)) => Ok((id, uid)),
        _ => Err(missing()),
    }
}

pub async fn like_handler(State(state): State<AppState>, body: Result<Json<CounterBody>, JsonRejection>) -> ApiResult {
    let (id, uid) = id_and_uid(body)?;
    let outcome = state.counters.like(&id, &uid).await?;
    Ok(Json(with_ok(serde_json::to_value(outcome).map_err(media_core::CatalogError::from)?)))
}

pub async fn unlike_handler(State(state): State<AppState>, body: Result<Json<CounterBody>, JsonRejection>) -> ApiResult {
    let (id, uid) = id_and_uid(body)?;
    let outcome = state.counters.unlike(&id, &uid).await?;
    Ok(Json(with_ok(serde_json::to_value(outcome).map_err(media_core::CatalogError::from)?)))
}

pub async fn download_handler(State(state): State<AppState>, body: Result<Json<CounterBody>, JsonRejection>) -> ApiResult {
    let id = body
        .ok()
        .and_then(|Json(b)| field(&b.id))
        .ok_or_else(|| ApiError::validation("id required"))?;
    let downloads = state.counters.download(&id).await?;
    Ok(Json(json!({ "ok": true, "downloads": downloads })))
}

fn with_ok(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert("ok".into(), Value::Bool(true));
    }
    value
}
