//! HTTP surface. Every aggregator/analyzer/scheduler operation is exposed as
//! a route with a `{success, data | error}` envelope. Parameter validation
//! happens once here; the core only ever sees typed, validated values.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::aggregator::Aggregator;
use crate::analyze::Analyzer;
use crate::error::EngineError;
use crate::model::Timeframe;
use crate::sources::SourceRegistry;
use crate::store::SqliteStore;
use crate::sync::{SyncOptions, SyncService};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub analyzer: Arc<Analyzer>,
    pub sync: Arc<SyncService>,
    pub registry: Arc<SourceRegistry>,
    pub store: SqliteStore,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(latest_news))
        .route("/api/news/search", get(search_news))
        .route("/api/news/{id}/summary", get(news_summary))
        .route("/api/trends", get(trends))
        .route("/api/topics/trending", get(trending_topics))
        .route("/api/sources", get(sources))
        .route("/api/sources/{name}/news", get(news_by_source))
        .route("/api/sync", post(sync_now))
        .route("/api/sync/status", get(sync_status))
        .route("/api/cleanup", post(cleanup))
        .route("/api/stats", get(stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn ok<T: serde::Serialize>(data: T) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": message.into() })),
    )
        .into_response()
}

fn fail_from(e: EngineError) -> Response {
    let status = match &e {
        EngineError::ArticleNotFound(_) | EngineError::SourceNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    fail(status, e.to_string())
}

fn parse_timeframe(raw: Option<&str>, default: Timeframe) -> Result<Timeframe, Response> {
    match raw {
        None => Ok(default),
        Some(s) => Timeframe::parse(s)
            .ok_or_else(|| fail_from(EngineError::InvalidInput(format!("invalid timeframe: {s}")))),
    }
}

const DEFAULT_LIMIT: usize = 10;

#[derive(Deserialize)]
struct LatestParams {
    limit: Option<usize>,
    category: Option<String>,
}

async fn latest_news(State(state): State<AppState>, Query(p): Query<LatestParams>) -> Response {
    let limit = p.limit.unwrap_or(DEFAULT_LIMIT);
    match state.aggregator.get_latest(limit, p.category.as_deref()).await {
        Ok(items) => ok(items),
        Err(e) => fail_from(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    query: Option<String>,
    limit: Option<usize>,
    date_range: Option<String>,
}

async fn search_news(State(state): State<AppState>, Query(p): Query<SearchParams>) -> Response {
    let Some(query) = p.query.filter(|q| !q.trim().is_empty()) else {
        return fail_from(EngineError::InvalidInput(
            "missing required parameter: query".into(),
        ));
    };
    let range = match parse_timeframe(p.date_range.as_deref(), Timeframe::Week) {
        Ok(tf) => tf,
        Err(resp) => return resp,
    };
    let limit = p.limit.unwrap_or(DEFAULT_LIMIT);
    match state.aggregator.search_news(&query, limit, range, None).await {
        Ok(items) => ok(items),
        Err(e) => fail_from(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryParams {
    include_key_points: Option<bool>,
}

async fn news_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(p): Query<SummaryParams>,
) -> Response {
    match state
        .analyzer
        .get_summary(&id, p.include_key_points.unwrap_or(true))
        .await
    {
        Ok(summary) => ok(summary),
        Err(e) => fail_from(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendsParams {
    timeframe: Option<String>,
    include_stats: Option<bool>,
}

async fn trends(State(state): State<AppState>, Query(p): Query<TrendsParams>) -> Response {
    let timeframe = match parse_timeframe(p.timeframe.as_deref(), Timeframe::Month) {
        Ok(tf) => tf,
        Err(resp) => return resp,
    };
    match state
        .analyzer
        .get_trends(timeframe, p.include_stats.unwrap_or(true))
        .await
    {
        Ok(report) => ok(report),
        Err(e) => fail_from(e),
    }
}

#[derive(Deserialize)]
struct TrendingParams {
    timeframe: Option<String>,
}

async fn trending_topics(
    State(state): State<AppState>,
    Query(p): Query<TrendingParams>,
) -> Response {
    let timeframe = match parse_timeframe(p.timeframe.as_deref(), Timeframe::Week) {
        Ok(tf) => tf,
        Err(resp) => return resp,
    };
    match state.aggregator.get_trending_topics(timeframe).await {
        Ok(topics) => ok(topics),
        Err(e) => fail_from(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourcesParams {
    include_status: Option<bool>,
}

async fn sources(State(state): State<AppState>, Query(p): Query<SourcesParams>) -> Response {
    match state
        .registry
        .list_sources(p.include_status.unwrap_or(false))
        .await
    {
        Ok(items) => ok(items),
        Err(e) => fail_from(e),
    }
}

#[derive(Deserialize)]
struct BySourceParams {
    limit: Option<usize>,
}

async fn news_by_source(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(p): Query<BySourceParams>,
) -> Response {
    match state
        .aggregator
        .get_news_by_source(&name, p.limit.unwrap_or(DEFAULT_LIMIT))
        .await
    {
        Ok(items) => ok(items),
        Err(e) => fail_from(e),
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SyncBody {
    #[serde(default)]
    force: bool,
    #[serde(default)]
    sources: Option<Vec<String>>,
    #[serde(default)]
    max_age: Option<u64>,
}

async fn sync_now(State(state): State<AppState>, body: Option<Json<SyncBody>>) -> Response {
    let Json(body) = body.unwrap_or_default();
    let options = SyncOptions {
        force: body.force,
        sources: body.sources,
        max_age: body.max_age,
    };
    match state.sync.sync_news(options).await {
        Ok(result) => {
            state.aggregator.clear_cache();
            ok(result)
        }
        Err(e) => fail_from(e),
    }
}

async fn sync_status(State(state): State<AppState>) -> Response {
    match state.sync.sync_status().await {
        Ok(status) => ok(status),
        Err(e) => fail_from(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CleanupBody {
    days_old: Option<u32>,
}

async fn cleanup(State(state): State<AppState>, body: Option<Json<CleanupBody>>) -> Response {
    let days = body.and_then(|Json(b)| b.days_old).unwrap_or(30);
    let deleted = state.sync.cleanup_old_data(days);
    ok(json!({ "deleted": deleted }))
}

async fn stats(State(state): State<AppState>) -> Response {
    match state.store.stats() {
        Ok(stats) => {
            let (cache_entries, cache_keys) = state.aggregator.cache_stats();
            ok(json!({
                "store": stats,
                "cache": { "entries": cache_entries, "keys": cache_keys },
            }))
        }
        Err(e) => fail_from(e),
    }
}
