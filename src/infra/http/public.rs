use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use metrics::counter;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    application::collections::{CollectionError, CollectionService},
    domain::{collections::STATS_DOCUMENT, types::CacheTier},
};

use super::{
    cache_control::apply_cache_tier,
    error::ApiError,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub collections: Arc<CollectionService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/collection/{name}", get(list_collection))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(apply_cache_tier))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

fn with_tier(mut response: Response, tier: CacheTier) -> Response {
    response.extensions_mut().insert(tier);
    response
}

async fn list_collection(
    State(state): State<HttpState>,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    match state.collections.list(&name, query.as_deref()).await {
        Ok(page) => {
            counter!("databyte_collection_requests_total", "collection" => name).increment(1);
            with_tier(Json(page.result).into_response(), page.tier)
        }
        Err(CollectionError::UnknownCollection(name)) => ApiError::not_found(
            "infra::http::public::list_collection",
            "Collection not found",
            format!("no collection named `{name}`"),
        )
        .into_response(),
        Err(CollectionError::Store(err)) => ApiError::store_unavailable(
            "infra::http::public::list_collection",
            "Failed to load collection",
            &err,
        )
        .into_response(),
    }
}

async fn stats(State(state): State<HttpState>) -> Response {
    match state.collections.stats().await {
        Ok(document) => with_tier(
            Json(document).into_response(),
            state.collections.tier_for(STATS_DOCUMENT),
        ),
        Err(err) => ApiError::store_unavailable(
            "infra::http::public::stats",
            "Failed to load statistics",
            &err,
        )
        .into_response(),
    }
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        timestamp: OffsetDateTime::now_utc(),
    })
}

async fn fallback(uri: axum::http::Uri) -> Response {
    ApiError::not_found(
        "infra::http::public::fallback",
        "Route not found",
        format!("no route for `{}`", uri.path()),
    )
    .into_response()
}
