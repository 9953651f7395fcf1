//! User-facing handlers: balance, actions, ranking

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{models::*, observability::metrics, AppState};

/// Ranking size when the caller does not ask for one.
const DEFAULT_RANKING_LIMIT: i64 = 10;
const MAX_RANKING_LIMIT: i64 = 100;

/// GET /users/:id/balance
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, (StatusCode, String)> {
    let balance = state
        .engine
        .query_balance(&user_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(BalanceResponse { user_id, balance }))
}

/// POST /users/:id/actions
pub async fn perform_action(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResult>, (StatusCode, String)> {
    let result = state
        .engine
        .perform_action(&user_id, request)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let counter = if result.accepted {
        metrics::ACTIONS_SETTLED
    } else {
        metrics::ACTIONS_REJECTED
    };
    state.metrics.increment(counter, 1).await;

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct RankingParams {
    pub limit: Option<i64>,
}

/// GET /ranking?limit=N
pub async fn get_ranking(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RankingParams>,
) -> Result<Json<RankingResponse>, (StatusCode, String)> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RANKING_LIMIT)
        .clamp(1, MAX_RANKING_LIMIT);

    let entries = state
        .engine
        .get_ranking(limit)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(RankingResponse { entries }))
}
