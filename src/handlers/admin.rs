//! Admin handlers: balance adjustment and policy management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::error::EngineError;
use crate::policy::{Policy, PolicyPatch};
use crate::{models::*, observability::metrics, AppState};

/// POST /admin/users/:id/balance - signed adjustment, no eligibility checks
pub async fn adjust_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(request): Json<AdjustBalanceRequest>,
) -> Result<Json<AdjustBalanceResponse>, (StatusCode, String)> {
    let new_balance = state
        .engine
        .admin_adjust_balance(&user_id, request.amount)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    state.metrics.increment(metrics::ADMIN_ADJUSTMENTS, 1).await;

    Ok(Json(AdjustBalanceResponse {
        user_id,
        new_balance,
    }))
}

/// GET /admin/policy
pub async fn get_policy(State(state): State<Arc<AppState>>) -> Json<Policy> {
    Json(state.engine.current_policy().await)
}

/// PATCH /admin/policy - validated partial update to one game
pub async fn update_policy(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<PolicyPatch>,
) -> Result<Json<Policy>, (StatusCode, String)> {
    match state.engine.admin_update_policy(patch).await {
        Ok(policy) => {
            state.metrics.increment(metrics::POLICY_UPDATES, 1).await;
            Ok(Json(policy))
        }
        Err(EngineError::InvalidPolicy(message)) => {
            Err((StatusCode::UNPROCESSABLE_ENTITY, message))
        }
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
