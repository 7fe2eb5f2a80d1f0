//! Liveness endpoint.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/health
///
/// Returns 200 with a database round-trip; unauthenticated.
pub async fn health(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    trialgate_db::health_check(&state.pool).await?;
    Ok(Json(json!({ "status": "ok" })))
}
