//! Completed session history endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::models::SessionId;
use crate::AppState;

/// GET /api/history
///
/// Summaries of every readable record, newest first. Unreadable files are
/// skipped rather than failing the listing.
pub async fn list_history(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let history = state.store.list_history().await?;
    Ok(Json(json!({ "history": history })))
}

/// GET /api/history/:session_id
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let session_id = SessionId::parse(&session_id)?;
    let record = state.store.load_history(&session_id).await?;
    Ok(Json(json!({ "success": true, "data": record })))
}

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/api/history", get(list_history))
        .route("/api/history/:session_id", get(get_history))
}
