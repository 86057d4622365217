//! Song submission and status polling endpoints

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body, present};
use crate::error::{ApiError, ApiResult};
use crate::models::MusicRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub id: Option<String>,
}

/// POST /api/suno/submit/music
///
/// Accepts either wire spelling (`mv`/`model`,
/// `make_instrumental`/`instrumental`); the configured dialect decides the
/// upstream shape.
pub async fn submit_music(
    State(state): State<AppState>,
    payload: Result<Json<MusicRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = body(payload)?;
    let submission = state.provider.submit_music(&request).await?;
    Ok(Json(json!({ "success": true, "data": submission })))
}

/// GET /api/suno/fetch?id=<task id>
pub async fn fetch_music(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> ApiResult<Json<Value>> {
    let id = present(query.id).ok_or_else(|| ApiError::BadRequest("missing id".to_string()))?;
    let status = state.provider.fetch_music_status(&id).await?;
    Ok(Json(json!({ "success": true, "data": status })))
}

pub fn music_routes() -> Router<AppState> {
    Router::new()
        .route("/api/suno/submit/music", post(submit_music))
        .route("/api/suno/fetch", get(fetch_music))
}
