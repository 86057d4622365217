//! Stored artifact retrieval

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use super::present;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AssetQuery {
    pub session: Option<String>,
    pub step: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// GET /api/asset?session=<id>&step=<n>&type=<image|audio|lyrics>
///
/// Missing lyrics come back as an empty text body; missing images or audio
/// are 404.
pub async fn get_asset(
    State(state): State<AppState>,
    Query(query): Query<AssetQuery>,
) -> ApiResult<Response> {
    let (Some(session), Some(step), Some(kind)) = (
        present(query.session),
        present(query.step),
        present(query.kind),
    ) else {
        return Err(ApiError::BadRequest(
            "Missing required parameters: session, step, type".to_string(),
        ));
    };

    let asset = state.store.resolve_asset(&session, &step, &kind).await?;
    let content_type = HeaderValue::from_static(asset.content_type);
    Ok(([(header::CONTENT_TYPE, content_type)], asset.bytes).into_response())
}

pub fn asset_routes() -> Router<AppState> {
    Router::new().route("/api/asset", get(get_asset))
}
