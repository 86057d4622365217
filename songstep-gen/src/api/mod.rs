//! HTTP API handlers for songstep-gen
//!
//! Thin framing over the core services: parse the request, call one
//! service operation, render the result or a structured error.

pub mod asset;
pub mod buildinfo;
pub mod content;
pub mod generation;
pub mod health;
pub mod history;
pub mod music;

pub use asset::asset_routes;
pub use buildinfo::get_build_info;
pub use content::content_routes;
pub use generation::generation_routes;
pub use health::health_routes;
pub use history::history_routes;
pub use music::music_routes;

use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::JsonRejection;
use axum::Json;

/// Unwrap a JSON body, turning extractor rejections into structured 400s
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Treat a blank optional string as absent
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
