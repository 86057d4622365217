//! Decomposition, lyrics and illustration endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body, present};
use crate::error::{ApiError, ApiResult};
use crate::models::{CharacterProfile, ImageRequest, LearningStep, RequestParameters};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsBody {
    pub step: Option<LearningStep>,
    pub character_name: Option<String>,
    pub music_style: Option<String>,
    pub music_voice: Option<String>,
    pub step_number: Option<usize>,
    pub total_steps: Option<usize>,
}

/// POST /api/decompose-prompt
pub async fn decompose_prompt(
    State(state): State<AppState>,
    payload: Result<Json<RequestParameters>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let params = body(payload)?.fill_blank_defaults();
    let decomposition = state.orchestrator.decompose(&params).await?;
    Ok(Json(json!({ "success": true, "result": decomposition })))
}

/// POST /api/generate-lyrics
pub async fn generate_lyrics(
    State(state): State<AppState>,
    payload: Result<Json<LyricsBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = body(payload)?;
    let (Some(step), Some(character_name)) = (request.step, present(request.character_name)) else {
        return Err(ApiError::BadRequest(
            "step and characterName are required".to_string(),
        ));
    };

    let mut params = RequestParameters::default();
    if let Some(style) = present(request.music_style) {
        params.music_style = style;
    }
    if let Some(voice) = present(request.music_voice) {
        params.music_voice = voice;
    }
    let character = CharacterProfile {
        name: character_name,
        description: String::new(),
        reference_prompt: None,
    };
    let step_number = request.step_number.unwrap_or(1).max(1);
    let total_steps = request.total_steps.unwrap_or(1).max(step_number);

    let lyrics = state
        .orchestrator
        .lyrics_for(&step, &character, &params, step_number, total_steps)
        .await?;
    Ok(Json(json!({ "success": true, "lyrics": lyrics })))
}

/// POST /api/generate-image
pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = body(payload)?;
    let result = state.provider.generate_image(&request).await?;
    Ok(Json(json!(result)))
}

pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/decompose-prompt", post(decompose_prompt))
        .route("/api/generate-lyrics", post(generate_lyrics))
        .route("/api/generate-image", post(generate_image))
}
