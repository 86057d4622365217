//! Step content saving, session snapshots and history commits

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body, present};
use crate::error::{ApiError, ApiResult, CoreError};
use crate::models::{
    Decomposition, RequestParameters, Session, SessionId, StepArtifacts, StepContentSnapshot,
};
use crate::services::SaveStepRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveContentBody {
    pub session_id: Option<String>,
    pub step_index: Option<u32>,
    pub step_name: Option<String>,
    pub lyrics: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHistoryBody {
    pub session_id: Option<String>,
    pub decomposed_data: Option<Decomposition>,
    pub step_contents: Option<Vec<StepContentSnapshot>>,
    #[serde(flatten)]
    pub parameters: RequestParameters,
}

/// POST /api/save-content
pub async fn save_content(
    State(state): State<AppState>,
    payload: Result<Json<SaveContentBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = body(payload)?;
    let (Some(step_number), Some(step_name)) = (
        request.step_index.filter(|n| *n > 0),
        present(request.step_name),
    ) else {
        return Err(ApiError::BadRequest(
            "stepIndex and stepName are required".to_string(),
        ));
    };
    let session_id = present(request.session_id)
        .map(|id| SessionId::parse(&id))
        .transpose()?;

    let report = state
        .store
        .save_step(SaveStepRequest {
            session_id,
            step_number,
            step_name,
            lyrics: present(request.lyrics),
            image_url: present(request.image_url),
            audio_url: present(request.audio_url),
        })
        .await?;

    let message = report
        .outcomes
        .iter()
        .map(|o| match (&o.path, &o.error) {
            (Some(path), _) => format!("{}: {}", o.kind, path.display()),
            (None, Some(error)) => format!("{} failed: {}", o.kind, error),
            (None, None) => format!("{}: skipped", o.kind),
        })
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Json(json!({
        "success": true,
        "message": message,
        "savedDir": report.session_dir,
        "sessionId": report.session_id,
        "outcomes": report.outcomes,
    })))
}

/// Rebuild the working session a client holds, aligning contents by index
fn session_from_body(request: SaveHistoryBody) -> ApiResult<Session> {
    let (Some(session_id), Some(decomposition), Some(step_contents)) = (
        present(request.session_id),
        request.decomposed_data,
        request.step_contents,
    ) else {
        return Err(ApiError::BadRequest(
            "sessionId, decomposedData, and stepContents are required".to_string(),
        ));
    };
    let session_id = SessionId::parse(&session_id)?;

    let step_count = decomposition.steps.len();
    if step_contents.len() > step_count {
        return Err(CoreError::Validation(format!(
            "{} step contents for {} steps",
            step_contents.len(),
            step_count
        ))
        .into());
    }
    // Missing trailing entries stay pending and fail the completion gate
    let artifacts = (0..step_count)
        .map(|i| {
            step_contents
                .get(i)
                .map(StepContentSnapshot::to_step_artifacts)
                .unwrap_or_else(StepArtifacts::default)
        })
        .collect();

    Ok(Session::restore(
        session_id,
        request.parameters.fill_blank_defaults(),
        decomposition,
        artifacts,
        songstep_common::time::now(),
    )?)
}

/// POST /api/save-history
///
/// Persists the working session, then commits it to history only if every
/// slot of every step is terminal (409 otherwise, with nothing written to
/// history).
pub async fn save_history(
    State(state): State<AppState>,
    payload: Result<Json<SaveHistoryBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let session = session_from_body(body(payload)?)?;
    state.store.persist_session(&session).await?;
    let record = state.store.commit_history(&session).await?;

    Ok(Json(json!({
        "success": true,
        "message": "History saved successfully",
        "historyPath": state.store.history_path(&record.session_id),
        "sessionId": record.session_id,
        "createdAt": record.created_at,
    })))
}

/// GET /api/session/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let session_id = SessionId::parse(&session_id)?;
    let session = state.store.load_session(&session_id).await?;
    Ok(Json(json!({ "success": true, "data": session })))
}

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/api/save-content", post(save_content))
        .route("/api/save-history", post(save_history))
        .route("/api/session/:session_id", get(get_session))
}
