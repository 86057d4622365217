//! Durable history snapshots of completed sessions

use crate::models::session::{
    Decomposition, RequestParameters, Session, SessionId, Slot, StepArtifacts,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Directory under the data root that holds committed records
pub const HISTORY_DIR: &str = "history";

/// Per-step artifact outcome as stored in history
///
/// A present artifact fills the content field; a failed one leaves the
/// content `null` and fills the matching `*Error` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepContentSnapshot {
    #[serde(default)]
    pub step_index: usize,
    #[serde(default)]
    pub lyrics: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub lyrics_error: Option<String>,
    #[serde(default)]
    pub image_error: Option<String>,
    #[serde(default)]
    pub audio_error: Option<String>,
}

fn split_slot(slot: &Slot<String>) -> (Option<String>, Option<String>) {
    match slot {
        Slot::Pending => (None, None),
        Slot::Error(message) => (None, Some(message.clone())),
        Slot::Present(value) => (Some(value.clone()), None),
    }
}

fn join_slot(content: &Option<String>, error: &Option<String>) -> Slot<String> {
    let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.is_empty()).cloned();
    match (non_empty(content), non_empty(error)) {
        (Some(value), _) => Slot::Present(value),
        (None, Some(message)) => Slot::Error(message),
        (None, None) => Slot::Pending,
    }
}

impl StepContentSnapshot {
    pub fn from_artifacts(step_index: usize, artifacts: &StepArtifacts) -> Self {
        let (lyrics, lyrics_error) = split_slot(&artifacts.lyrics);
        let (image_url, image_error) = split_slot(&artifacts.image);
        let (audio_url, audio_error) = split_slot(&artifacts.audio);
        Self {
            step_index,
            lyrics,
            image_url,
            audio_url,
            lyrics_error,
            image_error,
            audio_error,
        }
    }

    /// Slot view of this snapshot; empty strings count as absent
    pub fn to_step_artifacts(&self) -> StepArtifacts {
        StepArtifacts {
            lyrics: join_slot(&self.lyrics, &self.lyrics_error),
            image: join_slot(&self.image_url, &self.image_error),
            audio: join_slot(&self.audio_url, &self.audio_error),
        }
    }
}

/// Immutable snapshot of a session that passed the completion gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub parameters: RequestParameters,
    #[serde(rename = "decomposedData")]
    pub decomposition: Decomposition,
    pub step_contents: Vec<StepContentSnapshot>,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Snapshot a session as of now
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id().clone(),
            parameters: session.parameters().clone(),
            decomposition: session.decomposition().clone(),
            step_contents: session
                .artifacts()
                .iter()
                .enumerate()
                .map(|(i, a)| StepContentSnapshot::from_artifacts(i, a))
                .collect(),
            created_at: songstep_common::time::now(),
        }
    }

    pub fn step_artifacts(&self) -> Vec<StepArtifacts> {
        self.step_contents
            .iter()
            .map(StepContentSnapshot::to_step_artifacts)
            .collect()
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            session_id: self.session_id.clone(),
            user_goal: self.parameters.user_goal.clone(),
            created_at: self.created_at,
            step_count: self.decomposition.steps.len(),
        }
    }
}

/// Listing entry for the history index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub session_id: SessionId,
    pub user_goal: String,
    pub created_at: DateTime<Utc>,
    pub step_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_preserves_errors_as_null_content() {
        let artifacts = StepArtifacts {
            lyrics: Slot::Present("la la".into()),
            image: Slot::Error("quota".into()),
            audio: Slot::Present("https://cdn/a.mp3".into()),
        };
        let snapshot = StepContentSnapshot::from_artifacts(0, &artifacts);
        assert_eq!(snapshot.image_url, None);
        assert_eq!(snapshot.image_error.as_deref(), Some("quota"));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["imageUrl"].is_null());
        assert_eq!(json["lyrics"], "la la");

        assert_eq!(snapshot.to_step_artifacts(), artifacts);
    }

    #[test]
    fn test_empty_content_counts_as_pending() {
        let snapshot = StepContentSnapshot {
            lyrics: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(snapshot.to_step_artifacts().lyrics, Slot::Pending);
    }

    #[test]
    fn test_record_wire_shape() {
        let record: HistoryRecord = serde_json::from_value(serde_json::json!({
            "sessionId": "session_1",
            "userGoal": "wash hands",
            "decomposedData": {"steps": [{"step_number": 1, "step_name": "Soap"}]},
            "stepContents": [],
            "createdAt": "2026-01-02T03:04:05Z"
        }))
        .unwrap();
        let summary = record.summary();
        assert_eq!(summary.user_goal, "wash hands");
        assert_eq!(summary.step_count, 1);
        assert_eq!(record.parameters.music_style, "cheerful");
    }
}
