//! Music task polling state machine
//!
//! Song generation is asynchronous upstream: a submission returns a task id
//! and the caller polls for the result on a cadence of its choosing. Each
//! poll feeds the observed provider status into [`MusicTask::observe`].
//!
//! ```text
//! Submitted ──► Polling ──► Ready
//!     │            │  ▲
//!     │            └──┘
//!     ├──────────────────► Ready
//!     └──► Failed ◄── Polling
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicTaskState {
    /// Accepted upstream, not yet observed running
    Submitted,
    /// Upstream reports work in progress
    Polling,
    /// At least one clip has an audio URL
    Ready,
    /// Upstream reports the task failed
    Failed,
}

impl MusicTaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MusicTaskState::Ready | MusicTaskState::Failed)
    }

    pub fn can_transition_to(&self, next: MusicTaskState) -> bool {
        use MusicTaskState::*;
        match (self, next) {
            (Submitted, Polling | Ready | Failed) => true,
            (Polling, Polling | Ready | Failed) => true,
            _ => false,
        }
    }
}

/// One generated song variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusicClip {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Normalized answer to a status poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTaskStatus {
    pub task_id: String,
    pub state: MusicTaskState,
    #[serde(default)]
    pub clips: Vec<MusicClip>,
    /// Provider's failure message when `state` is failed
    #[serde(default)]
    pub error_message: Option<String>,
}

impl MusicTaskStatus {
    /// First clip carrying a playable URL
    pub fn first_audio_url(&self) -> Option<&str> {
        self.clips.iter().find_map(|c| c.audio_url.as_deref())
    }
}

/// Caller-side tracker for one submitted song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTask {
    pub task_id: String,
    pub state: MusicTaskState,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub last_polled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub polls: u32,
}

impl MusicTask {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            state: MusicTaskState::Submitted,
            submitted_at: Utc::now(),
            last_polled_at: None,
            polls: 0,
        }
    }

    /// Feed one poll result into the tracker
    ///
    /// Returns the new state when a transition happened. An upstream
    /// report of "still queued" while polling counts as polling. Terminal
    /// states ignore further observations.
    pub fn observe(&mut self, status: &MusicTaskStatus) -> Option<MusicTaskState> {
        self.polls += 1;
        self.last_polled_at = Some(Utc::now());

        let observed = match status.state {
            MusicTaskState::Submitted => MusicTaskState::Polling,
            other => other,
        };

        if !self.state.can_transition_to(observed) {
            return None;
        }
        let changed = self.state != observed;
        self.state = observed;
        changed.then_some(observed)
    }

    /// Force the tracker into the failed state (caller gave up polling)
    pub fn abandon(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = MusicTaskState::Failed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: MusicTaskState) -> MusicTaskStatus {
        MusicTaskStatus {
            task_id: "t1".to_string(),
            state,
            clips: vec![],
            error_message: None,
        }
    }

    #[test]
    fn test_submitted_to_polling_to_ready() {
        let mut task = MusicTask::new("t1");
        assert_eq!(task.observe(&status(MusicTaskState::Submitted)), Some(MusicTaskState::Polling));
        assert_eq!(task.observe(&status(MusicTaskState::Polling)), None);
        assert_eq!(task.observe(&status(MusicTaskState::Ready)), Some(MusicTaskState::Ready));
        assert_eq!(task.polls, 3);
        assert!(task.state.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut task = MusicTask::new("t1");
        task.observe(&status(MusicTaskState::Failed));
        assert_eq!(task.observe(&status(MusicTaskState::Ready)), None);
        assert_eq!(task.state, MusicTaskState::Failed);
        assert!(!task.abandon());
    }

    #[test]
    fn test_abandon_in_flight_task() {
        let mut task = MusicTask::new("t1");
        assert!(task.abandon());
        assert_eq!(task.state, MusicTaskState::Failed);
    }

    #[test]
    fn test_transition_table() {
        use MusicTaskState::*;
        assert!(Submitted.can_transition_to(Ready));
        assert!(!Polling.can_transition_to(Submitted));
        assert!(!Ready.can_transition_to(Polling));
        assert!(!Failed.can_transition_to(Failed));
    }
}
