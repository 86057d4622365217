//! Learning sessions and per-step artifact slots
//!
//! A `Session` owns the decomposed learning steps and an index-aligned list
//! of `StepArtifacts`. The alignment is enforced at construction and on
//! deserialization, so `artifacts()[i]` always belongs to `steps()[i]`.

use crate::error::{CoreError, CoreResult};
use crate::models::artifact::ArtifactKind;
use crate::models::history::HISTORY_DIR;
use crate::models::music_task::MusicTask;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque session token restricted to `[A-Za-z0-9_]+`
///
/// The history directory name is reserved: a working session with that id
/// would share a directory with the committed records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(value: &str) -> CoreResult<Self> {
        if Self::is_valid(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(CoreError::Validation(format!("Invalid session id: {:?}", value)))
        }
    }

    pub fn is_valid(value: &str) -> bool {
        !value.is_empty()
            && value != HISTORY_DIR
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    }

    /// Fresh `session_<unix millis>` identifier
    pub fn mint() -> Self {
        Self(format!("session_{}", songstep_common::time::now_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(CoreError::Validation(format!("Invalid session id: {:?}", value)))
        }
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome slot for one artifact kind
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Slot<T> {
    /// Not yet attempted
    #[default]
    Pending,
    /// Terminal failure with message
    Error(String),
    /// Terminal success
    Present(T),
}

impl<T> Slot<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Slot::Pending)
    }

    pub fn present(&self) -> Option<&T> {
        match self {
            Slot::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Slot::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// The three artifact slots of one learning step
///
/// Lyrics hold the text itself; image and audio hold a URL or a stored
/// file reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepArtifacts {
    #[serde(default)]
    pub lyrics: Slot<String>,
    #[serde(default)]
    pub image: Slot<String>,
    #[serde(default)]
    pub audio: Slot<String>,
}

impl StepArtifacts {
    pub fn slot(&self, kind: ArtifactKind) -> &Slot<String> {
        match kind {
            ArtifactKind::Lyrics => &self.lyrics,
            ArtifactKind::Image => &self.image,
            ArtifactKind::Audio => &self.audio,
        }
    }

    /// Overwrite one slot; earlier terminal values are replaced, not merged
    pub fn set(&mut self, kind: ArtifactKind, slot: Slot<String>) {
        match kind {
            ArtifactKind::Lyrics => self.lyrics = slot,
            ArtifactKind::Image => self.image = slot,
            ArtifactKind::Audio => self.audio = slot,
        }
    }

    pub fn is_terminal(&self) -> bool {
        ArtifactKind::ALL.iter().all(|k| self.slot(*k).is_terminal())
    }
}

/// One learning step produced by decomposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningStep {
    /// 1-based position
    #[serde(default)]
    pub step_number: u32,
    pub step_name: String,
    #[serde(default)]
    pub step_description: String,
    #[serde(default)]
    pub learning_objective: String,
}

/// Caller's original request parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParameters {
    #[serde(default)]
    pub user_goal: String,
    #[serde(default)]
    pub learning_focus: String,
    #[serde(default = "default_music_style")]
    pub music_style: String,
    #[serde(default = "default_music_voice")]
    pub music_voice: String,
    #[serde(default = "default_picture_book_style")]
    pub picture_book_style: String,
    #[serde(default = "default_character_type")]
    pub character_type: String,
}

fn default_music_style() -> String {
    "cheerful".to_string()
}

fn default_music_voice() -> String {
    "boy".to_string()
}

fn default_picture_book_style() -> String {
    "fairy tale".to_string()
}

fn default_character_type() -> String {
    "boy".to_string()
}

impl RequestParameters {
    pub fn for_goal(goal: impl Into<String>) -> Self {
        Self {
            user_goal: goal.into(),
            ..Default::default()
        }
    }

    /// Replace blank style choices with their defaults
    pub fn fill_blank_defaults(mut self) -> Self {
        let fill = |value: &mut String, default: fn() -> String| {
            if value.trim().is_empty() {
                *value = default();
            }
        };
        fill(&mut self.music_style, default_music_style);
        fill(&mut self.music_voice, default_music_voice);
        fill(&mut self.picture_book_style, default_picture_book_style);
        fill(&mut self.character_type, default_character_type);
        self
    }
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self {
            user_goal: String::new(),
            learning_focus: String::new(),
            music_style: default_music_style(),
            music_voice: default_music_voice(),
            picture_book_style: default_picture_book_style(),
            character_type: default_character_type(),
        }
    }
}

/// Recurring character every step's lyrics and illustration refer to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterProfile {
    pub name: String,
    pub description: String,
    /// One-line appearance card pinned across all illustrations
    pub reference_prompt: Option<String>,
}

/// Parsed result of goal decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub steps: Vec<LearningStep>,
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub character_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_sheet: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl Decomposition {
    pub fn character(&self) -> CharacterProfile {
        let reference_prompt = self
            .character_sheet
            .as_ref()
            .and_then(|sheet| sheet.get("reference_prompt"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        CharacterProfile {
            name: self.character_name.clone(),
            description: self.character_description.clone(),
            reference_prompt,
        }
    }
}

#[derive(Deserialize)]
struct SessionRepr {
    id: SessionId,
    parameters: RequestParameters,
    decomposition: Decomposition,
    artifacts: Vec<StepArtifacts>,
    #[serde(default)]
    music_tasks: BTreeMap<usize, MusicTask>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRepr> for Session {
    type Error = CoreError;

    fn try_from(repr: SessionRepr) -> Result<Self, Self::Error> {
        let mut session = Session::restore(
            repr.id,
            repr.parameters,
            repr.decomposition,
            repr.artifacts,
            repr.created_at,
        )?;
        session.music_tasks = repr.music_tasks;
        Ok(session)
    }
}

/// Working unit for one in-progress multi-step generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionRepr")]
pub struct Session {
    id: SessionId,
    parameters: RequestParameters,
    decomposition: Decomposition,
    artifacts: Vec<StepArtifacts>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    music_tasks: BTreeMap<usize, MusicTask>,
    created_at: DateTime<Utc>,
}

impl Session {
    /// New session with every slot pending
    pub fn new(id: SessionId, parameters: RequestParameters, decomposition: Decomposition) -> Self {
        let artifacts = vec![StepArtifacts::default(); decomposition.steps.len()];
        Self {
            id,
            parameters,
            decomposition,
            artifacts,
            music_tasks: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Rebuild a session from stored parts, checking step/artifact alignment
    pub fn restore(
        id: SessionId,
        parameters: RequestParameters,
        decomposition: Decomposition,
        artifacts: Vec<StepArtifacts>,
        created_at: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if artifacts.len() != decomposition.steps.len() {
            return Err(CoreError::Validation(format!(
                "Session {} has {} steps but {} artifact entries",
                id,
                decomposition.steps.len(),
                artifacts.len()
            )));
        }
        Ok(Self {
            id,
            parameters,
            decomposition,
            artifacts,
            music_tasks: BTreeMap::new(),
            created_at,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn parameters(&self) -> &RequestParameters {
        &self.parameters
    }

    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    pub fn steps(&self) -> &[LearningStep] {
        &self.decomposition.steps
    }

    pub fn step_count(&self) -> usize {
        self.decomposition.steps.len()
    }

    pub fn artifacts(&self) -> &[StepArtifacts] {
        &self.artifacts
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn step(&self, index: usize) -> CoreResult<&LearningStep> {
        self.decomposition
            .steps
            .get(index)
            .ok_or_else(|| self.out_of_range(index))
    }

    pub fn slot(&self, index: usize, kind: ArtifactKind) -> CoreResult<&Slot<String>> {
        self.artifacts
            .get(index)
            .map(|a| a.slot(kind))
            .ok_or_else(|| self.out_of_range(index))
    }

    /// Apply one resolved outcome to a slot
    ///
    /// An empty present value is rejected: history stores empty content as
    /// absent, so it could not be read back as present.
    pub fn set_slot(
        &mut self,
        index: usize,
        kind: ArtifactKind,
        slot: Slot<String>,
    ) -> CoreResult<()> {
        if matches!(&slot, Slot::Present(value) if value.is_empty()) {
            return Err(CoreError::Validation(format!(
                "empty {} for step index {}",
                kind, index
            )));
        }
        match self.artifacts.get_mut(index) {
            Some(artifacts) => {
                artifacts.set(kind, slot);
                Ok(())
            }
            None => Err(self.out_of_range(index)),
        }
    }

    pub fn music_task(&self, index: usize) -> Option<&MusicTask> {
        self.music_tasks.get(&index)
    }

    pub fn music_task_mut(&mut self, index: usize) -> Option<&mut MusicTask> {
        self.music_tasks.get_mut(&index)
    }

    /// Track a submitted song, replacing any earlier task for the step
    pub fn track_music_task(&mut self, index: usize, task: MusicTask) -> CoreResult<()> {
        if index >= self.step_count() {
            return Err(self.out_of_range(index));
        }
        self.music_tasks.insert(index, task);
        Ok(())
    }

    fn out_of_range(&self, index: usize) -> CoreError {
        CoreError::Validation(format!(
            "Step index {} out of range for session {} ({} steps)",
            index,
            self.id,
            self.step_count()
        ))
    }
}
