//! Data models for songstep-gen
//!
//! - Generation requests and normalized provider payloads
//! - Learning sessions, per-step artifact slots and history snapshots
//! - Music task polling state machine

pub mod artifact;
pub mod generation;
pub mod history;
pub mod music_task;
pub mod session;

pub use artifact::ArtifactKind;
pub use generation::{
    normalize_image_size, ChatMessage, ChatRole, GenerationRequest, ImageRequest, ImageResult,
    MusicRequest, MusicSubmission, ProviderPayload, ProviderResult, TextCompletionRequest,
    ALLOWED_IMAGE_SIZES, DEFAULT_IMAGE_SIZE,
};
pub use history::{HistoryRecord, HistorySummary, StepContentSnapshot};
pub use music_task::{MusicClip, MusicTask, MusicTaskState, MusicTaskStatus};
pub use session::{
    CharacterProfile, Decomposition, LearningStep, RequestParameters, Session, SessionId, Slot,
    StepArtifacts,
};
