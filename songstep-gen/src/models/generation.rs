//! Generation requests and normalized provider payloads

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output sizes the image provider accepts
pub const ALLOWED_IMAGE_SIZES: [&str; 6] = [
    "1696*960", "1664*928", "1472*1140", "1328*1328", "1140*1472", "928*1664",
];

/// Size used when the requested one is missing or not allowed (16:9)
pub const DEFAULT_IMAGE_SIZE: &str = "1664*928";

/// Coerce a requested size into the allow-list
///
/// `1328x1328` and `1328X1328` are accepted as spellings of `1328*1328`.
/// Anything else becomes [`DEFAULT_IMAGE_SIZE`].
pub fn normalize_image_size(size: Option<&str>) -> &'static str {
    let Some(size) = size.map(str::trim) else {
        return DEFAULT_IMAGE_SIZE;
    };
    let starred = size.replace(['x', 'X'], "*");
    ALLOWED_IMAGE_SIZES
        .iter()
        .find(|allowed| **allowed == size || **allowed == starred)
        .copied()
        .unwrap_or(DEFAULT_IMAGE_SIZE)
}

/// Abstract generation request, independent of any provider dialect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationRequest {
    Music(MusicRequest),
    Image(ImageRequest),
    TextCompletion(TextCompletionRequest),
}

/// Song submission parameters
///
/// Absent fields are filled with the selected dialect's defaults or
/// omitted from the wire payload entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusicRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub negative_tags: Option<String>,
    #[serde(default, alias = "make_instrumental")]
    pub instrumental: Option<bool>,
    #[serde(default, alias = "mv")]
    pub model: Option<String>,
    #[serde(default)]
    pub custom_mode: Option<bool>,
    #[serde(default)]
    pub continue_at: Option<f64>,
    #[serde(default)]
    pub continue_clip_id: Option<String>,
    #[serde(default)]
    pub cover_clip_id: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

/// Illustration parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub prompt_extend: Option<bool>,
    #[serde(default)]
    pub watermark: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Ordered chat messages for a text completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextCompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
}

impl TextCompletionRequest {
    /// Single user message with the default model
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt)],
            model: None,
        }
    }
}

/// Accepted music submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicSubmission {
    pub task_id: String,
    /// Dialect that handled the submission
    pub dialect: String,
}

/// Generated illustration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub image_url: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub usage: Option<Value>,
}

/// Normalized success payload of any provider call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderPayload {
    MusicTask(MusicSubmission),
    Image(ImageResult),
    Text { content: String },
}

/// Outcome of a provider call: a normalized payload or a classified error
pub type ProviderResult<T = ProviderPayload> = Result<T, CoreError>;
