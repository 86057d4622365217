//! Core services
//!
//! - Upstream transport and provider adapters (music dialects, DashScope)
//! - Generation orchestration and prompt templates
//! - Session store, completion gate and asset resolution

pub mod asset_resolver;
pub mod completion_gate;
pub mod dashscope;
pub mod decomposition;
pub mod music_dialect;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod session_store;
pub mod transport;

pub use asset_resolver::{AssetResolver, ResolvedAsset};
pub use music_dialect::{MusicDialect, MusicDialectSpec};
pub use orchestrator::GenerationOrchestrator;
pub use prompts::{DefaultPrompts, PromptBuilder};
pub use provider::ProviderAdapter;
pub use session_store::{
    ArtifactContent, ArtifactOutcome, SaveStepReport, SaveStepRequest, SessionStore,
};
pub use transport::{
    AuthHeader, HttpMethod, HttpTransport, TransportOutcome, UpstreamCall, UpstreamTransport,
};
