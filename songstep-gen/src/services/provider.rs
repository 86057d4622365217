//! Provider adapter
//!
//! Turns abstract generation requests into provider wire calls and provider
//! answers into normalized results. Every public operation returns a
//! `ProviderResult`; transport and parse failures never escape as panics.

use crate::config::{AuthStyle, ServiceConfig};
use crate::error::CoreError;
use crate::models::{
    GenerationRequest, ImageRequest, ImageResult, MusicRequest, MusicSubmission, MusicTaskStatus,
    ProviderPayload, ProviderResult, TextCompletionRequest,
};
use crate::services::dashscope;
use crate::services::music_dialect::MusicDialect;
use crate::services::transport::{AuthHeader, UpstreamCall, UpstreamTransport};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ProviderAdapter {
    config: Arc<ServiceConfig>,
    transport: Arc<dyn UpstreamTransport>,
    dialect: MusicDialect,
}

impl ProviderAdapter {
    pub fn new(config: Arc<ServiceConfig>, transport: Arc<dyn UpstreamTransport>) -> Self {
        let dialect = MusicDialect::detect(&config.music_base_url);
        info!(
            base_url = %config.music_base_url,
            dialect = %dialect,
            "Music provider dialect selected"
        );
        Self {
            config,
            transport,
            dialect,
        }
    }

    pub fn dialect(&self) -> MusicDialect {
        self.dialect
    }

    fn music_auth(&self) -> Option<AuthHeader> {
        if !self.config.music_key_configured() {
            return None;
        }
        let key = self.config.music_api_key.clone();
        Some(match self.config.music_auth_style {
            AuthStyle::Bearer => AuthHeader::Bearer(key),
            AuthStyle::ApiKeyHeader => AuthHeader::ApiKey(key),
        })
    }

    fn dashscope_auth(&self) -> ProviderResult<AuthHeader> {
        if !self.config.dashscope_key_configured() {
            return Err(CoreError::NotConfigured(
                "DASHSCOPE_API_KEY not configured".to_string(),
            ));
        }
        Ok(AuthHeader::Bearer(self.config.dashscope_api_key.clone()))
    }

    pub async fn submit_music(&self, request: &MusicRequest) -> ProviderResult<MusicSubmission> {
        let spec = self.dialect.spec();
        let payload = spec.build_submit_payload(request, self.config.callback_url.as_deref());
        debug!(
            dialect = spec.name(),
            prompt_len = request.prompt.as_deref().map(str::len).unwrap_or(0),
            "Submitting music"
        );

        let call = UpstreamCall::post(spec.submit_url(&self.config.music_base_url), payload)
            .with_auth(self.music_auth());
        let (status, body) = self.transport.execute(call).await.into_json()?;
        let submission = spec.classify_submit(status, body)?;
        info!(task_id = %submission.task_id, "Music task submitted");
        Ok(submission)
    }

    pub async fn fetch_music_status(&self, task_id: &str) -> ProviderResult<MusicTaskStatus> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(CoreError::Validation("missing id".to_string()));
        }
        let spec = self.dialect.spec();
        let url = spec.build_fetch_url(&self.config.music_base_url, task_id)?;

        let call = UpstreamCall::get(url).with_auth(self.music_auth());
        let (status, body) = self.transport.execute(call).await.into_json()?;
        let task_status = spec.classify_status(task_id, status, body)?;
        debug!(task_id = %task_id, state = ?task_status.state, "Music task polled");
        Ok(task_status)
    }

    pub async fn generate_image(&self, request: &ImageRequest) -> ProviderResult<ImageResult> {
        let auth = self.dashscope_auth()?;
        let payload = dashscope::build_image_payload(request)?;

        let endpoint = dashscope::image_endpoint(&self.config.dashscope_base_url);
        let call = UpstreamCall::post(endpoint, payload).with_auth(Some(auth));
        let (status, body) = self.transport.execute(call).await.into_json()?;
        let result = dashscope::parse_image_response(status, body)?;
        info!(request_id = ?result.request_id, "Image generated");
        Ok(result)
    }

    pub async fn complete_text(&self, request: &TextCompletionRequest) -> ProviderResult<String> {
        let auth = self.dashscope_auth()?;
        let payload = dashscope::build_text_payload(request)?;

        let endpoint = dashscope::text_endpoint(&self.config.dashscope_base_url);
        let call = UpstreamCall::post(endpoint, payload).with_auth(Some(auth));
        let (status, body) = self.transport.execute(call).await.into_json()?;
        dashscope::parse_text_response(status, body).map_err(|e| {
            warn!(error = %e, "Text completion response rejected");
            e
        })
    }

    /// Dispatch any request variant
    pub async fn generate(&self, request: &GenerationRequest) -> ProviderResult {
        match request {
            GenerationRequest::Music(music) => self
                .submit_music(music)
                .await
                .map(ProviderPayload::MusicTask),
            GenerationRequest::Image(image) => self
                .generate_image(image)
                .await
                .map(ProviderPayload::Image),
            GenerationRequest::TextCompletion(text) => self
                .complete_text(text)
                .await
                .map(|content| ProviderPayload::Text { content }),
        }
    }
}
