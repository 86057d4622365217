//! Generation orchestrator
//!
//! Stateless dispatcher from learning steps to provider calls. Each
//! `run_*` operation resolves its provider call completely, then applies a
//! single overwrite to one slot of the session it was handed. No retries,
//! no cross-step coordination, no polling timer: callers drive
//! [`GenerationOrchestrator::fetch_music`] at whatever cadence they like.

use crate::error::{CoreError, CoreResult};
use crate::models::{
    ArtifactKind, CharacterProfile, Decomposition, ImageRequest, ImageResult, LearningStep,
    MusicTask, MusicTaskState, RequestParameters, Session, SessionId, Slot, TextCompletionRequest,
};
use crate::services::decomposition::parse_decomposition;
use crate::services::prompts::PromptBuilder;
use crate::services::provider::ProviderAdapter;
use std::sync::Arc;
use tracing::{info, warn};

pub struct GenerationOrchestrator {
    provider: Arc<ProviderAdapter>,
    prompts: Arc<dyn PromptBuilder>,
}

/// Empty provider output counts as a failure
fn to_slot<T>(result: CoreResult<T>, present: impl FnOnce(T) -> String) -> Slot<String> {
    match result.map(present) {
        Ok(value) if value.is_empty() => Slot::Error("provider returned empty content".to_string()),
        Ok(value) => Slot::Present(value),
        Err(e) => Slot::Error(e.to_string()),
    }
}

impl GenerationOrchestrator {
    pub fn new(provider: Arc<ProviderAdapter>, prompts: Arc<dyn PromptBuilder>) -> Self {
        Self { provider, prompts }
    }

    pub fn provider(&self) -> &ProviderAdapter {
        &self.provider
    }

    /// Split a learning goal into steps via text completion
    ///
    /// An unparseable reply degrades to a one-step placeholder carrying
    /// `parse_error`; only provider failures are errors.
    pub async fn decompose(&self, params: &RequestParameters) -> CoreResult<Decomposition> {
        if params.user_goal.trim().is_empty() {
            return Err(CoreError::Validation("userGoal is required".to_string()));
        }
        let prompt = self.prompts.decompose(params);
        let reply = self
            .provider
            .complete_text(&TextCompletionRequest::from_prompt(prompt))
            .await?;
        let decomposition = parse_decomposition(&reply);
        info!(
            steps = decomposition.steps.len(),
            parsed = decomposition.parse_error.is_none(),
            "Goal decomposed"
        );
        Ok(decomposition)
    }

    /// Decompose a goal and open a fresh session with every slot pending
    pub async fn start_session(&self, params: RequestParameters) -> CoreResult<Session> {
        let decomposition = self.decompose(&params).await?;
        Ok(Session::new(SessionId::mint(), params, decomposition))
    }

    /// Lyrics for one step, independent of any session
    pub async fn lyrics_for(
        &self,
        step: &LearningStep,
        character: &CharacterProfile,
        params: &RequestParameters,
        step_number: usize,
        total_steps: usize,
    ) -> CoreResult<String> {
        let prompt = self
            .prompts
            .lyrics(step, character, params, step_number, total_steps);
        let lyrics = self
            .provider
            .complete_text(&TextCompletionRequest::from_prompt(prompt))
            .await?;
        Ok(lyrics.trim().to_string())
    }

    /// Illustration for one step, independent of any session
    pub async fn image_for(
        &self,
        step: &LearningStep,
        character: &CharacterProfile,
        params: &RequestParameters,
        step_number: usize,
        total_steps: usize,
    ) -> CoreResult<ImageResult> {
        let prompt = self
            .prompts
            .image(step, character, params, step_number, total_steps);
        self.provider
            .generate_image(&ImageRequest {
                prompt,
                ..Default::default()
            })
            .await
    }

    /// Resolve the lyrics slot value without touching the session
    pub async fn lyrics_slot(&self, session: &Session, index: usize) -> CoreResult<Slot<String>> {
        let step = session.step(index)?;
        let character = session.decomposition().character();
        let result = self
            .lyrics_for(
                step,
                &character,
                session.parameters(),
                index + 1,
                session.step_count(),
            )
            .await;
        Ok(to_slot(result, |lyrics| lyrics))
    }

    /// Resolve the image slot value without touching the session
    pub async fn image_slot(&self, session: &Session, index: usize) -> CoreResult<Slot<String>> {
        let step = session.step(index)?;
        let character = session.decomposition().character();
        let result = self
            .image_for(
                step,
                &character,
                session.parameters(),
                index + 1,
                session.step_count(),
            )
            .await;
        Ok(to_slot(result, |image| image.image_url))
    }

    pub async fn run_lyrics(
        &self,
        session: &mut Session,
        index: usize,
    ) -> CoreResult<Slot<String>> {
        let slot = self.lyrics_slot(session, index).await?;
        session.set_slot(index, ArtifactKind::Lyrics, slot.clone())?;
        Ok(slot)
    }

    pub async fn run_image(&self, session: &mut Session, index: usize) -> CoreResult<Slot<String>> {
        let slot = self.image_slot(session, index).await?;
        session.set_slot(index, ArtifactKind::Image, slot.clone())?;
        Ok(slot)
    }

    /// Submit the step's song
    ///
    /// On acceptance the audio slot stays pending and a task tracker is
    /// registered for later polling; a rejected submission is terminal.
    pub async fn run_music(&self, session: &mut Session, index: usize) -> CoreResult<Slot<String>> {
        let step = session.step(index)?;
        let lyrics = session
            .slot(index, ArtifactKind::Lyrics)?
            .present()
            .map(String::as_str);
        let request = self.prompts.music(
            step,
            &session.decomposition().character(),
            session.parameters(),
            lyrics,
        );

        match self.provider.submit_music(&request).await {
            Ok(submission) => {
                session.track_music_task(index, MusicTask::new(submission.task_id))?;
                session.set_slot(index, ArtifactKind::Audio, Slot::Pending)?;
                Ok(Slot::Pending)
            }
            Err(e) => {
                let slot = Slot::Error(e.to_string());
                session.set_slot(index, ArtifactKind::Audio, slot.clone())?;
                Ok(slot)
            }
        }
    }

    /// Poll the step's song once and advance its tracker
    ///
    /// A provider failure is returned as an error and leaves the session
    /// untouched; the caller may poll again later.
    pub async fn fetch_music(
        &self,
        session: &mut Session,
        index: usize,
    ) -> CoreResult<MusicTaskState> {
        let task = session.music_task(index).ok_or_else(|| {
            CoreError::Validation(format!("no music task submitted for step index {}", index))
        })?;
        if task.state.is_terminal() {
            return Ok(task.state);
        }
        let task_id = task.task_id.clone();

        let status = self.provider.fetch_music_status(&task_id).await?;

        let transition = session
            .music_task_mut(index)
            .and_then(|task| task.observe(&status));
        match transition {
            Some(MusicTaskState::Ready) => {
                if let Some(url) = status.first_audio_url() {
                    session.set_slot(index, ArtifactKind::Audio, Slot::Present(url.to_string()))?;
                }
                info!(task_id = %task_id, "Music ready");
            }
            Some(MusicTaskState::Failed) => {
                let message = status
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "music generation failed".to_string());
                warn!(task_id = %task_id, error = %message, "Music task failed");
                session.set_slot(index, ArtifactKind::Audio, Slot::Error(message))?;
            }
            _ => {}
        }

        Ok(session
            .music_task(index)
            .map(|t| t.state)
            .unwrap_or(status.state))
    }

    /// Stop waiting for a song; the audio slot records the reason
    pub fn abandon_music(
        &self,
        session: &mut Session,
        index: usize,
        reason: &str,
    ) -> CoreResult<bool> {
        let abandoned = session
            .music_task_mut(index)
            .map(MusicTask::abandon)
            .unwrap_or(false);
        if abandoned {
            session.set_slot(index, ArtifactKind::Audio, Slot::Error(reason.to_string()))?;
        }
        Ok(abandoned)
    }

    /// Lyrics and image concurrently, then the song submission
    ///
    /// A lyrics failure still submits the song with the template verse.
    pub async fn run_step(&self, session: &mut Session, index: usize) -> CoreResult<()> {
        let (lyrics, image) = {
            let view: &Session = session;
            tokio::join!(self.lyrics_slot(view, index), self.image_slot(view, index))
        };
        session.set_slot(index, ArtifactKind::Lyrics, lyrics?)?;
        session.set_slot(index, ArtifactKind::Image, image?)?;
        self.run_music(session, index).await?;
        Ok(())
    }
}
