//! Session store
//!
//! Two tiers under one data root:
//!
//! - `<root>/<session_id>/` holds overwritable working files: per-step
//!   artifacts (`step_<n>_lyrics.txt`, `step_<n>_image.png`,
//!   `step_<n>_audio.mp3`) and `session.json`
//! - `<root>/history/<session_id>.json` holds completed snapshots, written
//!   only after the completion gate accepts the session

use crate::error::{CoreError, CoreResult};
use crate::models::history::HISTORY_DIR;
use crate::models::{ArtifactKind, HistoryRecord, HistorySummary, Session, SessionId};
use crate::services::asset_resolver::{AssetResolver, ResolvedAsset};
use crate::services::completion_gate;
use crate::services::transport::UpstreamTransport;
use serde::Serialize;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const SESSION_FILE: &str = "session.json";

/// Payload for one artifact write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactContent {
    Text(String),
    Bytes(Vec<u8>),
    /// Remote file downloaded before writing
    Url(String),
}

/// Everything produced for one step, as sent by the caller
#[derive(Debug, Clone, Default)]
pub struct SaveStepRequest {
    pub session_id: Option<SessionId>,
    /// 1-based step number used in file names
    pub step_number: u32,
    pub step_name: String,
    pub lyrics: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

/// Outcome of one artifact write within a step save
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArtifactOutcome {
    fn from_result(kind: ArtifactKind, result: CoreResult<PathBuf>) -> Self {
        match result {
            Ok(path) => Self {
                kind,
                path: Some(path),
                error: None,
            },
            Err(e) => Self {
                kind,
                path: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_saved(&self) -> bool {
        self.path.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveStepReport {
    pub session_id: SessionId,
    pub session_dir: PathBuf,
    pub outcomes: Vec<ArtifactOutcome>,
}

impl SaveStepReport {
    pub fn outcome(&self, kind: ArtifactKind) -> Option<&ArtifactOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }
}

/// Write through a uniquely named sibling temp file so readers never see
/// partial JSON; concurrent writers to one path resolve last-write-wins
async fn write_atomic(path: &Path, bytes: Vec<u8>) -> CoreResult<()> {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| CoreError::Storage(format!("no parent directory: {}", path.display())))?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| CoreError::Storage(format!("write task failed: {}", e)))??;
    Ok(())
}

pub struct SessionStore {
    resolver: AssetResolver,
    history_dir: PathBuf,
    transport: Arc<dyn UpstreamTransport>,
}

impl SessionStore {
    pub fn new(root: impl AsRef<Path>, transport: Arc<dyn UpstreamTransport>) -> CoreResult<Self> {
        let resolver = AssetResolver::new(root)?;
        let history_dir = resolver.root().join(HISTORY_DIR);
        Ok(Self {
            resolver,
            history_dir,
            transport,
        })
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    pub fn history_path(&self, session_id: &SessionId) -> PathBuf {
        self.history_dir.join(format!("{}.json", session_id))
    }

    /// Write one artifact file, creating the session directory if needed
    pub async fn save_artifact(
        &self,
        session_id: &SessionId,
        step_number: u32,
        kind: ArtifactKind,
        content: ArtifactContent,
    ) -> CoreResult<PathBuf> {
        if step_number == 0 {
            return Err(CoreError::Validation("step numbers start at 1".to_string()));
        }
        let path = self.resolver.artifact_path(session_id, step_number, kind)?;
        tokio::fs::create_dir_all(self.resolver.session_dir(session_id)?).await?;

        let bytes = match content {
            ArtifactContent::Text(text) => text.into_bytes(),
            ArtifactContent::Bytes(bytes) => bytes,
            ArtifactContent::Url(url) => self.transport.download(&url).await.map_err(|e| {
                error!(url = %url, kind = %kind, error = %e, "Artifact download failed");
                e
            })?,
        };

        tokio::fs::write(&path, &bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Artifact saved");
        Ok(path)
    }

    /// Save whatever the caller has for one step
    ///
    /// The three writes run concurrently; each reports its own outcome and a
    /// failed download never affects its siblings.
    pub async fn save_step(&self, request: SaveStepRequest) -> CoreResult<SaveStepReport> {
        if request.step_number == 0 || request.step_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "stepIndex and stepName are required".to_string(),
            ));
        }
        let session_id = request.session_id.unwrap_or_else(SessionId::mint);
        let session_dir = self.resolver.session_dir(&session_id)?;
        tokio::fs::create_dir_all(&session_dir).await?;

        let n = request.step_number;
        let save = |kind: ArtifactKind, content: Option<ArtifactContent>| {
            let session_id = &session_id;
            async move {
                match content {
                    Some(content) => Some(ArtifactOutcome::from_result(
                        kind,
                        self.save_artifact(session_id, n, kind, content).await,
                    )),
                    None => None,
                }
            }
        };
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        let (lyrics, image, audio) = tokio::join!(
            save(
                ArtifactKind::Lyrics,
                non_empty(request.lyrics).map(ArtifactContent::Text)
            ),
            save(
                ArtifactKind::Image,
                non_empty(request.image_url).map(ArtifactContent::Url)
            ),
            save(
                ArtifactKind::Audio,
                non_empty(request.audio_url).map(ArtifactContent::Url)
            ),
        );

        let outcomes: Vec<ArtifactOutcome> = [lyrics, image, audio].into_iter().flatten().collect();
        info!(
            session_id = %session_id,
            step = n,
            step_name = %request.step_name,
            saved = outcomes.iter().filter(|o| o.is_saved()).count(),
            failed = outcomes.iter().filter(|o| !o.is_saved()).count(),
            "Step content saved"
        );

        Ok(SaveStepReport {
            session_id,
            session_dir,
            outcomes,
        })
    }

    /// Write the working session; repeated calls overwrite
    pub async fn persist_session(&self, session: &Session) -> CoreResult<PathBuf> {
        let dir = self.resolver.session_dir(session.id())?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(SESSION_FILE);
        write_atomic(&path, serde_json::to_vec_pretty(session)?).await?;
        debug!(session_id = %session.id(), "Session persisted");
        Ok(path)
    }

    pub async fn load_session(&self, session_id: &SessionId) -> CoreResult<Session> {
        let path = self.resolver.session_dir(session_id)?.join(SESSION_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(CoreError::NotFound(format!("session {}", session_id)))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Promote a session to history once every slot is terminal
    ///
    /// An incomplete session fails with `IncompleteSession` and writes
    /// nothing. Committing the same id again replaces the earlier record.
    pub async fn commit_history(&self, session: &Session) -> CoreResult<HistoryRecord> {
        if !completion_gate::is_complete(session.artifacts(), session.step_count()) {
            if let Some((step, kind)) =
                completion_gate::first_pending(session.artifacts(), session.step_count())
            {
                warn!(
                    session_id = %session.id(),
                    step = step,
                    kind = %kind,
                    "History commit refused: slot still pending"
                );
            }
            return Err(CoreError::IncompleteSession(session.id().to_string()));
        }

        let record = HistoryRecord::from_session(session);
        tokio::fs::create_dir_all(&self.history_dir).await?;
        let path = self.history_path(session.id());
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            info!(session_id = %session.id(), "Replacing existing history record");
        }
        write_atomic(&path, serde_json::to_vec_pretty(&record)?).await?;
        info!(session_id = %session.id(), steps = session.step_count(), "History saved");
        Ok(record)
    }

    /// Summaries of every readable record, newest first
    pub async fn list_history(&self) -> CoreResult<Vec<HistorySummary>> {
        let mut entries = match tokio::fs::read_dir(&self.history_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    serde_json::from_slice::<HistoryRecord>(&bytes).map_err(|e| e.to_string())
                }
                Err(e) => Err(e.to_string()),
            };
            match parsed {
                Ok(record) => summaries.push(record.summary()),
                Err(e) => warn!(
                    file = %path.display(),
                    error = %e,
                    "Skipping unreadable history record"
                ),
            }
        }

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    pub async fn load_history(&self, session_id: &SessionId) -> CoreResult<HistoryRecord> {
        let path = self.history_path(session_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(CoreError::NotFound(format!("history for {}", session_id)))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn resolve_asset(
        &self,
        session: &str,
        step: &str,
        kind: &str,
    ) -> CoreResult<ResolvedAsset> {
        self.resolver.resolve(session, step, kind).await
    }
}
