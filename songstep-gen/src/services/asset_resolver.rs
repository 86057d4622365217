//! Path-safe mapping of (session, step, kind) triples to stored files
//!
//! All validation happens before any filesystem access:
//!
//! 1. session id matches `[A-Za-z0-9_]+`
//! 2. step is a positive integer literal without leading zeros
//! 3. kind is one of image, audio, lyrics
//! 4. the lexically normalized path stays under the store root

use crate::error::{CoreError, CoreResult};
use crate::models::{ArtifactKind, SessionId};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};

/// Bytes of a stored artifact plus how to serve them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Collapse `.` and `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Parse `^[1-9][0-9]*$` into a step number
pub fn parse_step_number(step: &str) -> CoreResult<u32> {
    let valid = step.bytes().next().is_some_and(|b| (b'1'..=b'9').contains(&b))
        && step.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(CoreError::Validation(format!("Invalid step: {:?}", step)));
    }
    step.parse()
        .map_err(|_| CoreError::Validation(format!("Step out of range: {}", step)))
}

#[derive(Debug, Clone)]
pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    /// Root is made absolute (against the working directory) and normalized
    pub fn new(root: impl AsRef<Path>) -> CoreResult<Self> {
        let root = root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Self {
            root: normalize_lexically(&absolute),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Confirm a candidate path is a descendant of the root
    fn contain(&self, candidate: PathBuf) -> CoreResult<PathBuf> {
        let normalized = normalize_lexically(&candidate);
        if normalized.starts_with(&self.root) && normalized != self.root {
            Ok(normalized)
        } else {
            tracing::warn!(path = %candidate.display(), "Rejected path outside store root");
            Err(CoreError::PathEscape(candidate.display().to_string()))
        }
    }

    pub fn session_dir(&self, session_id: &SessionId) -> CoreResult<PathBuf> {
        self.contain(self.root.join(session_id.as_str()))
    }

    pub fn artifact_path(
        &self,
        session_id: &SessionId,
        step_number: u32,
        kind: ArtifactKind,
    ) -> CoreResult<PathBuf> {
        self.contain(self.session_dir(session_id)?.join(kind.file_name(step_number)))
    }

    /// Validate a raw triple and compute its path (no I/O)
    pub fn locate(
        &self,
        session: &str,
        step: &str,
        kind: &str,
    ) -> CoreResult<(ArtifactKind, PathBuf)> {
        let session_id = SessionId::parse(session)?;
        let step_number = parse_step_number(step)?;
        let kind = ArtifactKind::parse(kind)?;
        Ok((kind, self.artifact_path(&session_id, step_number, kind)?))
    }

    /// Read a stored artifact
    ///
    /// A missing lyrics file yields empty content; a missing image or audio
    /// file is `NotFound`.
    pub async fn resolve(
        &self,
        session: &str,
        step: &str,
        kind: &str,
    ) -> CoreResult<ResolvedAsset> {
        let (kind, path) = self.locate(session, step, kind)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => match kind {
                ArtifactKind::Lyrics => Vec::new(),
                _ => {
                    return Err(CoreError::NotFound(format!(
                        "{} for step {} of {}",
                        kind, step, session
                    )))
                }
            },
            Err(e) => return Err(e.into()),
        };

        Ok(ResolvedAsset {
            kind,
            path,
            content_type: kind.content_type(),
            bytes,
        })
    }
}
