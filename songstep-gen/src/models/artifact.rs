//! Artifact kinds tracked per learning step

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three artifact slots of a learning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Lyrics,
    Image,
    Audio,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] =
        [ArtifactKind::Lyrics, ArtifactKind::Image, ArtifactKind::Audio];

    /// Parse the closed set {image, audio, lyrics}
    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "lyrics" => Ok(ArtifactKind::Lyrics),
            "image" => Ok(ArtifactKind::Image),
            "audio" => Ok(ArtifactKind::Audio),
            other => Err(CoreError::Validation(format!("Invalid asset type: {:?}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Lyrics => "lyrics",
            ArtifactKind::Image => "image",
            ArtifactKind::Audio => "audio",
        }
    }

    /// Stored file name for a 1-based step number
    pub fn file_name(&self, step_number: u32) -> String {
        let suffix = match self {
            ArtifactKind::Lyrics => "lyrics.txt",
            ArtifactKind::Image => "image.png",
            ArtifactKind::Audio => "audio.mp3",
        };
        format!("step_{}_{}", step_number, suffix)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::Lyrics => "text/plain; charset=utf-8",
            ArtifactKind::Image => "image/png",
            ArtifactKind::Audio => "audio/mpeg",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_closed_set() {
        assert_eq!(ArtifactKind::parse("image").unwrap(), ArtifactKind::Image);
        assert_eq!(ArtifactKind::parse("lyrics").unwrap(), ArtifactKind::Lyrics);
        assert!(ArtifactKind::parse("Image").is_err());
        assert!(ArtifactKind::parse("video").is_err());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(ArtifactKind::Image.file_name(2), "step_2_image.png");
        assert_eq!(ArtifactKind::Audio.file_name(1), "step_1_audio.mp3");
        assert_eq!(ArtifactKind::Lyrics.file_name(10), "step_10_lyrics.txt");
    }
}
