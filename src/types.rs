use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::media::JpegImage;

/// Typed violation tag. The vocabulary is open: tags the classifier emits
/// that we do not know about are carried through as [`ViolationType::Other`]
/// and treated as non-severe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViolationType {
    NoFace,
    MultipleFaces,
    PhoneDetected,
    NotesDetected,
    BookDetected,
    PaperDetected,
    PermissionsBlocked,
    FullscreenExit,
    FullscreenDenied,
    TabHidden,
    WindowBlur,
    AudioNoise,
    GazeLeft,
    GazeRight,
    Other(String),
}

impl ViolationType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "no_face" => Self::NoFace,
            "multiple_faces" => Self::MultipleFaces,
            "phone_detected" => Self::PhoneDetected,
            "notes_detected" => Self::NotesDetected,
            "book_detected" => Self::BookDetected,
            "paper_detected" => Self::PaperDetected,
            "permissions_blocked" => Self::PermissionsBlocked,
            "fullscreen_exit" => Self::FullscreenExit,
            "fullscreen_denied" => Self::FullscreenDenied,
            "tab_hidden" => Self::TabHidden,
            "window_blur" => Self::WindowBlur,
            "audio_noise" => Self::AudioNoise,
            "gaze_left" => Self::GazeLeft,
            "gaze_right" => Self::GazeRight,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::NoFace => "no_face",
            Self::MultipleFaces => "multiple_faces",
            Self::PhoneDetected => "phone_detected",
            Self::NotesDetected => "notes_detected",
            Self::BookDetected => "book_detected",
            Self::PaperDetected => "paper_detected",
            Self::PermissionsBlocked => "permissions_blocked",
            Self::FullscreenExit => "fullscreen_exit",
            Self::FullscreenDenied => "fullscreen_denied",
            Self::TabHidden => "tab_hidden",
            Self::WindowBlur => "window_blur",
            Self::AudioNoise => "audio_noise",
            Self::GazeLeft => "gaze_left",
            Self::GazeRight => "gaze_right",
            Self::Other(tag) => tag,
        }
    }

    /// Severe violations get an evidence snapshot attached to their report.
    pub fn is_severe(&self) -> bool {
        matches!(
            self,
            Self::PhoneDetected
                | Self::MultipleFaces
                | Self::NoFace
                | Self::PermissionsBlocked
                | Self::FullscreenExit
                | Self::FullscreenDenied
                | Self::TabHidden
                | Self::WindowBlur
                | Self::NotesDetected
                | Self::BookDetected
                | Self::PaperDetected
        )
    }

    /// Environment-integrity violations are best evidenced by what was on
    /// screen at the time; everything else by the camera.
    pub fn prefers_screen_evidence(&self) -> bool {
        matches!(
            self,
            Self::TabHidden | Self::WindowBlur | Self::FullscreenExit | Self::FullscreenDenied
        )
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for ViolationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for ViolationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagVisitor;

        impl<'de> de::Visitor<'de> for TagVisitor {
            type Value = ViolationType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a violation tag string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(ViolationType::from_tag(value))
            }
        }

        deserializer.deserialize_str(TagVisitor)
    }
}

/// An ephemeral violation candidate: produced by a monitor, consumed once by
/// the dispatcher, never persisted.
#[derive(Debug, Clone)]
pub struct ViolationCandidate {
    pub kind: ViolationType,
    pub evidence_hint: Option<JpegImage>,
}

impl ViolationCandidate {
    pub fn new(kind: ViolationType) -> Self {
        Self {
            kind,
            evidence_hint: None,
        }
    }

    pub fn with_evidence(kind: ViolationType, evidence: JpegImage) -> Self {
        Self {
            kind,
            evidence_hint: Some(evidence),
        }
    }
}
