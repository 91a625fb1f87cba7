//! Creation-flow state: the view enum, error tagging, and the shared
//! session bag.
//!
//! [`SessionState`] is the single source of truth the UI reads: current
//! view, transcript, generated pitch, the last step failure, and the quota
//! flag.  [`SharedSession`] (`Arc<Mutex<SessionState>>`) is cheap to clone
//! and safe to share; lock for short critical sections only and never
//! across an `.await` point.

use std::sync::{Arc, Mutex};

use crate::audio::CaptureError;
use crate::pitch::{GenerateError, GeneratedPitch};
use crate::store::StoreError;
use crate::transcribe::TranscribeError;

// ---------------------------------------------------------------------------
// SessionView
// ---------------------------------------------------------------------------

/// Views of one creation session.
///
/// ```text
/// Idle ──record──▶ Recording ──stop──▶ Transcribing ──ok──▶ TranscriptReady
/// TranscriptReady ──generate──▶ Generating ──ok──▶ PitchReady
/// TranscriptReady ──rerecord──▶ Idle
/// PitchReady ──save──▶ Saving ──ok──▶ Idle (session reset)
/// PitchReady ──delete──▶ Idle
/// any step ──error──▶ previous view, error recorded in the session bag
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionView {
    /// Nothing in flight; ready to record.
    Idle,
    /// Microphone is live and buffering audio.
    Recording,
    /// Payload finalized; transcription call outstanding.
    Transcribing,
    /// Transcript on screen awaiting user confirmation.
    TranscriptReady,
    /// Generation call outstanding.
    Generating,
    /// Generated pitch on screen awaiting save or discard.
    PitchReady,
    /// Persistence write outstanding.
    Saving,
}

impl SessionView {
    /// `true` while a pipeline step is in flight.  Busy views are mutually
    /// exclusive and their entry actions are inert while busy.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionView::Recording
                | SessionView::Transcribing
                | SessionView::Generating
                | SessionView::Saving
        )
    }

    /// Short status label for display.
    pub fn label(&self) -> &'static str {
        match self {
            SessionView::Idle => "Idle",
            SessionView::Recording => "Recording",
            SessionView::Transcribing => "Transcribing",
            SessionView::TranscriptReady => "Transcript ready",
            SessionView::Generating => "Generating",
            SessionView::PitchReady => "Pitch ready",
            SessionView::Saving => "Saving",
        }
    }
}

impl Default for SessionView {
    fn default() -> Self {
        SessionView::Idle
    }
}

// ---------------------------------------------------------------------------
// ErrorKind / SessionError
// ---------------------------------------------------------------------------

/// The full failure taxonomy of the pipeline, as surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    DeviceUnavailable,
    EmptyRecording,
    EncodingFailed,
    QuotaExceeded,
    TranscriptionFailed,
    FallbackUnavailable,
    EmptyTranscript,
    GenerationFailed,
    MalformedResponse,
    IncompleteStructure,
    PersistenceFailed,
}

/// A step failure: machine-readable kind plus a human-readable message.
///
/// Caught at the failing step and recorded in the session bag — failures
/// never propagate past the step boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<CaptureError> for SessionError {
    fn from(e: CaptureError) -> Self {
        let kind = match &e {
            CaptureError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            CaptureError::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            CaptureError::EmptyRecording => ErrorKind::EmptyRecording,
            CaptureError::Encode(_) => ErrorKind::EncodingFailed,
        };
        Self {
            kind,
            message: e.to_string(),
        }
    }
}

impl From<TranscribeError> for SessionError {
    fn from(e: TranscribeError) -> Self {
        let kind = match &e {
            TranscribeError::EncodingFailed(_) => ErrorKind::EncodingFailed,
            TranscribeError::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            TranscribeError::TranscriptionFailed(_) => ErrorKind::TranscriptionFailed,
            TranscribeError::FallbackUnavailable => ErrorKind::FallbackUnavailable,
        };
        Self {
            kind,
            message: e.to_string(),
        }
    }
}

impl From<GenerateError> for SessionError {
    fn from(e: GenerateError) -> Self {
        let kind = match &e {
            GenerateError::EmptyTranscript => ErrorKind::EmptyTranscript,
            GenerateError::GenerationFailed(_) => ErrorKind::GenerationFailed,
            GenerateError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            GenerateError::IncompleteStructure(_) => ErrorKind::IncompleteStructure,
        };
        Self {
            kind,
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        Self {
            kind: ErrorKind::PersistenceFailed,
            message: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The one mutable state bag per creation session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Current view driving the UI.
    pub view: SessionView,

    /// Finalized transcript, once transcription succeeds.  Replaced
    /// wholesale — never merged incrementally.
    pub transcript: Option<String>,

    /// Generated pitch awaiting save or discard.
    pub generated: Option<GeneratedPitch>,

    /// Last step failure, cleared when the user moves on.
    pub last_error: Option<SessionError>,

    /// Set when quota exhaustion was encountered this session — the UI
    /// surfaces the fallback suggestion instead of a generic banner.
    pub quota_flag: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to a fresh idle session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Thread-safe handle to [`SessionState`].
pub type SharedSession = Arc<Mutex<SessionState>>;

/// Construct a fresh [`SharedSession`].
pub fn new_shared_session() -> SharedSession {
    Arc::new(Mutex::new(SessionState::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
