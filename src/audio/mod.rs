//! Audio pipeline — microphone capture → conversion → chunk buffer →
//! conditioning → encoded payload.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → SampleChunk (mpsc) → downmix_mono
//!           → resample → ChunkBuffer → condition → PayloadFormat::encode
//!           → AudioPayload
//! ```
//!
//! The flow controller never touches cpal directly; it drives an
//! [`AudioSource`] and receives a single [`AudioPayload`] from
//! [`RecordingSession::finish`].

pub mod capture;
pub mod format;
pub mod recorder;
pub mod resample;

pub use capture::{AudioCapture, CaptureConstraints, CaptureError, SampleChunk, StreamHandle};
pub use format::{negotiate_format, AudioPayload, FormatError, PayloadFormat, PREFERRED_FORMATS};
pub use recorder::{AudioSource, ChunkBuffer, MicSource, RecordingSession};
pub use resample::{downmix_mono, resample};

// test-only re-export so controller tests can build scripted capture sources
// without reaching into recorder internals.
#[cfg(test)]
pub use recorder::{MockAudioSource, MockCaptureOutcome};
