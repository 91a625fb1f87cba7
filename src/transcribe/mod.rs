//! Transcription — remote endpoint client with an optional on-device
//! fallback.
//!
//! # Flow
//!
//! ```text
//! AudioPayload → encode_payload (chunked base64) → POST {audio}
//!             → { text } ──────────────────────────▶ Transcript
//!             → 2xx without text ─┐
//!             → quota exhaustion ─┴▶ LocalRecognizer::recognize_once
//!                                    (live mic, single pass)
//! ```
//!
//! Everything else is a terminal, classified [`TranscribeError`].

pub mod client;
pub mod encode;
pub mod fallback;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use client::{RemoteTranscriber, TranscribeError, Transcriber, Transcript};
pub use encode::encode_payload;
pub use fallback::LocalRecognizer;

#[cfg(feature = "local-fallback")]
pub use fallback::WhisperRecognizer;

// test-only re-export so other modules' tests can script the fallback path.
#[cfg(test)]
pub use fallback::MockRecognizer;
