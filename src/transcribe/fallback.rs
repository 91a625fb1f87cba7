//! On-device fallback recognition.
//!
//! When the remote service hits its quota or returns an empty result, the
//! client can run one non-continuous recognition pass against the live
//! microphone.  This is a second, independent capture — the remote path
//! consumes the pre-recorded payload, the fallback listens again.
//!
//! The capability is fixed at construction time
//! ([`RemoteTranscriber::remote_only`](super::RemoteTranscriber::remote_only)
//! vs [`with_fallback`](super::RemoteTranscriber::with_fallback)); the
//! production recognizer wraps a whisper model and only exists under the
//! `local-fallback` cargo feature.

use async_trait::async_trait;

use crate::transcribe::client::TranscribeError;

// ---------------------------------------------------------------------------
// LocalRecognizer trait
// ---------------------------------------------------------------------------

/// One-shot on-device speech recognition.
///
/// A single call performs a single bounded listen-and-recognize pass; there
/// is no interim-result streaming and no continuous mode.
#[async_trait]
pub trait LocalRecognizer: Send + Sync {
    async fn recognize_once(&self) -> Result<String, TranscribeError>;
}

// ---------------------------------------------------------------------------
// WhisperRecognizer  (feature = "local-fallback")
// ---------------------------------------------------------------------------

#[cfg(feature = "local-fallback")]
pub use whisper_impl::WhisperRecognizer;

#[cfg(feature = "local-fallback")]
mod whisper_impl {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    use crate::audio::{AudioPayload, AudioSource};
    use crate::transcribe::client::TranscribeError;

    use super::LocalRecognizer;

    /// On-device recognizer: records a bounded listen window through an
    /// [`AudioSource`], then runs whisper inference on the blocking pool.
    pub struct WhisperRecognizer {
        ctx: WhisperContext,
        language: String,
        source: Arc<dyn AudioSource>,
        listen_secs: f32,
    }

    // WhisperContext wraps read-only model weights and is declared Send+Sync
    // by whisper-rs; everything else here is owned data.
    unsafe impl Send for WhisperRecognizer {}
    unsafe impl Sync for WhisperRecognizer {}

    impl WhisperRecognizer {
        /// Load a GGML model and bind the live-capture source.
        pub fn load(
            model_path: impl AsRef<Path>,
            language: &str,
            source: Arc<dyn AudioSource>,
            listen_secs: f32,
        ) -> Result<Self, TranscribeError> {
            let path = model_path.as_ref();
            if !path.exists() {
                return Err(TranscribeError::TranscriptionFailed(format!(
                    "fallback model not found: {}",
                    path.display()
                )));
            }

            let path_str = path.to_str().ok_or_else(|| {
                TranscribeError::TranscriptionFailed("fallback model path is not UTF-8".into())
            })?;

            let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
                .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?;

            Ok(Self {
                ctx,
                language: language.to_string(),
                source,
                listen_secs,
            })
        }

        fn run_inference(&self, audio: &[f32]) -> Result<String, TranscribeError> {
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            let lang: Option<&str> = if self.language == "auto" {
                None
            } else {
                Some(self.language.as_str())
            };
            params.set_language(lang);
            params.set_print_progress(false);
            params.set_print_realtime(false);

            let mut state = self
                .ctx
                .create_state()
                .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?;

            state
                .full(params, audio)
                .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?;

            let n_segments = state
                .full_n_segments()
                .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?;

            let mut text = String::new();
            for i in 0..n_segments {
                let segment = state
                    .full_get_segment_text(i)
                    .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?;
                text.push_str(&segment);
            }

            Ok(text.trim().to_string())
        }

        fn decode_payload(payload: &AudioPayload) -> Result<Vec<f32>, TranscribeError> {
            if payload.media_type.starts_with("audio/wav") {
                let mut reader = hound::WavReader::new(std::io::Cursor::new(&payload.bytes))
                    .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?;
                let spec = reader.spec();
                let samples: Vec<f32> = match spec.sample_format {
                    hound::SampleFormat::Float => reader
                        .samples::<f32>()
                        .collect::<Result<_, _>>()
                        .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?,
                    hound::SampleFormat::Int => reader
                        .samples::<i16>()
                        .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
                        .collect::<Result<_, _>>()
                        .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?,
                };
                Ok(samples)
            } else {
                Ok(payload
                    .bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect())
            }
        }
    }

    #[async_trait]
    impl LocalRecognizer for WhisperRecognizer {
        async fn recognize_once(&self) -> Result<String, TranscribeError> {
            let session = self
                .source
                .begin()
                .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?;

            tokio::time::sleep(std::time::Duration::from_secs_f32(self.listen_secs)).await;

            let payload = tokio::task::spawn_blocking(move || session.finish())
                .await
                .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?
                .map_err(|e| TranscribeError::TranscriptionFailed(e.to_string()))?;

            let audio = Self::decode_payload(&payload)?;
            self.run_inference(&audio)
        }
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Scripted [`LocalRecognizer`] for unit tests.
#[cfg(test)]
pub struct MockRecognizer {
    response: Result<String, String>,
    calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl MockRecognizer {
    /// Always recognizes `text`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            calls: Default::default(),
        }
    }

    /// Always fails with `message`.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            calls: Default::default(),
        }
    }

    pub fn calls(&self) -> std::sync::Arc<std::sync::atomic::AtomicUsize> {
        std::sync::Arc::clone(&self.calls)
    }
}

#[cfg(test)]
#[async_trait]
impl LocalRecognizer for MockRecognizer {
    async fn recognize_once(&self) -> Result<String, TranscribeError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(msg) => Err(TranscribeError::TranscriptionFailed(msg.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
