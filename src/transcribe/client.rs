//! Remote transcription client.
//!
//! [`RemoteTranscriber`] posts a base64-encoded payload to the transcription
//! endpoint (`{ "audio": … }` in, `{ "text": … }` out) and classifies the
//! outcome.  Quota exhaustion is reported distinctly from generic failure so
//! the UI can point the user at the on-device fallback; the fallback itself
//! is a [`LocalRecognizer`](super::fallback::LocalRecognizer) chosen at
//! construction time — there is no runtime capability sniffing.
//!
//! Exactly one of {remote success, fallback success, classified error} comes
//! out of every [`Transcriber::transcribe`] call, and a successful
//! transcript is never empty.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioPayload;
use crate::config::TranscriptionConfig;
use crate::transcribe::encode::encode_payload;
use crate::transcribe::fallback::LocalRecognizer;

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Finalized transcript text.  Replaced wholesale per session — there is no
/// incremental merge on the remote path.
pub type Transcript = String;

// ---------------------------------------------------------------------------
// TranscribeError
// ---------------------------------------------------------------------------

/// Errors that can come out of a transcription attempt.
#[derive(Debug, Error, Clone)]
pub enum TranscribeError {
    /// The payload was empty or could not be encoded for transport.
    #[error("audio encoding failed: {0}")]
    EncodingFailed(String),

    /// The service signalled quota/rate exhaustion.  Distinct from generic
    /// failure so callers can offer the fallback path.
    #[error("transcription quota exhausted: {0}")]
    QuotaExceeded(String),

    /// Transport error, timeout, service error, or a failed fallback pass.
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    /// The remote result was unusable and no fallback recognizer exists.
    #[error("no on-device fallback recognizer is available")]
    FallbackUnavailable,
}

impl From<reqwest::Error> for TranscribeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscribeError::TranscriptionFailed("request timed out".into())
        } else {
            TranscribeError::TranscriptionFailed(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Async trait for payload-to-text transcription.
///
/// Implementors must be `Send + Sync` so they can sit behind an
/// `Arc<dyn Transcriber>` shared with the flow controller.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, payload: &AudioPayload) -> Result<Transcript, TranscribeError>;
}

// ---------------------------------------------------------------------------
// Response interpretation
// ---------------------------------------------------------------------------

/// Classified remote response, before any fallback handling.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RemoteOutcome {
    /// 2xx with a non-empty `text` field.
    Text(String),
    /// 2xx but the `text` field is missing or blank.
    MissingText,
    /// Error payload whose message indicates quota exhaustion.
    QuotaExhausted(String),
    /// Any other failure.
    Failed(String),
}

/// Classify a raw HTTP response.
///
/// Error payloads carry the reason in a `message` field (`error` is accepted
/// as a legacy spelling); a message containing "quota" in any casing is
/// quota exhaustion.
pub(crate) fn interpret_response(status: u16, body: &str) -> RemoteOutcome {
    let json: Option<serde_json::Value> = serde_json::from_str(body).ok();

    if (200..300).contains(&status) {
        let text = json
            .as_ref()
            .and_then(|v| v.get("text"))
            .and_then(|t| t.as_str())
            .map(str::trim)
            .unwrap_or("");
        return if text.is_empty() {
            RemoteOutcome::MissingText
        } else {
            RemoteOutcome::Text(text.to_string())
        };
    }

    let message = json
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
        })
        .unwrap_or(body)
        .to_string();

    if message.to_lowercase().contains("quota") {
        RemoteOutcome::QuotaExhausted(message)
    } else {
        RemoteOutcome::Failed(format!("service returned {status}: {message}"))
    }
}

/// Why the fallback path was engaged.
enum FallbackReason {
    Quota(String),
    EmptyRemote,
}

// ---------------------------------------------------------------------------
// RemoteTranscriber
// ---------------------------------------------------------------------------

/// Calls the transcription endpoint, with an optional on-device fallback.
///
/// All connection details come from [`TranscriptionConfig`]; the HTTP client
/// carries the configured per-request timeout, and there is no automatic
/// retry — one timed attempt per call.
pub struct RemoteTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
    fallback: Option<Arc<dyn LocalRecognizer>>,
}

impl RemoteTranscriber {
    /// Remote endpoint only — unusable remote results are terminal.
    pub fn remote_only(config: &TranscriptionConfig) -> Self {
        Self::build(config, None)
    }

    /// Remote endpoint with an on-device fallback recognizer.
    pub fn with_fallback(config: &TranscriptionConfig, fallback: Arc<dyn LocalRecognizer>) -> Self {
        Self::build(config, Some(fallback))
    }

    fn build(config: &TranscriptionConfig, fallback: Option<Arc<dyn LocalRecognizer>>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            fallback,
        }
    }

    /// Run one live-mic recognition pass, then fold its outcome back into
    /// the classification that triggered it.
    async fn run_fallback(&self, reason: FallbackReason) -> Result<Transcript, TranscribeError> {
        let recognizer = match (&self.fallback, &reason) {
            (Some(r), _) => Arc::clone(r),
            (None, FallbackReason::Quota(msg)) => {
                return Err(TranscribeError::QuotaExceeded(msg.clone()));
            }
            (None, FallbackReason::EmptyRemote) => {
                return Err(TranscribeError::FallbackUnavailable);
            }
        };

        log::warn!("remote transcription unusable, engaging on-device fallback");

        match recognizer.recognize_once().await {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) | Err(_) => match reason {
                // Quota stays the headline error: it is the actionable
                // signal even when the fallback pass also came up empty.
                FallbackReason::Quota(msg) => Err(TranscribeError::QuotaExceeded(msg)),
                FallbackReason::EmptyRemote => Err(TranscribeError::TranscriptionFailed(
                    "remote returned no text and the fallback pass failed".into(),
                )),
            },
        }
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, payload: &AudioPayload) -> Result<Transcript, TranscribeError> {
        let audio = encode_payload(&payload.bytes)?;

        log::debug!(
            "submitting {} encoded chars ({}) to {}",
            audio.len(),
            payload.media_type,
            self.config.endpoint
        );

        let body = serde_json::json!({ "audio": audio });

        let mut req = self
            .client
            .post(&self.config.endpoint)
            .header("x-client-info", concat!("voice-to-pitch/", env!("CARGO_PKG_VERSION")))
            .json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key).header("apikey", key);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        match interpret_response(status, &text) {
            RemoteOutcome::Text(t) => Ok(t),
            RemoteOutcome::MissingText => self.run_fallback(FallbackReason::EmptyRemote).await,
            RemoteOutcome::QuotaExhausted(msg) => {
                self.run_fallback(FallbackReason::Quota(msg)).await
            }
            RemoteOutcome::Failed(msg) => Err(TranscribeError::TranscriptionFailed(msg)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::fallback::MockRecognizer;

    fn payload(bytes: &[u8]) -> AudioPayload {
        AudioPayload {
            bytes: bytes.to_vec(),
            media_type: "audio/wav",
            sample_rate: 16_000,
        }
    }

    fn config() -> TranscriptionConfig {
        TranscriptionConfig {
            // Unroutable: any attempt to actually reach it fails fast, which
            // the tests rely on to prove no request was issued.
            endpoint: "http://127.0.0.1:1/transcribe".into(),
            api_key: None,
            timeout_secs: 1,
        }
    }

    // ---- interpret_response ----

    #[test]
    fn success_with_text_is_classified_text() {
        let out = interpret_response(200, r#"{"text":"We help bakers find ovens"}"#);
        assert_eq!(out, RemoteOutcome::Text("We help bakers find ovens".into()));
    }

    #[test]
    fn success_text_is_trimmed() {
        let out = interpret_response(200, r#"{"text":"  hello  "}"#);
        assert_eq!(out, RemoteOutcome::Text("hello".into()));
    }

    #[test]
    fn success_without_text_field_is_missing_text() {
        assert_eq!(interpret_response(200, "{}"), RemoteOutcome::MissingText);
    }

    #[test]
    fn success_with_blank_text_is_missing_text() {
        // Never an empty-string success.
        assert_eq!(
            interpret_response(200, r#"{"text":"   "}"#),
            RemoteOutcome::MissingText
        );
    }

    #[test]
    fn quota_message_is_classified_distinctly() {
        let out = interpret_response(429, r#"{"message":"API quota exceeded, retry later"}"#);
        assert!(matches!(out, RemoteOutcome::QuotaExhausted(_)));
    }

    #[test]
    fn quota_match_is_case_insensitive() {
        let out = interpret_response(500, r#"{"message":"Daily QUOTA reached"}"#);
        assert!(matches!(out, RemoteOutcome::QuotaExhausted(_)));
    }

    #[test]
    fn legacy_error_field_is_read_for_classification() {
        let out = interpret_response(500, r#"{"error":"quota exhausted"}"#);
        assert!(matches!(out, RemoteOutcome::QuotaExhausted(_)));
    }

    #[test]
    fn other_errors_are_generic_failures() {
        let out = interpret_response(500, r#"{"message":"model exploded"}"#);
        match out {
            RemoteOutcome::Failed(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("model exploded"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_is_carried_verbatim() {
        let out = interpret_response(502, "bad gateway");
        assert!(matches!(out, RemoteOutcome::Failed(msg) if msg.contains("bad gateway")));
    }

    // ---- empty payload short-circuits before any request ----

    #[tokio::test]
    async fn empty_payload_fails_with_encoding_failed() {
        let transcriber = RemoteTranscriber::remote_only(&config());
        let err = transcriber.transcribe(&payload(&[])).await.unwrap_err();
        // EncodingFailed, not TranscriptionFailed: the unroutable endpoint
        // was never contacted.
        assert!(matches!(err, TranscribeError::EncodingFailed(_)));
    }

    // ---- fallback folding ----

    #[tokio::test]
    async fn quota_without_fallback_stays_quota_exceeded() {
        let transcriber = RemoteTranscriber::remote_only(&config());
        let err = transcriber
            .run_fallback(FallbackReason::Quota("quota exceeded".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::QuotaExceeded(_)));
    }

    #[tokio::test]
    async fn empty_remote_without_fallback_is_fallback_unavailable() {
        let transcriber = RemoteTranscriber::remote_only(&config());
        let err = transcriber
            .run_fallback(FallbackReason::EmptyRemote)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::FallbackUnavailable));
    }

    #[tokio::test]
    async fn fallback_success_rescues_quota() {
        let transcriber = RemoteTranscriber::with_fallback(
            &config(),
            Arc::new(MockRecognizer::ok("spoken on device")),
        );
        let text = transcriber
            .run_fallback(FallbackReason::Quota("quota".into()))
            .await
            .unwrap();
        assert_eq!(text, "spoken on device");
    }

    #[tokio::test]
    async fn failing_fallback_keeps_quota_classification() {
        let transcriber = RemoteTranscriber::with_fallback(
            &config(),
            Arc::new(MockRecognizer::err("mic busy")),
        );
        let err = transcriber
            .run_fallback(FallbackReason::Quota("quota hit".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::QuotaExceeded(_)));
    }

    #[tokio::test]
    async fn empty_fallback_result_is_never_a_success() {
        let transcriber =
            RemoteTranscriber::with_fallback(&config(), Arc::new(MockRecognizer::ok("   ")));
        let err = transcriber
            .run_fallback(FallbackReason::EmptyRemote)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::TranscriptionFailed(_)));
    }

    // ---- object safety ----

    #[test]
    fn transcriber_is_object_safe() {
        let t: Box<dyn Transcriber> = Box::new(RemoteTranscriber::remote_only(&config()));
        drop(t);
    }
}
