//! Pitch generation against an OpenAI-compatible chat-completions endpoint.
//!
//! [`ApiPitchGenerator`] sends the prompt built by
//! [`build_prompt`](crate::pitch::prompt::build_prompt) with conservative
//! sampling (moderate temperature, bounded output length), then runs the
//! response text through the brace-extraction parser.  One attempt per
//! call — a failed generation is surfaced, never retried silently.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::pitch::parse::parse_generated;
use crate::pitch::prompt::build_prompt;
use crate::pitch::structure::GeneratedPitch;

// ---------------------------------------------------------------------------
// GenerateError
// ---------------------------------------------------------------------------

/// Errors that can come out of a generation attempt.
#[derive(Debug, Error, Clone)]
pub enum GenerateError {
    /// The transcript was blank; no request was issued.
    #[error("transcript is empty — nothing to generate from")]
    EmptyTranscript,

    /// Transport error, timeout, or a non-success status from the service.
    #[error("pitch generation failed: {0}")]
    GenerationFailed(String),

    /// No JSON object could be extracted from the response, or it failed to
    /// parse.
    #[error("could not parse generated pitch: {0}")]
    MalformedResponse(String),

    /// The parsed object is missing required parts (one-liner / structure).
    #[error("generated pitch is incomplete: {0}")]
    IncompleteStructure(String),
}

impl From<reqwest::Error> for GenerateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerateError::GenerationFailed("request timed out".into())
        } else {
            GenerateError::GenerationFailed(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// PitchGenerator trait
// ---------------------------------------------------------------------------

/// Async trait for transcript-to-pitch generation.
///
/// Implementors must be `Send + Sync` so they can sit behind an
/// `Arc<dyn PitchGenerator>` shared with the flow controller.
#[async_trait]
pub trait PitchGenerator: Send + Sync {
    async fn generate(&self, transcript: &str) -> Result<GeneratedPitch, GenerateError>;
}

// ---------------------------------------------------------------------------
// ApiPitchGenerator
// ---------------------------------------------------------------------------

/// Calls any OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// All connection details (`base_url`, `api_key`, `model`, sampling) come
/// from [`GenerationConfig`]; nothing is hardcoded.
pub struct ApiPitchGenerator {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl ApiPitchGenerator {
    /// Build a generator from application config.
    ///
    /// The HTTP client carries the configured per-request timeout.
    pub fn from_config(config: &GenerationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl PitchGenerator for ApiPitchGenerator {
    async fn generate(&self, transcript: &str) -> Result<GeneratedPitch, GenerateError> {
        // Blank input short-circuits before any request is built.
        if transcript.trim().is_empty() {
            return Err(GenerateError::EmptyTranscript);
        }

        let (system_msg, user_msg) = build_prompt(transcript);
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user",   "content": user_msg   }
            ],
            "stream":      false,
            "temperature": self.config.temperature,
            "max_tokens":  self.config.max_tokens
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerateError::GenerationFailed(format!(
                "service returned {status}: {detail}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerateError::MalformedResponse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                GenerateError::MalformedResponse("response carried no text content".into())
            })?;

        log::debug!("generation returned {} chars", content.len());

        parse_generated(content)
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Scripted [`PitchGenerator`] that counts calls, for controller tests.
#[cfg(test)]
pub struct MockGenerator {
    response: Result<GeneratedPitch, GenerateError>,
    calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl MockGenerator {
    pub fn ok(pitch: GeneratedPitch) -> Self {
        Self {
            response: Ok(pitch),
            calls: Default::default(),
        }
    }

    pub fn err(error: GenerateError) -> Self {
        Self {
            response: Err(error),
            calls: Default::default(),
        }
    }

    pub fn calls(&self) -> std::sync::Arc<std::sync::atomic::AtomicUsize> {
        std::sync::Arc::clone(&self.calls)
    }
}

#[cfg(test)]
#[async_trait]
impl PitchGenerator for MockGenerator {
    async fn generate(&self, transcript: &str) -> Result<GeneratedPitch, GenerateError> {
        if transcript.trim().is_empty() {
            return Err(GenerateError::EmptyTranscript);
        }
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::structure::PitchStructure;

    fn config() -> GenerationConfig {
        GenerationConfig {
            // Unroutable: a request that actually went out would fail with
            // GenerationFailed, which the empty-transcript test relies on.
            base_url: "http://127.0.0.1:1".into(),
            api_key: None,
            model: "test-model".into(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn empty_transcript_fails_without_a_request() {
        let generator = ApiPitchGenerator::from_config(&config());
        let err = generator.generate("").await.unwrap_err();
        // EmptyTranscript, not GenerationFailed: the unroutable endpoint was
        // never contacted.
        assert!(matches!(err, GenerateError::EmptyTranscript));
    }

    #[tokio::test]
    async fn whitespace_transcript_counts_as_empty() {
        let generator = ApiPitchGenerator::from_config(&config());
        let err = generator.generate("   \n\t ").await.unwrap_err();
        assert!(matches!(err, GenerateError::EmptyTranscript));
    }

    #[test]
    fn generator_is_object_safe() {
        let g: Box<dyn PitchGenerator> = Box::new(ApiPitchGenerator::from_config(&config()));
        drop(g);
    }

    #[tokio::test]
    async fn mock_counts_only_real_attempts() {
        let mock = MockGenerator::ok(GeneratedPitch {
            one_liner: "X".into(),
            structure: PitchStructure::default(),
        });
        let calls = mock.calls();

        let _ = mock.generate("").await;
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        let _ = mock.generate("a story").await;
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn error_display_names_the_step() {
        assert!(GenerateError::EmptyTranscript.to_string().contains("empty"));
        assert!(GenerateError::GenerationFailed("x".into())
            .to_string()
            .contains("generation failed"));
    }
}
