//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across
//! threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for microphone capture and payload finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate of the finalized payload in Hz.
    pub sample_rate: u32,
    /// Channel count of the finalized payload (1 = mono).
    pub channels: u16,
    /// Upper bound on buffered chunk length in milliseconds (≤ 250).
    pub chunk_interval_ms: u32,
    /// Ask the platform stack to cancel acoustic echo where supported.
    pub echo_cancellation: bool,
    /// Gate out near-silent samples at finalization.
    pub noise_suppression: bool,
    /// Peak-normalize the recording at finalization.
    pub auto_gain: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            chunk_interval_ms: 250,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain: true,
        }
    }
}

impl AudioConfig {
    /// Translate into the capture layer's constraint struct.
    pub fn constraints(&self) -> crate::audio::CaptureConstraints {
        crate::audio::CaptureConstraints {
            channels: self.channels,
            target_sample_rate: self.sample_rate,
            echo_cancellation: self.echo_cancellation,
            noise_suppression: self.noise_suppression,
            auto_gain: self.auto_gain,
            chunk_interval_ms: self.chunk_interval_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionConfig
// ---------------------------------------------------------------------------

/// Settings for the remote transcription endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Full URL of the transcription endpoint.
    pub endpoint: String,
    /// API key — `None` for unauthenticated deployments.
    pub api_key: Option<String>,
    /// Maximum seconds to wait before the attempt is cancelled.  One timed
    /// attempt per call; there is no automatic retry.
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:54321/functions/v1/transcribe-audio".into(),
            api_key: None,
            timeout_secs: 45,
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

/// Settings for the pitch-generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// API key — `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier sent to the API.
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Output length bound in tokens.
    pub max_tokens: u32,
    /// Maximum seconds to wait before the attempt is cancelled.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "qwen2.5:3b".into(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 45,
        }
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Settings for the hosted pitch store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the hosted store — `None` keeps pitches in memory only.
    pub base_url: Option<String>,
    /// API key for the store.
    pub api_key: Option<String>,
    /// Table holding pitch rows.
    pub table: String,
    /// Owner id stamped on every record and filter.
    pub owner_id: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            table: "pitches".into(),
            owner_id: "local-user".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// FallbackConfig
// ---------------------------------------------------------------------------

/// Settings for the on-device fallback recognizer.
///
/// The engine consuming these only exists under the `local-fallback`
/// feature; the section is plain config either way so a settings file
/// written with the feature on still loads with it off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Path to a GGML model file — `None` disables the fallback.
    pub model_path: Option<std::path::PathBuf>,
    /// Speech language as an ISO-639-1 code, or `"auto"`.
    pub language: String,
    /// Length of the live listen window in seconds.
    pub listen_secs: f32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            language: "en".into(),
            listen_secs: 10.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_to_pitch::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Microphone capture / finalization settings.
    pub audio: AudioConfig,
    /// Remote transcription endpoint settings.
    pub transcription: TranscriptionConfig,
    /// Pitch-generation endpoint settings.
    pub generation: GenerationConfig,
    /// Hosted pitch store settings.
    pub store: StoreConfig,
    /// On-device fallback recognizer settings.
    pub fallback: FallbackConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// A default `AppConfig` must survive a TOML round trip unchanged.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);
        assert_eq!(original.audio.channels, loaded.audio.channels);
        assert_eq!(
            original.audio.chunk_interval_ms,
            loaded.audio.chunk_interval_ms
        );

        assert_eq!(original.transcription.endpoint, loaded.transcription.endpoint);
        assert_eq!(original.transcription.api_key, loaded.transcription.api_key);
        assert_eq!(
            original.transcription.timeout_secs,
            loaded.transcription.timeout_secs
        );

        assert_eq!(original.generation.base_url, loaded.generation.base_url);
        assert_eq!(original.generation.model, loaded.generation.model);
        assert_eq!(original.generation.temperature, loaded.generation.temperature);
        assert_eq!(original.generation.max_tokens, loaded.generation.max_tokens);

        assert_eq!(original.store.base_url, loaded.store.base_url);
        assert_eq!(original.store.table, loaded.store.table);
        assert_eq!(original.store.owner_id, loaded.store.owner_id);

        assert_eq!(original.fallback.model_path, loaded.fallback.model_path);
        assert_eq!(original.fallback.language, loaded.fallback.language);
    }

    /// `load_from` on a non-existent path must return `Default` without
    /// error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.audio.sample_rate, default.audio.sample_rate);
        assert_eq!(config.transcription.endpoint, default.transcription.endpoint);
        assert_eq!(config.generation.model, default.generation.model);
        assert_eq!(config.store.table, default.store.table);
    }

    /// Default values match the design figures.
    #[test]
    fn default_values_match_design() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.audio.channels, 1);
        assert!(cfg.audio.chunk_interval_ms <= 250);
        assert_eq!(cfg.transcription.timeout_secs, 45);
        assert_eq!(cfg.generation.timeout_secs, 45);
        assert_eq!(cfg.generation.temperature, 0.7);
        assert_eq!(cfg.generation.max_tokens, 2048);
        assert!(cfg.store.base_url.is_none());
        assert_eq!(cfg.store.table, "pitches");
        assert!(cfg.fallback.model_path.is_none());
    }

    /// Modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.transcription.endpoint = "https://api.example.com/transcribe".into();
        cfg.transcription.api_key = Some("sk-test".into());
        cfg.generation.base_url = "https://api.openai.com".into();
        cfg.generation.model = "gpt-4o-mini".into();
        cfg.generation.temperature = 0.4;
        cfg.store.base_url = Some("https://db.example.com".into());
        cfg.store.owner_id = "user-42".into();
        cfg.fallback.model_path = Some("/models/ggml-base.bin".into());
        cfg.fallback.listen_secs = 15.0;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.transcription.endpoint, "https://api.example.com/transcribe");
        assert_eq!(loaded.transcription.api_key, Some("sk-test".into()));
        assert_eq!(loaded.generation.base_url, "https://api.openai.com");
        assert_eq!(loaded.generation.model, "gpt-4o-mini");
        assert_eq!(loaded.generation.temperature, 0.4);
        assert_eq!(loaded.store.base_url, Some("https://db.example.com".into()));
        assert_eq!(loaded.store.owner_id, "user-42");
        assert_eq!(
            loaded.fallback.model_path,
            Some(std::path::PathBuf::from("/models/ggml-base.bin"))
        );
        assert_eq!(loaded.fallback.listen_secs, 15.0);
    }

    /// The audio section translates into capture constraints faithfully.
    #[test]
    fn audio_config_builds_constraints() {
        let mut cfg = AudioConfig::default();
        cfg.auto_gain = false;
        let constraints = cfg.constraints();
        assert_eq!(constraints.target_sample_rate, 16_000);
        assert_eq!(constraints.channels, 1);
        assert!(!constraints.auto_gain);
        assert!(constraints.noise_suppression);
    }
}
