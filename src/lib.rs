//! voice-to-pitch — turn a spoken founder story into a structured pitch
//! deck.
//!
//! One creation session runs the pipeline:
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────────┐   ┌────────────┐
//! │  audio    │──▶│  transcribe  │──▶│    pitch      │──▶│   store    │
//! │ capture → │   │ remote STT + │   │ prompt → LLM  │   │ save/list/ │
//! │ payload   │   │ live fallback│   │ → parse JSON  │   │ delete     │
//! └───────────┘   └──────────────┘   └───────────────┘   └────────────┘
//!        ▲                 orchestrated by                      │
//!        └──────────── session::SessionController ◀─────────────┘
//! ```
//!
//! The [`session`] module owns the state machine a UI renders; the other
//! modules are its collaborators behind `Arc<dyn …>` seams, so every stage
//! can be swapped for a test double.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_to_pitch::audio::MicSource;
//! use voice_to_pitch::config::AppConfig;
//! use voice_to_pitch::pitch::ApiPitchGenerator;
//! use voice_to_pitch::session::SessionController;
//! use voice_to_pitch::store::MemoryStore;
//! use voice_to_pitch::transcribe::RemoteTranscriber;
//!
//! # async fn run() {
//! let config = AppConfig::load().unwrap();
//! let controller = SessionController::new(
//!     Arc::new(MicSource::new(config.audio.constraints())),
//!     Arc::new(RemoteTranscriber::remote_only(&config.transcription)),
//!     Arc::new(ApiPitchGenerator::from_config(&config.generation)),
//!     Arc::new(MemoryStore::new()),
//!     config.store.owner_id.clone(),
//! );
//!
//! controller.start_recording();
//! // … speak …
//! controller.stop_recording().await;
//! controller.generate().await;
//! let saved = controller.save().await;
//! # let _ = saved;
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod pitch;
pub mod session;
pub mod store;
pub mod transcribe;
