//! Pitch records and the persistence trait.
//!
//! Records are exclusively scoped to their owning user: every read, list,
//! and delete carries the owner id, and implementations must reject
//! cross-user access rather than silently widening the query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pitch::{GeneratedPitch, PitchStructure};

// ---------------------------------------------------------------------------
// PitchStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a saved pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchStatus {
    /// Generation is still in flight (legacy rows only — the current flow
    /// saves after generation completes).
    Processing,
    /// Ready to view, download, and rehearse.
    Completed,
}

// ---------------------------------------------------------------------------
// NewPitch / SavedPitch
// ---------------------------------------------------------------------------

/// A pitch about to be written.  The store assigns id and creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPitch {
    pub owner_id: String,
    pub title: String,
    pub one_liner: String,
    pub structure: PitchStructure,
    pub transcript: String,
    pub status: PitchStatus,
}

impl NewPitch {
    /// Assemble a record from a finished generation.
    pub fn from_generated(owner_id: &str, pitch: &GeneratedPitch, transcript: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            title: derive_title(&pitch.one_liner),
            one_liner: pitch.one_liner.clone(),
            structure: pitch.structure.clone(),
            transcript: transcript.to_string(),
            status: PitchStatus::Completed,
        }
    }
}

/// A stored pitch as read back from the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPitch {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub one_liner: String,
    pub structure: PitchStructure,
    pub transcript: String,
    pub created_at: DateTime<Utc>,
    pub status: PitchStatus,
}

// ---------------------------------------------------------------------------
// Title derivation
// ---------------------------------------------------------------------------

/// Longest title shown in the library list.
const TITLE_MAX_CHARS: usize = 60;

/// Derive a library title from the one-liner: the first sentence, truncated
/// to a display-friendly length on a character boundary.
pub fn derive_title(one_liner: &str) -> String {
    let first_sentence = one_liner
        .split_inclusive(['.', '!', '?'])
        .next()
        .unwrap_or(one_liner)
        .trim()
        .trim_end_matches(['.', '!', '?']);

    if first_sentence.chars().count() <= TITLE_MAX_CHARS {
        return first_sentence.to_string();
    }

    let truncated: String = first_sentence.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}…", truncated.trim_end())
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Persistence failures.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    /// Transport failure, rejected write, or any other store-side error.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// No record matches both the id and the owner.
    #[error("no such pitch for this user")]
    NotFound,
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::PersistenceFailed(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// PitchStore trait
// ---------------------------------------------------------------------------

/// Async persistence contract for pitch records.
///
/// `list` returns the owner's pitches newest-first.  `delete` requires both
/// the record id and the owner id to match.  Operations are independent and
/// idempotent-on-failure: a failed save or delete leaves the store exactly
/// as it was.
#[async_trait]
pub trait PitchStore: Send + Sync {
    async fn save(&self, pitch: NewPitch) -> Result<SavedPitch, StoreError>;
    async fn list(&self, owner_id: &str) -> Result<Vec<SavedPitch>, StoreError>;
    async fn delete(&self, id: &str, owner_id: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
