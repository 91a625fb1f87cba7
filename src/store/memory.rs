//! In-process pitch store.
//!
//! Backs offline runs and the test suite with the same owner-scoping rules
//! the hosted store enforces through row-level security: listing only ever
//! returns the caller's rows, and a delete must match both id and owner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::record::{NewPitch, PitchStore, SavedPitch, StoreError};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Owner-scoped in-memory [`PitchStore`].
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<SavedPitch>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows across all owners — test observability only.
    pub fn row_count(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PitchStore for MemoryStore {
    async fn save(&self, pitch: NewPitch) -> Result<SavedPitch, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let saved = SavedPitch {
            id: format!("pitch-{id:04}"),
            owner_id: pitch.owner_id,
            title: pitch.title,
            one_liner: pitch.one_liner,
            structure: pitch.structure,
            transcript: pitch.transcript,
            created_at: Utc::now(),
            status: pitch.status,
        };

        let mut rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::PersistenceFailed(e.to_string()))?;
        rows.push(saved.clone());
        Ok(saved)
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<SavedPitch>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::PersistenceFailed(e.to_string()))?;

        let mut mine: Vec<SavedPitch> = rows
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn delete(&self, id: &str, owner_id: &str) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::PersistenceFailed(e.to_string()))?;

        let before = rows.len();
        rows.retain(|p| !(p.id == id && p.owner_id == owner_id));
        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
