//! Persistence — pitch records, store backends, plain-text export.
//!
//! The hosted relational store is an external collaborator; [`RestStore`]
//! implements only the read/write contract the pipeline needs.
//! [`MemoryStore`] provides the same contract in-process for offline runs
//! and tests.  Both are exclusively scoped to the requesting user.

pub mod export;
pub mod memory;
pub mod record;
pub mod rest;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use export::{parse_export, render_export, ExportError, ParsedExport};
pub use memory::MemoryStore;
pub use record::{derive_title, NewPitch, PitchStatus, PitchStore, SavedPitch, StoreError};
pub use rest::RestStore;
