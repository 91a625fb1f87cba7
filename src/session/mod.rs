//! Creation session — the state machine driving one pass of
//! record → transcribe → confirm → generate → save/discard.
//!
//! [`SessionController`] orchestrates the pipeline collaborators;
//! [`SessionState`] (behind [`SharedSession`]) is what a UI renders.  One
//! session bag exists per creation session, created fresh and reset on save
//! or discard — there is no module-level mutable state.

pub mod controller;
pub mod state;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use controller::SessionController;
pub use state::{
    new_shared_session, ErrorKind, SessionError, SessionState, SessionView, SharedSession,
};
