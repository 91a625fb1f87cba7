//! Pitch generation — prompt, endpoint client, response parsing.
//!
//! # Flow
//!
//! ```text
//! Transcript → build_prompt → POST /v1/chat/completions
//!           → response text → extract_json_object → parse_generated
//!           → GeneratedPitch { oneLiner, structure (10 fields) }
//! ```
//!
//! The structure is total: every one of the ten fields is always present,
//! defaulting to an empty string when the model leaves it out.

pub mod generator;
pub mod parse;
pub mod prompt;
pub mod structure;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use generator::{ApiPitchGenerator, GenerateError, PitchGenerator};
pub use parse::{extract_json_object, parse_generated};
pub use prompt::build_prompt;
pub use structure::{section_heading, GeneratedPitch, PitchStructure, FIELD_NAMES};

// test-only re-export so controller tests can script generation outcomes.
#[cfg(test)]
pub use generator::MockGenerator;
