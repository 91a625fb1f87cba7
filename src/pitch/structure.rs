//! The ten-field pitch structure and the generated-pitch document.
//!
//! Downstream rendering and storage assume total coverage: all ten keys are
//! always present, and a field the generator did not fill is an empty
//! string, never an omitted key.  Serde defaults enforce this on the way in;
//! serialization always emits every key on the way out.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PitchStructure
// ---------------------------------------------------------------------------

/// Fixed ordered set of ten narrative fields making up a pitch deck.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PitchStructure {
    pub problem: String,
    pub solution: String,
    pub market: String,
    pub competition: String,
    pub business_model: String,
    pub traction: String,
    pub team: String,
    pub financials: String,
    pub funding: String,
    pub timeline: String,
}

/// Wire names of the ten fields, in their fixed presentation order.
pub const FIELD_NAMES: [&str; 10] = [
    "problem",
    "solution",
    "market",
    "competition",
    "businessModel",
    "traction",
    "team",
    "financials",
    "funding",
    "timeline",
];

impl PitchStructure {
    /// Read a field by its wire name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "problem" => &self.problem,
            "solution" => &self.solution,
            "market" => &self.market,
            "competition" => &self.competition,
            "businessModel" => &self.business_model,
            "traction" => &self.traction,
            "team" => &self.team,
            "financials" => &self.financials,
            "funding" => &self.funding,
            "timeline" => &self.timeline,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Write a field by its wire name; returns `false` for unknown names.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        let slot = match name {
            "problem" => &mut self.problem,
            "solution" => &mut self.solution,
            "market" => &mut self.market,
            "competition" => &mut self.competition,
            "businessModel" => &mut self.business_model,
            "traction" => &mut self.traction,
            "team" => &mut self.team,
            "financials" => &mut self.financials,
            "funding" => &mut self.funding,
            "timeline" => &mut self.timeline,
            _ => return false,
        };
        *slot = value.into();
        true
    }

    /// Iterate `(wire_name, value)` pairs in presentation order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        FIELD_NAMES
            .iter()
            .map(move |&name| (name, self.field(name).unwrap_or("")))
    }
}

/// Turn a wire field name into its export section heading: a space is
/// inserted before each capital, then the whole name is upper-cased
/// (`businessModel` → `BUSINESS MODEL`).
pub fn section_heading(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for ch in field.chars() {
        if ch.is_uppercase() && !out.is_empty() {
            out.push(' ');
        }
        out.extend(ch.to_uppercase());
    }
    out
}

// ---------------------------------------------------------------------------
// GeneratedPitch
// ---------------------------------------------------------------------------

/// The generator's output: a one-sentence company description plus the full
/// ten-field structure.  Immutable once produced — it is either persisted or
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPitch {
    pub one_liner: String,
    pub structure: PitchStructure,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
