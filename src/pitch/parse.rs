//! Parsing of generated pitch responses.
//!
//! The generative model is asked for a bare JSON object but routinely wraps
//! it in prose ("Sure! Here is your pitch: {…}").  [`extract_json_object`]
//! locates the first balanced brace-delimited object — string- and
//! escape-aware, so braces inside field values do not confuse the scan —
//! and [`parse_generated`] validates the shape behind it.
//!
//! Missing-field policy: absent `structure` fields default to empty strings
//! (total coverage is a data-model invariant); a missing or blank
//! `oneLiner`, or no `structure` object at all, is `IncompleteStructure`.

use crate::pitch::generator::GenerateError;
use crate::pitch::structure::{GeneratedPitch, PitchStructure};

// ---------------------------------------------------------------------------
// extract_json_object
// ---------------------------------------------------------------------------

/// Return the first balanced `{…}` object in `text`, or `None`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

// ---------------------------------------------------------------------------
// parse_generated
// ---------------------------------------------------------------------------

/// Parse raw model output into a [`GeneratedPitch`].
///
/// # Errors
///
/// - [`GenerateError::MalformedResponse`] — no extractable object, or the
///   object is not valid JSON.
/// - [`GenerateError::IncompleteStructure`] — `oneLiner` missing/blank, or
///   `structure` is not an object.
pub fn parse_generated(text: &str) -> Result<GeneratedPitch, GenerateError> {
    let raw = extract_json_object(text).ok_or_else(|| {
        GenerateError::MalformedResponse("no JSON object found in response".into())
    })?;

    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| GenerateError::MalformedResponse(e.to_string()))?;

    let one_liner = value
        .get("oneLiner")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");
    if one_liner.is_empty() {
        return Err(GenerateError::IncompleteStructure(
            "oneLiner is missing or blank".into(),
        ));
    }

    let structure_value = value
        .get("structure")
        .filter(|v| v.is_object())
        .ok_or_else(|| {
            GenerateError::IncompleteStructure("structure object is missing".into())
        })?;

    // Serde defaults fill any absent field with "" — never an omitted key.
    let structure: PitchStructure = serde_json::from_value(structure_value.clone())
        .map_err(|e| GenerateError::MalformedResponse(e.to_string()))?;

    Ok(GeneratedPitch {
        one_liner: one_liner.to_string(),
        structure,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
