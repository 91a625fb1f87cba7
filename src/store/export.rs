//! Plain-text export of a saved pitch.
//!
//! The downloaded document has a fixed layout: a title line, a `ONE-LINER`
//! section, one section per structure field (heading derived from the wire
//! name — spaces inserted before capitals, then upper-cased), an
//! `ORIGINAL TRANSCRIPT` section, and a `Generated on <date>` footer.
//!
//! [`parse_export`] reads the same layout back by section headers, so a
//! downloaded pitch can be re-imported without losing a character of any
//! section body.

use thiserror::Error;

use crate::pitch::{section_heading, PitchStructure, FIELD_NAMES};

use super::record::SavedPitch;

const ONE_LINER_HEADING: &str = "ONE-LINER";
const TRANSCRIPT_HEADING: &str = "ORIGINAL TRANSCRIPT";
const FOOTER_PREFIX: &str = "Generated on ";

// ---------------------------------------------------------------------------
// render_export
// ---------------------------------------------------------------------------

/// Render `pitch` into the plain-text download format.
pub fn render_export(pitch: &SavedPitch) -> String {
    let mut out = String::with_capacity(1024);

    out.push_str(&pitch.title);
    out.push_str("\n\n");

    out.push_str(ONE_LINER_HEADING);
    out.push('\n');
    out.push_str(&pitch.one_liner);
    out.push_str("\n\n");

    for (name, value) in pitch.structure.fields() {
        out.push_str(&section_heading(name));
        out.push('\n');
        out.push_str(value);
        out.push_str("\n\n");
    }

    out.push_str(TRANSCRIPT_HEADING);
    out.push('\n');
    out.push_str(&pitch.transcript);
    out.push_str("\n\n");

    out.push_str(FOOTER_PREFIX);
    out.push_str(&pitch.created_at.format("%Y-%m-%d").to_string());
    out.push('\n');

    out
}

// ---------------------------------------------------------------------------
// parse_export
// ---------------------------------------------------------------------------

/// A pitch document read back from its exported form.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExport {
    pub title: String,
    pub one_liner: String,
    pub structure: PitchStructure,
    pub transcript: String,
}

/// Export documents that cannot be read back.
#[derive(Debug, Error, PartialEq)]
pub enum ExportError {
    #[error("document is empty")]
    Empty,
    #[error("section '{0}' is missing")]
    MissingSection(String),
}

/// Parse a document produced by [`render_export`].
///
/// Section bodies are recovered verbatim; the layout is recognised purely by
/// its headings, so field ordering in the document does not matter.
pub fn parse_export(text: &str) -> Result<ParsedExport, ExportError> {
    let mut lines = text.lines();
    let title = lines
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ExportError::Empty)?
        .to_string();

    let mut headings: Vec<String> = vec![ONE_LINER_HEADING.to_string()];
    headings.extend(FIELD_NAMES.iter().map(|n| section_heading(n)));
    headings.push(TRANSCRIPT_HEADING.to_string());

    let mut sections: std::collections::HashMap<String, String> = Default::default();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in lines {
        let is_heading = headings.iter().any(|h| h == line);
        let is_footer = line.starts_with(FOOTER_PREFIX);

        if is_heading || is_footer {
            if let Some((name, body)) = current.take() {
                sections.insert(name, close_section(body));
            }
            if is_heading {
                current = Some((line.to_string(), Vec::new()));
            }
            continue;
        }

        if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((name, body)) = current.take() {
        sections.insert(name, close_section(body));
    }

    let mut take = |heading: &str| -> Result<String, ExportError> {
        sections
            .remove(heading)
            .ok_or_else(|| ExportError::MissingSection(heading.to_string()))
    };

    let one_liner = take(ONE_LINER_HEADING)?;

    let mut structure = PitchStructure::default();
    for name in FIELD_NAMES {
        let value = take(&section_heading(name))?;
        structure.set_field(name, value);
    }

    let transcript = take(TRANSCRIPT_HEADING)?;

    Ok(ParsedExport {
        title,
        one_liner,
        structure,
        transcript,
    })
}

/// Join body lines and drop the blank separator line render appends.
fn close_section(body: Vec<&str>) -> String {
    let joined = body.join("\n");
    joined.trim_end_matches('\n').trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::PitchStatus;
    use chrono::{TimeZone, Utc};

    fn sample_pitch() -> SavedPitch {
        let mut structure = PitchStructure::default();
        for name in FIELD_NAMES {
            structure.set_field(name, format!("The {name} story."));
        }
        SavedPitch {
            id: "pitch-0001".into(),
            owner_id: "u1".into(),
            title: "Ovens for every baker".into(),
            one_liner: "Ovens for every baker, delivered in days.".into(),
            structure,
            transcript: "We help bakers find ovens".into(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap(),
            status: PitchStatus::Completed,
        }
    }

    #[test]
    fn render_has_title_line_first() {
        let text = render_export(&sample_pitch());
        assert!(text.starts_with("Ovens for every baker\n"));
    }

    #[test]
    fn render_contains_all_section_headings() {
        let text = render_export(&sample_pitch());
        assert!(text.contains("\nONE-LINER\n"));
        for name in FIELD_NAMES {
            assert!(
                text.contains(&format!("\n{}\n", section_heading(name))),
                "missing heading for {name}"
            );
        }
        assert!(text.contains("\nORIGINAL TRANSCRIPT\n"));
    }

    #[test]
    fn render_has_generation_date_footer() {
        let text = render_export(&sample_pitch());
        assert!(text.trim_end().ends_with("Generated on 2026-08-07"));
    }

    #[test]
    fn round_trip_reproduces_every_section_verbatim() {
        let pitch = sample_pitch();
        let parsed = parse_export(&render_export(&pitch)).unwrap();

        assert_eq!(parsed.title, pitch.title);
        assert_eq!(parsed.one_liner, pitch.one_liner);
        assert_eq!(parsed.transcript, pitch.transcript);
        for name in FIELD_NAMES {
            assert_eq!(
                parsed.structure.field(name),
                pitch.structure.field(name),
                "field {name} changed in round trip"
            );
        }
    }

    #[test]
    fn round_trip_keeps_multi_line_section_bodies() {
        let mut pitch = sample_pitch();
        pitch
            .structure
            .set_field("traction", "1000 users.\n40% month-over-month growth.");
        let parsed = parse_export(&render_export(&pitch)).unwrap();
        assert_eq!(
            parsed.structure.traction,
            "1000 users.\n40% month-over-month growth."
        );
    }

    #[test]
    fn empty_fields_survive_the_round_trip() {
        let mut pitch = sample_pitch();
        pitch.structure.set_field("funding", "");
        let parsed = parse_export(&render_export(&pitch)).unwrap();
        assert_eq!(parsed.structure.funding, "");
    }

    #[test]
    fn empty_document_is_rejected() {
        assert_eq!(parse_export(""), Err(ExportError::Empty));
    }

    #[test]
    fn missing_section_is_named_in_the_error() {
        let text = "Title\n\nONE-LINER\nsomething\n";
        match parse_export(text) {
            Err(ExportError::MissingSection(name)) => assert_eq!(name, "PROBLEM"),
            other => panic!("expected MissingSection, got {other:?}"),
        }
    }
}
