//! Prompt construction for pitch generation.
//!
//! [`build_prompt`] returns the `(system, user)` message pair sent to the
//! chat-completions endpoint.  The user message embeds the transcript and
//! the exact ten-field JSON shape the parser expects; the instruction text
//! asks for the object alone, though the parser still tolerates prose
//! around it.

/// The JSON shape the model is asked to fill in.  Field names here must
/// stay in lockstep with [`FIELD_NAMES`](crate::pitch::FIELD_NAMES).
const RESPONSE_SHAPE: &str = r#"{
  "oneLiner": "A compelling one-sentence description of the company",
  "structure": {
    "problem": "Clear problem statement",
    "solution": "Your solution description",
    "market": "Market size and opportunity",
    "competition": "Competitive landscape analysis",
    "businessModel": "How you make money",
    "traction": "Key metrics and progress",
    "team": "Team background and expertise",
    "financials": "Financial projections or current state",
    "funding": "Funding ask and use of funds",
    "timeline": "Key milestones and roadmap"
  }
}"#;

const SYSTEM_INSTRUCTION: &str = "\
You are a startup pitch writing assistant.
Task: turn a founder's spoken story into a structured pitch deck following
Guy Kawasaki's methodology.

Rules:
1. Reply with a single JSON object and nothing else.
2. Fill every field; write an empty string when the transcript gives you
   nothing for a section.
3. Be specific and actionable in each section.
4. Keep the one-liner to one sentence.";

/// Build the `(system, user)` chat-message pair for `transcript`.
pub fn build_prompt(transcript: &str) -> (String, String) {
    let user = format!(
        "Based on the following founder story transcript, create a compelling \
         pitch deck structure. Return the response as a JSON object with the \
         following structure:\n\n{RESPONSE_SHAPE}\n\nTranscript: {transcript}\n\n\
         Analyze this transcript and generate a professional pitch deck structure."
    );

    (SYSTEM_INSTRUCTION.to_string(), user)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
