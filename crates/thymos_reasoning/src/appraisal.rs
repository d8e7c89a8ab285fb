//! Deep-path appraisal: one LLM call that reads a message and names the
//! emotions it evokes, constrained to a fixed appraisal vocabulary and a
//! strict JSON object shape.
//!
//! Parsing is tolerant of code fences and stray prose around the object, but
//! an unparseable response is an error so the caller can fall back to the
//! fast path.

use crate::llm::{CompletionParams, LlmClient};
use anyhow::{Context, Result};

/// One appraised emotion. Names are normalized to lowercase snake_case;
/// validation against the mapping vocabulary happens downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct AppraisedEmotion {
    pub name: String,
    pub intensity: f32,
}

const APPRAISAL_PROMPT_TEMPLATE: &str = r#"You are an emotional appraisal module. Read the user's message and identify which emotions it evokes in the companion who receives it.

Rules:
1. Use ONLY these emotion names: {vocabulary}
2. Assign each an intensity between 0.0 and 1.0
3. Pick at most 5 emotions; omit anything below 0.1
4. Respond with a single JSON object and nothing else

Example response:
{"joy": 0.6, "hope": 0.4}"#;

/// Ask the LLM to appraise `message`, constrained to `vocabulary`.
///
/// `mood_summary` is a one-line description of the companion's current mood,
/// included so the appraisal is situated rather than generic.
pub async fn appraise(
    client: &dyn LlmClient,
    vocabulary: &[&str],
    message: &str,
    mood_summary: &str,
    params: CompletionParams,
) -> Result<Vec<AppraisedEmotion>> {
    let system = APPRAISAL_PROMPT_TEMPLATE.replace("{vocabulary}", &vocabulary.join(", "));
    let user_text = format!("Current mood: {}\n\nMessage:\n{}", mood_summary, message);

    let response = client
        .complete(&system, &user_text, params)
        .await
        .context("Appraisal LLM call failed")?;

    parse_appraisal(&response)
}

/// Parse the LLM's response, handling common formatting quirks (markdown
/// fences, leading prose). Fails if no JSON object can be recovered.
pub fn parse_appraisal(text: &str) -> Result<Vec<AppraisedEmotion>> {
    let trimmed = text.trim();

    let object: serde_json::Map<String, serde_json::Value> =
        match serde_json::from_str(trimmed) {
            Ok(map) => map,
            Err(_) => {
                let start = trimmed.find('{');
                let end = trimmed.rfind('}');
                match (start, end) {
                    (Some(s), Some(e)) if s < e => serde_json::from_str(&trimmed[s..=e])
                        .context("Appraisal response is not a JSON object")?,
                    _ => anyhow::bail!("Appraisal response contains no JSON object"),
                }
            }
        };

    let mut emotions = Vec::new();
    for (name, value) in object {
        let Some(intensity) = value.as_f64() else {
            tracing::debug!("Skipping non-numeric appraisal entry: {}", name);
            continue;
        };
        let intensity = intensity as f32;
        if !intensity.is_finite() || intensity <= 0.0 {
            continue;
        }
        emotions.push(AppraisedEmotion {
            name: name.trim().to_lowercase().replace([' ', '-'], "_"),
            intensity: intensity.min(1.0),
        });
    }
    Ok(emotions)
}
