//! Parsing of model-produced goal decompositions

use crate::models::{Decomposition, LearningStep};
use crate::services::prompts::CHARACTER_NAME;

const RAW_RESPONSE_LIMIT: usize = 500;

/// Pull the JSON text out of a reply that may be wrapped in a code fence
fn extract_json(reply: &str) -> &str {
    let fenced = reply.find("```json").map(|i| i + "```json".len()).or_else(|| {
        reply.find("```").map(|i| i + "```".len())
    });
    let text = match fenced {
        Some(start) => {
            let rest = &reply[start..];
            match rest.find("```") {
                Some(end) => &rest[..end],
                None => reply,
            }
        }
        None => reply,
    };
    text.trim().trim_start_matches('\u{feff}').trim()
}

fn parse_strict(reply: &str) -> Result<Decomposition, String> {
    let mut decomposition: Decomposition =
        serde_json::from_str(extract_json(reply)).map_err(|e| e.to_string())?;
    if decomposition.steps.is_empty() {
        return Err("Invalid response structure: empty steps array".to_string());
    }
    for (i, step) in decomposition.steps.iter_mut().enumerate() {
        if step.step_number == 0 {
            step.step_number = (i + 1) as u32;
        }
    }
    if decomposition.character_name.trim().is_empty() {
        decomposition.character_name = CHARACTER_NAME.to_string();
    }
    Ok(decomposition)
}

/// Single placeholder step carrying the parse failure and a reply excerpt
pub fn fallback(error: String, reply: &str) -> Decomposition {
    Decomposition {
        steps: vec![LearningStep {
            step_number: 1,
            step_name: "Getting ready".to_string(),
            step_description: "Please check the API response format".to_string(),
            learning_objective: "Make sure the API works".to_string(),
        }],
        character_name: CHARACTER_NAME.to_string(),
        character_description: "A warm, friendly companion".to_string(),
        character_sheet: None,
        parse_error: Some(error),
        raw_response: Some(reply.chars().take(RAW_RESPONSE_LIMIT).collect()),
    }
}

/// Parse a reply; never fails, degrading to [`fallback`] instead
pub fn parse_decomposition(reply: &str) -> Decomposition {
    match parse_strict(reply) {
        Ok(decomposition) => decomposition,
        Err(error) => {
            tracing::warn!(
                error = %error,
                reply_len = reply.len(),
                "Decomposition reply not parseable"
            );
            fallback(error, reply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"steps": [
        {"step_number": 1, "step_name": "Turn on tap", "step_description": "d",
         "learning_objective": "o"},
        {"step_name": "Soap"}], "character_name": "Lele", "character_description": "kind",
        "character_sheet": {"reference_prompt": "round face"}}"#;

    #[test]
    fn test_bare_json() {
        let d = parse_decomposition(BODY);
        assert_eq!(d.steps.len(), 2);
        assert_eq!(d.steps[1].step_number, 2);
        assert!(d.parse_error.is_none());
        assert_eq!(d.character().reference_prompt.as_deref(), Some("round face"));
    }

    #[test]
    fn test_fenced_json_with_bom() {
        let reply = format!("Here you go:\n```json\n\u{feff}{}\n```\nEnjoy", BODY);
        assert_eq!(parse_decomposition(&reply).steps.len(), 2);

        let reply = format!("```\n{}\n```", BODY);
        assert_eq!(parse_decomposition(&reply).steps.len(), 2);
    }

    #[test]
    fn test_missing_steps_falls_back() {
        let d = parse_decomposition(r#"{"character_name": "Lele"}"#);
        assert_eq!(d.steps.len(), 1);
        assert!(d.parse_error.is_some());
    }

    #[test]
    fn test_raw_response_is_truncated() {
        let reply = "x".repeat(2000);
        let d = parse_decomposition(&reply);
        assert_eq!(d.raw_response.unwrap().chars().count(), 500);
    }
}
