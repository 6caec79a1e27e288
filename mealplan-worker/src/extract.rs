//! Tolerant payload extraction from model output
//!
//! Models wrap JSON in prose and code fences. After dropping fence lines,
//! every `{` or `[` is tried as the start of a JSON value; the first complete
//! value that also fits the expected type wins. Truncated or partially valid
//! data is never returned.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("model returned no content")]
    Empty,

    #[error("no complete JSON value in model output")]
    NoPayload,

    /// JSON was found but none of it has the expected shape
    #[error("JSON does not match the expected schema: {0}")]
    Schema(String),
}

pub fn extract_payload<T: DeserializeOwned>(raw: &str) -> Result<T, ExtractError> {
    let text = strip_fences(raw);
    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    let mut schema_error = None;

    for (start, _) in text.char_indices().filter(|(_, c)| matches!(c, '{' | '[')) {
        let mut values =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<serde_json::Value>();

        let Some(Ok(value)) = values.next() else {
            continue;
        };

        match serde_json::from_value::<T>(value) {
            Ok(payload) => return Ok(payload),
            Err(e) => {
                // The outermost mismatch explains the most
                schema_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    match schema_error {
        Some(message) => Err(ExtractError::Schema(message)),
        None => Err(ExtractError::NoPayload),
    }
}

fn strip_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        meals: Vec<String>,
    }

    fn payload(meals: &[&str]) -> Payload {
        Payload {
            meals: meals.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"meals\": [\"Shakshuka\"]}\n```";
        assert_eq!(extract_payload::<Payload>(raw), Ok(payload(&["Shakshuka"])));
    }

    #[test]
    fn test_json_surrounded_by_prose() {
        let raw = "Sure! Here is your plan: {\"meals\": [\"Dal\", \"Rice\"]} Enjoy {your meals}.";
        assert_eq!(
            extract_payload::<Payload>(raw),
            Ok(payload(&["Dal", "Rice"]))
        );
    }

    #[test]
    fn test_payload_nested_in_wrapper_object() {
        let raw = r#"{"response": {"meals": ["Pho"]}, "model": "x"}"#;
        assert_eq!(extract_payload::<Payload>(raw), Ok(payload(&["Pho"])));
    }

    #[test]
    fn test_truncated_json_is_rejected() {
        let raw = "{\"meals\": [\"Ramen\", \"Ud";
        assert_eq!(extract_payload::<Payload>(raw), Err(ExtractError::NoPayload));
    }

    #[test]
    fn test_wrong_shape_reports_schema_error() {
        let raw = r#"{"dishes": ["Tacos"]}"#;
        assert!(matches!(
            extract_payload::<Payload>(raw),
            Err(ExtractError::Schema(_))
        ));
    }

    #[test]
    fn test_blank_output() {
        assert_eq!(
            extract_payload::<Payload>("```\n   \n```"),
            Err(ExtractError::Empty)
        );
        assert_eq!(
            extract_payload::<Payload>("I cannot help with that."),
            Err(ExtractError::NoPayload)
        );
    }
}
