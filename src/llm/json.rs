//! Lenient JSON extraction from model replies

use serde::de::DeserializeOwned;

/// Parse a model reply as JSON.
///
/// Tolerates a fenced ```json block and chatter around a single object.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> serde_json::Result<T> {
    let trimmed = reply.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let unfenced = strip_fence(trimmed);
    if let Ok(value) = serde_json::from_str(unfenced) {
        return Ok(value);
    }

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&unfenced[start..=end]),
        _ => serde_json::from_str(unfenced),
    }
}

/// Body of the first fenced block, or the input unchanged
pub fn strip_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after = &text[open + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_plain_and_fenced() {
        let v: Value = parse_json_reply(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);

        let v: Value = parse_json_reply("```json\n{\"a\": 2}\n```").unwrap();
        assert_eq!(v["a"], 2);

        let v: Value = parse_json_reply("Sure! {\"a\": 3} Hope that helps.").unwrap();
        assert_eq!(v["a"], 3);
    }

    #[test]
    fn test_strip_fence() {
        assert_eq!(strip_fence("```tsx\nconst a = 1;\n```"), "const a = 1;");
        assert_eq!(strip_fence("no fence"), "no fence");
    }

    #[test]
    fn test_rejects_prose() {
        assert!(parse_json_reply::<Value>("no json here").is_err());
    }
}
