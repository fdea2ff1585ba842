//! Best-effort recovery of a JSON object from model output.
//!
//! Models asked for bare JSON still wrap it in markdown fences or add prose
//! around it. Recovery tries, in order: the fence-stripped text, the first
//! balanced `{...}` span that parses, and the widest `{...}` span.

use serde_json::Value;

const EXCERPT_CHARS: usize = 200;

/// Failure to recover JSON from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedJson {
    /// Parser error for the fence-stripped text.
    pub reason: String,
    /// Leading part of the reply, for diagnostics.
    pub excerpt: String,
}

/// Parses `text` as JSON, tolerating fences and surrounding prose.
///
/// # Errors
///
/// Returns [`MalformedJson`] if no candidate span parses.
pub fn parse_lenient(text: &str) -> Result<Value, MalformedJson> {
    let cleaned = strip_code_fences(text);

    let first_error = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    if let Some(value) = cleaned
        .match_indices('{')
        .filter_map(|(start, _)| balanced_object_end(cleaned, start).map(|end| &cleaned[start..=end]))
        .find_map(|span| serde_json::from_str::<Value>(span).ok())
    {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(MalformedJson {
        reason: first_error.to_string(),
        excerpt: cleaned.chars().take(EXCERPT_CHARS).collect(),
    })
}

/// Removes a leading ```` ```json ```` / ```` ``` ```` fence and a trailing fence.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Returns the byte index of the `}` closing the object opened at `start`.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_json() {
        assert_eq!(parse_lenient(r#"{"a": 1}"#).unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn strips_markdown_fences() {
        let reply = "```json\n{\"status\": \"ok\"}\n```";
        assert_eq!(parse_lenient(reply).unwrap(), json!({ "status": "ok" }));

        let reply = "```\n{\"status\": \"ok\"}\n```";
        assert_eq!(parse_lenient(reply).unwrap(), json!({ "status": "ok" }));
    }

    #[test]
    fn extracts_object_from_prose() {
        let reply = "Here is the plan you asked for:\n{\"steps\": []}\nLet me know if you need more.";
        assert_eq!(parse_lenient(reply).unwrap(), json!({ "steps": [] }));
    }

    #[test]
    fn takes_first_well_formed_object_when_several_exist() {
        let reply = r#"First {"a": 1} and then {"b": 2}"#;
        assert_eq!(parse_lenient(reply).unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_matching() {
        let reply = r#"Result: {"text": "a } brace", "n": {"m": 1}} trailing"#;
        assert_eq!(
            parse_lenient(reply).unwrap(),
            json!({ "text": "a } brace", "n": { "m": 1 } })
        );
    }

    #[test]
    fn skips_broken_leading_fragment() {
        let reply = r#"{oops} then {"ok": true}"#;
        assert_eq!(parse_lenient(reply).unwrap(), json!({ "ok": true }));
    }

    #[test]
    fn reports_excerpt_when_nothing_parses() {
        let err = parse_lenient("no json here at all").unwrap_err();
        assert_eq!(err.excerpt, "no json here at all");
        assert!(!err.reason.is_empty());
    }
}
