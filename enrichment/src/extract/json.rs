//! JSON-object extraction from answers that embed (often sloppy) JSON.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::compile;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)```(?i:json)?\s*(\{[^`]*\})\s*```"));

static KEY_VALUE_MARKERS: LazyLock<[Regex; 6]> = LazyLock::new(|| {
    [
        compile(r"'key'\s*:\s*"),
        compile(r#""key"\s*:\s*"#),
        compile(r"'value'\s*:\s*"),
        compile(r#""value"\s*:\s*"#),
        compile(r"\bkey\s*:\s*"),
        compile(r"\bvalue\s*:\s*"),
    ]
});

/// Extracts the last well-formed JSON object of an answer.
///
/// Fenced code blocks are tried first, newest to oldest; if none parses, every
/// top-level brace span of the raw text is tried the same way. Candidates that
/// fail strict parsing get one repair pass stripping `key:` / `value:`
/// markers. The parsed object is normalized with [`normalize_key_value`];
/// an object that normalizes to nothing yields `None`.
///
/// Already-structured values are serialized first, so a previously parsed
/// specification passes through unchanged.
#[must_use]
pub fn extract_json_object(input: &Value) -> Option<Map<String, Value>> {
    let text = match input {
        Value::String(text) => text.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };

    let fenced: Vec<&str> = FENCED_JSON
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    fenced
        .iter()
        .rev()
        .find_map(|candidate| parse_candidate(candidate))
        .or_else(|| {
            brace_spans(&text)
                .into_iter()
                .rev()
                .find_map(parse_candidate)
        })
}

fn parse_candidate(candidate: &str) -> Option<Map<String, Value>> {
    let parsed = serde_json::from_str::<Value>(candidate)
        .or_else(|_| serde_json::from_str::<Value>(&strip_key_value_markers(candidate)))
        .ok()?;

    match normalize_key_value(parsed) {
        Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    }
}

/// Collects every top-level `{...}` span using a brace-depth counter.
fn brace_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (index, ch) in text.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = index;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=index]);
                }
            }
            _ => {}
        }
    }

    spans
}

fn strip_key_value_markers(candidate: &str) -> String {
    KEY_VALUE_MARKERS
        .iter()
        .fold(candidate.to_string(), |acc, marker| marker.replace_all(&acc, "").into_owned())
}

fn is_key_value_pair(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.contains_key("key") && map.contains_key("value")
}

/// Collapses `{"key": .., "value": ..}` wrappers into their value.
///
/// Objects holding exactly the keys `key` and `value` are replaced by their
/// normalized `value`. Any other member named `key` or `value`
/// (case-insensitive) is dropped. Arrays are normalized element-wise.
#[must_use]
pub fn normalize_key_value(value: Value) -> Value {
    match value {
        Value::Object(mut map) if is_key_value_pair(&map) => {
            normalize_key_value(map.remove("value").unwrap_or(Value::Null))
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| {
                    !key.eq_ignore_ascii_case("key") && !key.eq_ignore_ascii_case("value")
                })
                .map(|(key, value)| (key, normalize_key_value(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_key_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_fenced_block_wins() {
        let answer = json!(
            "Brouillon:\n```json\n{\"poids\": \"3\"}\n```\nVersion finale:\n```json\n{\"poids\": \"4.2\", \"micros\": \"2\"}\n```"
        );
        let map = extract_json_object(&answer).unwrap();
        assert_eq!(map["poids"], "4.2");
        assert_eq!(map["micros"], "2");
    }

    #[test]
    fn test_broken_last_block_falls_back_to_previous() {
        let answer = json!("```\n{\"a\": 1}\n```\n```json\n{\"b\": }\n```");
        let map = extract_json_object(&answer).unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_brace_scan_without_fences() {
        let answer = json!("Specs: {\"cordes\": 4} puis {\"frettes\": {\"nombre\": 21}} fin }");
        let map = extract_json_object(&answer).unwrap();
        assert_eq!(map["frettes"]["nombre"], 21);
    }

    #[test]
    fn test_key_value_wrapper_collapses() {
        let answer = json!("```json\n{\"longueur\": {\"key\":\"length\",\"value\":\"45\"}, \"liste\": [{\"key\": \"a\", \"value\": {\"key\": \"b\", \"value\": \"1\"}}]}\n```");
        let map = extract_json_object(&answer).unwrap();
        assert_eq!(map["longueur"], "45");
        assert_eq!(map["liste"], json!(["1"]));
    }

    #[test]
    fn test_stray_key_members_are_dropped() {
        let normalized = normalize_key_value(json!({"Key": "x", "type": "basse", "VALUE": 3}));
        assert_eq!(normalized, json!({"type": "basse"}));
    }

    #[test]
    fn test_repair_pass_strips_markers() {
        let answer = json!("{\"specs\": {\"key\": \"micros\", \"nombre\": 2}, \"value\": \"x\"}");
        let map = extract_json_object(&answer).unwrap();
        assert_eq!(map["specs"], json!({"nombre": 2}));

        let sloppy = json!("{\"micros\": value: \"2\"}");
        let map = extract_json_object(&sloppy).unwrap();
        assert_eq!(map["micros"], "2");
    }

    #[test]
    fn test_structured_input_passes_through() {
        let parsed = json!({"entrées": 2, "sorties": {"key": "out", "value": 4}});
        let map = extract_json_object(&parsed).unwrap();
        assert_eq!(map["entrées"], 2);
        assert_eq!(map["sorties"], 4);
    }

    #[test]
    fn test_empty_or_missing_yields_none() {
        assert!(extract_json_object(&json!("```json\n{}\n```")).is_none());
        assert!(extract_json_object(&json!({"key": "a", "value": "b"})).is_none());
        assert!(extract_json_object(&json!("aucune donnée")).is_none());
        assert!(extract_json_object(&Value::Null).is_none());
    }
}
