use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::McqData;

/// Structured data pulled out of a model reply. The reply text itself is
/// always returned to the client in full, whatever is (or is not) found here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedOutput {
    pub desmos_expressions: Option<Vec<String>>,
    pub mcqs: Option<Vec<McqData>>,
}

static JSON_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("valid fence regex")
});

/// Scans a reply for fenced JSON blocks and extracts graph expressions and
/// quiz questions. This is lenient best-effort parsing: malformed JSON inside
/// a fence is ignored, unexpected fields are ignored, and when several fences
/// carry the same field the last one wins.
pub fn extract(reply: &str) -> ExtractedOutput {
    let mut out = ExtractedOutput::default();

    for caps in JSON_FENCE_RE.captures_iter(reply) {
        let Ok(value) = serde_json::from_str::<Value>(&caps[1]) else {
            continue;
        };

        if let Some(exprs) = value.get("desmos_expressions").and_then(Value::as_array) {
            let exprs: Vec<String> = exprs
                .iter()
                .filter_map(|e| e.as_str().map(str::to_string))
                .collect();
            if !exprs.is_empty() {
                out.desmos_expressions = Some(exprs);
            }
        }

        if let Some(entries) = value.get("mcqs").and_then(Value::as_array) {
            let mcqs: Vec<McqData> = entries.iter().filter_map(parse_mcq).collect();
            if !mcqs.is_empty() {
                out.mcqs = Some(mcqs);
            }
        }
    }

    out
}

/// A malformed quiz entry (missing/mistyped fields, or a correctAnswer that
/// is not one of its options) is skipped; the rest of the array is kept.
fn parse_mcq(entry: &Value) -> Option<McqData> {
    let mcq: McqData = serde_json::from_value(entry.clone()).ok()?;
    if mcq.question.is_empty() || mcq.options.is_empty() {
        return None;
    }
    if !mcq.options.contains(&mcq.correct_answer) {
        return None;
    }
    Some(mcq)
}
