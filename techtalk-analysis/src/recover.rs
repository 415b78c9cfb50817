//! Tolerant recovery of the `title`/`summary`/`tags` object from model text.
//!
//! Models wrap JSON in code fences and put raw line breaks inside string
//! values despite being told not to. [`recover`] repairs both before a strict
//! parse and never fails: unusable output yields placeholder values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TITLE_PLACEHOLDER: &str = "제목 추출 실패";
pub const SUMMARY_PLACEHOLDER: &str = "요약을 생성할 수 없습니다.";

/// A summary is either a single string or a list of sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Summary {
    Text(String),
    Items(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub url: String,
    pub title: String,
    pub summary: Summary,
    pub tags: Vec<String>,
}

impl AnalysisResult {
    /// The all-placeholder result returned for unusable model output.
    pub fn placeholder(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: TITLE_PLACEHOLDER.to_string(),
            summary: Summary::Text(SUMMARY_PLACEHOLDER.to_string()),
            tags: Vec::new(),
        }
    }
}

/// Recover an [`AnalysisResult`] from raw model output.
pub fn recover(url: &str, raw: &str) -> AnalysisResult {
    let cleaned = escape_newlines_in_strings(strip_code_fence(raw.trim()));

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(fields)) => from_fields(url, fields),
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "analysis.recover.not_object");
            AnalysisResult::placeholder(url)
        }
        Err(err) => {
            tracing::warn!(error = %err, raw = %raw, "analysis.recover.parse_failed");
            AnalysisResult::placeholder(url)
        }
    }
}

fn from_fields(url: &str, mut fields: Map<String, Value>) -> AnalysisResult {
    let title = match fields.remove("title") {
        Some(Value::String(title)) => title,
        _ => TITLE_PLACEHOLDER.to_string(),
    };
    let summary = match fields.remove("summary") {
        Some(Value::String(text)) => Summary::Text(text),
        Some(Value::Array(items)) => Summary::Items(strings_only(items)),
        _ => Summary::Text(SUMMARY_PLACEHOLDER.to_string()),
    };
    let tags = match fields.remove("tags") {
        Some(Value::Array(items)) => strings_only(items),
        _ => Vec::new(),
    };

    AnalysisResult {
        url: url.to_string(),
        title,
        summary,
        tags,
    }
}

/// Keep the string elements of a list; anything else is skipped.
fn strings_only(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// Strip a leading ```` ``` ```` fence (with optional alphabetic language tag
/// and its newline) and a trailing closing fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest)
}

/// Replace raw CR/LF inside double-quoted string literals with their JSON
/// escapes. Backslash escapes are honoured so `\"` does not end a string.
fn escape_newlines_in_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    out.push(c);
                }
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                _ => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
