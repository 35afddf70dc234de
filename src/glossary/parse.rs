//! Parsing and repair of raw model output
//!
//! Model output is never assumed well-formed. Responses are routinely
//! truncated mid-structure under token limits, and re-prompting wastes a full
//! round trip; appending the missing closers recovers the common case
//! locally. The repair runs once, handles only missing trailing delimiters,
//! and lets interior syntax errors (quote mismatches, bad escapes) fall
//! through to `Failed`.

use serde_json::Value;

/// Outcome of one parse-and-repair pass over raw model text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Parsed as-is after code-fence stripping.
    Parsed(Value),
    /// Parsed only after trailing-content trim or bracket balancing.
    Repaired(Value),
    /// Unusable; the caller treats this like "model unavailable".
    Failed,
}

impl ParseOutcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            ParseOutcome::Parsed(v) | ParseOutcome::Repaired(v) => Some(v),
            ParseOutcome::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ParseOutcome::Failed)
    }

    pub fn was_repaired(&self) -> bool {
        matches!(self, ParseOutcome::Repaired(_))
    }
}

/// Strip Markdown code-fence markers from a model response.
///
/// Handles a leading ```` ```json ```` (any language tag) and a trailing
/// ```` ``` ````; either may be missing when the response was truncated.
pub fn strip_code_fences(text: &str) -> &str {
    let mut clean = text.trim();
    if let Some(rest) = clean.strip_prefix("```") {
        // Drop the whole fence line, including any language tag.
        clean = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    if let Some(rest) = clean.trim_end().strip_suffix("```") {
        clean = rest;
    }
    clean.trim()
}

/// Append missing closing brackets and braces: squares first, then curlies.
///
/// Counts are naive (delimiters inside string literals count too); good
/// enough for the truncation defect this targets.
pub fn balance_brackets(text: &str) -> String {
    let mut open_square = 0usize;
    let mut close_square = 0usize;
    let mut open_curly = 0usize;
    let mut close_curly = 0usize;
    for c in text.chars() {
        match c {
            '[' => open_square += 1,
            ']' => close_square += 1,
            '{' => open_curly += 1,
            '}' => close_curly += 1,
            _ => {}
        }
    }

    let missing_square = open_square.saturating_sub(close_square);
    let missing_curly = open_curly.saturating_sub(close_curly);
    if missing_square == 0 && missing_curly == 0 {
        return text.to_string();
    }

    let mut repaired = String::with_capacity(text.len() + missing_square + missing_curly);
    repaired.push_str(text);
    for _ in 0..missing_square {
        repaired.push(']');
    }
    for _ in 0..missing_curly {
        repaired.push('}');
    }
    repaired
}

/// Parse raw model text, repairing truncation defects when needed.
///
/// Attempts in order, returning at the first success:
/// fence strip + direct parse, trim after the last `}`, bracket balancing.
/// Repair is a single pass; it never loops.
pub fn parse_model_json(raw: &str) -> ParseOutcome {
    let clean = strip_code_fences(raw);
    if clean.is_empty() {
        return ParseOutcome::Failed;
    }

    if let Ok(value) = serde_json::from_str::<Value>(clean) {
        return ParseOutcome::Parsed(value);
    }

    // Partial continuation text after the last closer is the cheapest defect
    // to fix: discard it and retry.
    if let Some(idx) = clean.rfind('}') {
        let trimmed = &clean[..=idx];
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return ParseOutcome::Repaired(value);
        }
    }

    let balanced = balance_brackets(clean);
    if balanced != clean {
        if let Ok(value) = serde_json::from_str::<Value>(&balanced) {
            return ParseOutcome::Repaired(value);
        }
    }

    ParseOutcome::Failed
}

/// Pull the candidate entry list out of a parsed value.
///
/// Accepts a bare array or an object carrying an `entries` array; any other
/// shape yields zero entries.
pub fn entries_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map
            .get("entries")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
