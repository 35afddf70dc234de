//! Validation and clamping of raw model entries
//!
//! Each loosely-typed candidate either becomes a fully-validated
//! `GlossaryEntry` or is discarded. Partial entries are never defaulted into
//! shape: vocabulary help with a missing definition or translation is worse
//! than no entry at all.

use serde_json::Value;

use super::fallback::grid_position;
use super::{BoundingBox, Difficulty, EntryMetadata, EntrySource, GlossaryEntry};

/// Default confidence for AI-sourced entries missing a usable value.
pub const AI_DEFAULT_CONFIDENCE: f64 = 0.6;

/// Smallest visible box edge. Anything thinner is invisible as a tap target.
pub const MIN_BOX_EDGE: f64 = 0.04;

/// Clamp a confidence to [0,1] and round to three decimals.
///
/// Non-finite input takes the caller's default; finite out-of-range values
/// are clamped rather than replaced.
pub fn normalize_confidence(raw: f64, default: f64) -> f64 {
    if !raw.is_finite() {
        return default;
    }
    round3(raw.clamp(0.0, 1.0))
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn confidence_from_value(raw: Option<&Value>, default: f64) -> f64 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        // Models occasionally quote their numbers.
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(x) => normalize_confidence(x, default),
        None => default,
    }
}

/// Clamp a raw box into normalized coordinate space.
///
/// `top`/`left` clamp to [0,1]; `width`/`height` additionally floor at
/// `MIN_BOX_EDGE` so no region degenerates to invisible.
pub fn clamp_box(top: f64, left: f64, width: f64, height: f64) -> BoundingBox {
    BoundingBox {
        top: clamp_offset(top),
        left: clamp_offset(left),
        width: clamp_edge(width),
        height: clamp_edge(height),
    }
}

fn clamp_offset(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn clamp_edge(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(MIN_BOX_EDGE, 1.0)
    } else {
        MIN_BOX_EDGE
    }
}

fn box_from_object(value: &Value) -> Option<BoundingBox> {
    let obj = value.as_object()?;
    let field = |key: &str| obj.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN);
    Some(clamp_box(
        field("top"),
        field("left"),
        field("width"),
        field("height"),
    ))
}

fn non_empty_text(raw: Option<&Value>) -> Option<String> {
    raw?.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Validate one raw candidate into a `GlossaryEntry`, or discard it.
///
/// `index`/`total` feed the deterministic grid placement used when the model
/// supplied no usable bounding box; spreading un-positioned entries avoids
/// stacking them all in one corner of the image.
pub fn normalize_entry(
    raw: &Value,
    default_confidence: f64,
    index: usize,
    total: usize,
    source: EntrySource,
) -> Option<GlossaryEntry> {
    let word = non_empty_text(raw.get("word"))?;
    let definition = non_empty_text(raw.get("definition"))?;
    let translation = non_empty_text(raw.get("translation"))?;

    let difficulty = raw
        .get("difficulty")
        .and_then(Value::as_str)
        .map(Difficulty::from_loose)
        .unwrap_or(Difficulty::Challenging);

    let confidence = confidence_from_value(raw.get("confidence"), default_confidence);

    let raw_box = raw.get("position").or_else(|| raw.get("bounding_box"));
    let (position, raw_box_meta, note) = match raw_box.and_then(box_from_object) {
        Some(clamped) => (clamped, raw_box.cloned(), None),
        None => (
            grid_position(index, total),
            None,
            Some("no usable bounding box; grid placement".to_string()),
        ),
    };

    Some(GlossaryEntry {
        word,
        definition,
        translation,
        difficulty,
        confidence,
        position,
        metadata: EntryMetadata {
            source,
            raw_box: raw_box_meta,
            note,
        },
    })
}
