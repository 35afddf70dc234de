//! Glossary data model
//!
//! Entries are request-scoped value objects: a full set is built per analysis
//! and replaces any prior set for the page, never merged or mutated
//! field-by-field afterwards.

pub mod fallback;
pub mod normalize;
pub mod parse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reading difficulty bucket for one glossary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Challenging,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Challenging => "challenging",
        }
    }

    /// Map loose model output onto the closed set.
    ///
    /// Unrecognized labels land in `Challenging`, the bucket that tells the
    /// learner "needs more scrutiny" instead of guessing a friendlier one.
    pub fn from_loose(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "beginner" | "easy" => Difficulty::Beginner,
            "intermediate" | "medium" | "moderate" => Difficulty::Intermediate,
            "advanced" | "hard" | "difficult" => Difficulty::Advanced,
            _ => Difficulty::Challenging,
        }
    }
}

/// Normalized bounding box; every field is a fraction of the page image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySource {
    #[serde(rename = "ai-vision")]
    AiVision,
    #[serde(rename = "fallback-text")]
    FallbackText,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::AiVision => "ai-vision",
            EntrySource::FallbackText => "fallback-text",
        }
    }
}

/// Provenance recorded alongside each entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub source: EntrySource,
    /// The box exactly as the model emitted it, before clamping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_box: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One vocabulary/phrase annotation for a page image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub word: String,
    pub definition: String,
    pub translation: String,
    pub difficulty: Difficulty,
    pub confidence: f64,
    pub position: BoundingBox,
    pub metadata: EntryMetadata,
}

/// Response envelope for one glossary analysis.
///
/// `used_fallback` holds exactly when at least one entry in `entries` came
/// from the fallback generator; `fallback_reasons` are diagnostic tags, not a
/// behavioral contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryResult {
    pub entries: Vec<GlossaryEntry>,
    pub used_fallback: bool,
    pub fallback_reasons: Vec<String>,
    pub total: usize,
    pub generated_at: DateTime<Utc>,
}

/// Envelope for a page image description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionResult {
    pub description: String,
    pub used_fallback: bool,
    pub fallback_reasons: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_from_loose_known_values() {
        assert_eq!(Difficulty::from_loose("beginner"), Difficulty::Beginner);
        assert_eq!(Difficulty::from_loose("Intermediate"), Difficulty::Intermediate);
        assert_eq!(Difficulty::from_loose("ADVANCED"), Difficulty::Advanced);
        assert_eq!(Difficulty::from_loose("challenging"), Difficulty::Challenging);
    }

    #[test]
    fn test_difficulty_from_loose_synonyms() {
        assert_eq!(Difficulty::from_loose("easy"), Difficulty::Beginner);
        assert_eq!(Difficulty::from_loose("medium"), Difficulty::Intermediate);
        assert_eq!(Difficulty::from_loose("moderate"), Difficulty::Intermediate);
        assert_eq!(Difficulty::from_loose("hard"), Difficulty::Advanced);
        assert_eq!(Difficulty::from_loose("difficult"), Difficulty::Advanced);
    }

    #[test]
    fn test_difficulty_from_loose_unknown_is_challenging() {
        assert_eq!(Difficulty::from_loose("expert"), Difficulty::Challenging);
        assert_eq!(Difficulty::from_loose(""), Difficulty::Challenging);
        assert_eq!(Difficulty::from_loose("  trivial "), Difficulty::Challenging);
    }

    #[test]
    fn test_entry_source_serializes_with_hyphen() {
        let json = serde_json::to_string(&EntrySource::AiVision).unwrap();
        assert_eq!(json, "\"ai-vision\"");
        let json = serde_json::to_string(&EntrySource::FallbackText).unwrap();
        assert_eq!(json, "\"fallback-text\"");
    }

    #[test]
    fn test_difficulty_serializes_lowercase() {
        let json = serde_json::to_string(&Difficulty::Beginner).unwrap();
        assert_eq!(json, "\"beginner\"");
    }
}
