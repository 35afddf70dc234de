//! Deterministic fallbacks for when the model is unavailable
//!
//! Pure text heuristics: no network, no randomness, no wall clock. Tests can
//! assert exact output for a given input, and a misconfigured or rate-limited
//! model service degrades the product instead of breaking it.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::{BoundingBox, Difficulty, EntryMetadata, EntrySource, GlossaryEntry};

/// Confidence assigned to every fallback-sourced entry.
pub const FALLBACK_CONFIDENCE: f64 = 0.35;

/// Words shorter than this are too common to be worth glossing.
const MIN_WORD_LEN: usize = 5;

/// Length above which a fallback word is tagged `advanced`.
const ADVANCED_LEN: usize = 8;

const BOX_WIDTH: f64 = 0.18;
const BOX_HEIGHT: f64 = 0.10;
const TOP_MARGIN: f64 = 0.05;

/// Common words that never make useful vocabulary candidates.
const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "along", "among", "around", "because",
    "before", "being", "below", "between", "both", "could", "doing", "down",
    "during", "each", "every", "from", "going", "have", "having", "here",
    "into", "just", "like", "made", "make", "many", "more", "most", "much",
    "never", "only", "other", "over", "said", "same", "should", "since",
    "some", "still", "such", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "thing", "things", "this", "those", "through",
    "under", "until", "upon", "very", "were", "what", "when", "where",
    "which", "while", "will", "with", "would", "your",
];

fn letters_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z]+").expect("static pattern"))
}

/// Candidate vocabulary words from raw page text.
///
/// Lowercased, stripped of non-letter characters, length- and stop-word
/// filtered, deduplicated preserving first-seen order, capped at `max`.
pub fn vocabulary_candidates(text: &str, max: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let stripped = letters_only().replace_all(&lowered, " ");

    let mut seen: HashSet<&str> = HashSet::new();
    let mut candidates = Vec::new();
    for word in stripped.split_whitespace() {
        if candidates.len() >= max {
            break;
        }
        if word.chars().count() < MIN_WORD_LEN || STOP_WORDS.contains(&word) {
            continue;
        }
        if seen.insert(word) {
            candidates.push(word.to_string());
        }
    }
    candidates
}

/// Difficulty for a fallback word, from length alone.
pub fn derive_difficulty(word: &str) -> Difficulty {
    if word.chars().count() > ADVANCED_LEN {
        Difficulty::Advanced
    } else {
        Difficulty::Challenging
    }
}

/// Deterministic grid placement for box `index` of `total`.
///
/// Each candidate gets a distinct (row, column) cell; gaps spread the boxes
/// evenly across [0,1] when more than one column or row exists, and the top
/// margin keeps the first row clear of the image edge.
pub fn grid_position(index: usize, total: usize) -> BoundingBox {
    let total = total.max(1);
    let index = index.min(total - 1);

    let columns = (total as f64).sqrt().ceil() as usize;
    let rows = total.div_ceil(columns);
    let row = index / columns;
    let column = index % columns;

    let h_gap = if columns > 1 {
        (1.0 - columns as f64 * BOX_WIDTH) / (columns as f64 - 1.0)
    } else {
        0.0
    };
    let v_gap = if rows > 1 {
        (1.0 - TOP_MARGIN - rows as f64 * BOX_HEIGHT) / (rows as f64 - 1.0)
    } else {
        0.0
    };

    BoundingBox {
        top: TOP_MARGIN + row as f64 * (BOX_HEIGHT + v_gap),
        left: column as f64 * (BOX_WIDTH + h_gap),
        width: BOX_WIDTH,
        height: BOX_HEIGHT,
    }
}

/// Build fallback glossary entries from raw page text.
pub fn vocabulary_fallback(text: &str, max: usize) -> Vec<GlossaryEntry> {
    let words = vocabulary_candidates(text, max);
    let total = words.len();

    words
        .into_iter()
        .enumerate()
        .map(|(index, word)| GlossaryEntry {
            definition: format!("\"{}\" is a word from this page worth practicing.", word),
            translation: "translation not available offline".to_string(),
            difficulty: derive_difficulty(&word),
            confidence: FALLBACK_CONFIDENCE,
            position: grid_position(index, total),
            metadata: EntryMetadata {
                source: EntrySource::FallbackText,
                raw_box: None,
                note: Some("derived from page text without image analysis".to_string()),
            },
            word,
        })
        .collect()
}

/// Coarse page category for the canned description fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Cover,
    Story,
    Educational,
}

impl PageKind {
    pub fn from_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "cover" => Some(PageKind::Cover),
            "story" => Some(PageKind::Story),
            "educational" => Some(PageKind::Educational),
            _ => None,
        }
    }
}

/// Canned description used when no AI description is available at all.
pub fn describe_page_fallback(kind: Option<PageKind>) -> &'static str {
    match kind {
        Some(PageKind::Cover) => {
            "The cover of the book, showing its title and main illustration."
        }
        Some(PageKind::Story) => {
            "An illustrated story page. Look at the picture and find details that match the text."
        }
        Some(PageKind::Educational) => {
            "An educational page with a picture that supports the lesson on it."
        }
        None => "A page from the book with an illustration to explore while reading.",
    }
}
