//! Prompt composition for the vision model
//!
//! The single biggest source of downstream repair work is schema drift, so
//! the instructions spell out the coordinate convention, the precision rule,
//! and the closed difficulty set, and forbid prose outside the JSON object.

use serde::{Deserialize, Serialize};

/// Page and book metadata used to build prompts and fallback input.
///
/// Mirrors what the metadata provider hands the pipeline for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    pub title: String,
    pub difficulty_level: String,
    pub target_age_min: u32,
    pub target_age_max: u32,
    pub page_number: u32,
    pub image_url: String,
    #[serde(default)]
    pub text_content: String,
}

pub const GLOSSARY_SYSTEM: &str = r#"You are a reading tutor analyzing one page of an illustrated English book for a young learner.

OUTPUT FORMAT (JSON):
{
  "entries": [
    {
      "word": "lighthouse",
      "definition": "a tall tower with a bright light that guides ships",
      "translation": "the word translated into the learner's language",
      "difficulty": "beginner|intermediate|advanced|challenging",
      "confidence": 0.85,
      "position": {"top": 0.12, "left": 0.4, "width": 0.2, "height": 0.08}
    }
  ]
}

CRITICAL RULES:
- Output ONLY the JSON object. No prose, no markdown fences, no commentary.
- "difficulty" must be exactly one of: beginner, intermediate, advanced, challenging
- All "position" values are fractions of the image in the range 0 to 1, NOT pixels.
- "top"/"left" locate the word or the object it names; "width"/"height" cover it.
- "confidence" is between 0 and 1 with at most 3 decimal places.
- Only include words that actually appear in the page image or its text.
- Every entry must have a non-empty word, definition, and translation."#;

pub const DESCRIPTION_SYSTEM: &str = r#"You are a reading tutor describing a book page image to a young English learner.

Write 1 to 3 short, friendly sentences about what the picture shows, using vocabulary appropriate for the stated age range. Output plain text only: no JSON, no markdown."#;

/// User prompt for glossary extraction on one page.
pub fn glossary_user_prompt(page: &PageContext, max_entries: usize) -> String {
    format!(
        "Book: \"{}\" (difficulty: {}, ages {}-{}), page {}.\n\
         Extract up to {} vocabulary entries a learner in that age range would find worth studying.\n\
         Page text (may be partial):\n{}",
        page.title,
        page.difficulty_level,
        page.target_age_min,
        page.target_age_max,
        page.page_number,
        max_entries,
        page.text_content
    )
}

/// User prompt for a learner-friendly image description.
pub fn description_user_prompt(page: &PageContext) -> String {
    format!(
        "Book: \"{}\", page {}. Describe what this page's picture shows for readers aged {}-{}.",
        page.title, page.page_number, page.target_age_min, page.target_age_max
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> PageContext {
        PageContext {
            title: "The Lighthouse Keeper".to_string(),
            difficulty_level: "beginner".to_string(),
            target_age_min: 6,
            target_age_max: 9,
            page_number: 4,
            image_url: "https://books.example/pages/4.jpg".to_string(),
            text_content: "The keeper lit the lamp at dusk.".to_string(),
        }
    }

    #[test]
    fn test_system_prompt_pins_down_the_schema() {
        assert!(GLOSSARY_SYSTEM.contains("range 0 to 1, NOT pixels"));
        assert!(GLOSSARY_SYSTEM.contains("beginner, intermediate, advanced, challenging"));
        assert!(GLOSSARY_SYSTEM.contains("ONLY the JSON object"));
        assert!(GLOSSARY_SYSTEM.contains("3 decimal places"));
    }

    #[test]
    fn test_glossary_user_prompt_carries_task_parameters() {
        let prompt = glossary_user_prompt(&sample_page(), 5);
        assert!(prompt.contains("The Lighthouse Keeper"));
        assert!(prompt.contains("ages 6-9"));
        assert!(prompt.contains("page 4"));
        assert!(prompt.contains("up to 5"));
        assert!(prompt.contains("lit the lamp"));
    }

    #[test]
    fn test_description_user_prompt_carries_age_range() {
        let prompt = description_user_prompt(&sample_page());
        assert!(prompt.contains("aged 6-9"));
        assert!(prompt.contains("page 4"));
    }
}
