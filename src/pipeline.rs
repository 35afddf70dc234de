//! The analysis pipeline
//!
//! prompt + image resolution → model call → parse/repair → normalize →
//! assemble. Every degraded path (missing credentials, network failure,
//! timeout, unusable output) routes into the deterministic fallback and is
//! recorded as provenance on the envelope; the pipeline itself never errors.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::glossary::fallback::{describe_page_fallback, vocabulary_fallback, PageKind};
use crate::glossary::normalize::{normalize_entry, AI_DEFAULT_CONFIDENCE};
use crate::glossary::parse::{entries_array, parse_model_json, ParseOutcome};
use crate::glossary::{DescriptionResult, EntrySource, GlossaryEntry, GlossaryResult};
use crate::image::resolve_image_source;
use crate::prompt::{self, PageContext};
use crate::vision::ModelClient;

/// Default cap on returned glossary entries.
pub const DEFAULT_MAX_ENTRIES: usize = 8;

/// One configured analysis pipeline. Cheap to clone; holds no per-request
/// state, so concurrent pages need no coordination.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: Config,
    client: Option<ModelClient>,
    http: reqwest::Client,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        let client = ModelClient::from_config(&config);
        Self {
            client,
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Extract a glossary for one page.
    ///
    /// Never errors: a degraded analysis returns fallback entries with
    /// `used_fallback` set, and an empty result is a valid outcome.
    pub async fn extract_glossary(&self, page: &PageContext, max_entries: usize) -> GlossaryResult {
        let request_id = Uuid::new_v4();
        let mut reasons: Vec<String> = Vec::new();
        let mut ai_entries: Vec<GlossaryEntry> = Vec::new();

        match &self.client {
            None => {
                warn!(%request_id, "model credentials missing; skipping AI call");
                reasons.push("missing_api_credentials".to_string());
            }
            Some(client) => {
                let image_ref = self.image_reference(page).await;
                let user = prompt::glossary_user_prompt(page, max_entries);
                match client
                    .chat_vision(
                        prompt::GLOSSARY_SYSTEM,
                        &user,
                        &image_ref,
                        self.config.glossary_timeout_ms,
                        true,
                    )
                    .await
                {
                    Ok(content) => match parse_model_json(&content) {
                        ParseOutcome::Failed => {
                            warn!(%request_id, "model output unparseable after repair");
                            reasons.push("json_parse_error".to_string());
                        }
                        outcome => {
                            if outcome.was_repaired() {
                                debug!(%request_id, "model JSON repaired locally");
                            }
                            let raw_entries =
                                outcome.value().map(entries_array).unwrap_or_default();
                            let total = raw_entries.len();
                            ai_entries = raw_entries
                                .iter()
                                .enumerate()
                                .filter_map(|(index, raw)| {
                                    normalize_entry(
                                        raw,
                                        AI_DEFAULT_CONFIDENCE,
                                        index,
                                        total,
                                        EntrySource::AiVision,
                                    )
                                })
                                .collect();
                            if ai_entries.is_empty() {
                                reasons.push("no_entries_extracted".to_string());
                            }
                        }
                    },
                    Err(err) => {
                        warn!(%request_id, "glossary model call failed: {err}");
                        reasons.push(err.reason_tag().to_string());
                    }
                }
            }
        }

        let entries = if ai_entries.is_empty() {
            vocabulary_fallback(&page.text_content, max_entries)
        } else {
            ai_entries
        };
        assemble(entries, reasons, max_entries, request_id)
    }

    /// Describe the page image in learner-friendly language.
    pub async fn describe_image(
        &self,
        page: &PageContext,
        kind: Option<PageKind>,
    ) -> DescriptionResult {
        let request_id = Uuid::new_v4();
        let mut reasons: Vec<String> = Vec::new();

        match &self.client {
            None => {
                warn!(%request_id, "model credentials missing; using canned description");
                reasons.push("missing_api_credentials".to_string());
            }
            Some(client) => {
                let image_ref = self.image_reference(page).await;
                let user = prompt::description_user_prompt(page);
                match client
                    .chat_vision(
                        prompt::DESCRIPTION_SYSTEM,
                        &user,
                        &image_ref,
                        self.config.vision_timeout_ms,
                        false,
                    )
                    .await
                {
                    Ok(content) => {
                        info!(%request_id, "image description generated");
                        return DescriptionResult {
                            description: content,
                            used_fallback: false,
                            fallback_reasons: reasons,
                            generated_at: Utc::now(),
                        };
                    }
                    Err(err) => {
                        warn!(%request_id, "description model call failed: {err}");
                        reasons.push(err.reason_tag().to_string());
                    }
                }
            }
        }

        DescriptionResult {
            description: describe_page_fallback(kind).to_string(),
            used_fallback: true,
            fallback_reasons: reasons,
            generated_at: Utc::now(),
        }
    }

    /// Inlined data URL when the image fits the ceiling, else the original.
    async fn image_reference(&self, page: &PageContext) -> String {
        match resolve_image_source(
            &self.http,
            &page.image_url,
            self.config.inline_image_max_bytes,
        )
        .await
        {
            Some(inline) => inline.data_url,
            None => page.image_url.clone(),
        }
    }
}

fn assemble(
    mut entries: Vec<GlossaryEntry>,
    fallback_reasons: Vec<String>,
    max_entries: usize,
    request_id: Uuid,
) -> GlossaryResult {
    entries.truncate(max_entries);
    let used_fallback = entries
        .iter()
        .any(|entry| entry.metadata.source == EntrySource::FallbackText);
    let total = entries.len();
    info!(%request_id, total, used_fallback, "glossary analysis complete");
    GlossaryResult {
        entries,
        used_fallback,
        fallback_reasons,
        total,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glossary::fallback::FALLBACK_CONFIDENCE;
    use crate::glossary::Difficulty;

    fn offline_analyzer() -> Analyzer {
        // No api_key: the client is never constructed, so no network call
        // can be attempted anywhere in the pipeline.
        Analyzer::new(Config {
            api_key: None,
            ..Config::default()
        })
    }

    fn owl_page() -> PageContext {
        PageContext {
            title: "Forest Nights".to_string(),
            difficulty_level: "beginner".to_string(),
            target_age_min: 6,
            target_age_max: 9,
            page_number: 2,
            image_url: "https://books.example/forest/2.jpg".to_string(),
            text_content: "The curious owl perched silently on the ancient oak branch".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_uses_fallback() {
        let result = offline_analyzer().extract_glossary(&owl_page(), 3).await;

        assert!(result.used_fallback);
        assert!(result
            .fallback_reasons
            .iter()
            .any(|r| r == "missing_api_credentials"));
        assert_eq!(result.total, 3);
        assert_eq!(result.entries.len(), 3);

        let words: Vec<&str> = result.entries.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["curious", "perched", "silently"]);
        for entry in &result.entries {
            assert_eq!(entry.confidence, FALLBACK_CONFIDENCE);
            assert_eq!(entry.metadata.source, EntrySource::FallbackText);
            assert_eq!(entry.difficulty, Difficulty::Challenging);
        }
    }

    #[tokio::test]
    async fn test_empty_page_text_is_a_valid_empty_result() {
        let mut page = owl_page();
        page.text_content = String::new();
        let result = offline_analyzer().extract_glossary(&page, 5).await;

        assert!(result.entries.is_empty());
        assert_eq!(result.total, 0);
        // No fallback entry made it into the result, so the flag stays false
        // even though the fallback path ran.
        assert!(!result.used_fallback);
        assert!(!result.fallback_reasons.is_empty());
    }

    #[tokio::test]
    async fn test_describe_image_offline_uses_canned_text() {
        let result = offline_analyzer()
            .describe_image(&owl_page(), Some(PageKind::Story))
            .await;

        assert!(result.used_fallback);
        assert_eq!(result.description, describe_page_fallback(Some(PageKind::Story)));
        assert!(result
            .fallback_reasons
            .iter()
            .any(|r| r == "missing_api_credentials"));
    }

    #[test]
    fn test_fenced_truncated_model_output_normalizes_with_defaults() {
        // Missing trailing fence, no difficulty/confidence/position: the
        // entry still comes out fully formed.
        let raw = "```json\n{\"entries\":[{\"word\":\"lighthouse\",\"definition\":\"a tower with a light\",\"translation\":\"灯塔\"}]}";
        let outcome = parse_model_json(raw);
        let raw_entries = outcome.value().map(entries_array).unwrap_or_default();
        assert_eq!(raw_entries.len(), 1);

        let entry = normalize_entry(
            &raw_entries[0],
            AI_DEFAULT_CONFIDENCE,
            0,
            1,
            EntrySource::AiVision,
        )
        .unwrap();
        assert_eq!(entry.word, "lighthouse");
        assert_eq!(entry.difficulty, Difficulty::Challenging);
        assert_eq!(entry.confidence, AI_DEFAULT_CONFIDENCE);
        assert_eq!(
            entry.position,
            crate::glossary::fallback::grid_position(0, 1)
        );
    }

    #[test]
    fn test_assemble_truncates_and_flags_fallback() {
        let entries = vocabulary_fallback(
            "The curious owl perched silently on the ancient oak branch",
            5,
        );
        let result = assemble(entries, vec!["vision_timeout".to_string()], 2, Uuid::new_v4());

        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.total, 2);
        assert!(result.used_fallback);
        assert_eq!(result.fallback_reasons, vec!["vision_timeout"]);
    }

    #[test]
    fn test_assemble_without_fallback_entries() {
        let result = assemble(Vec::new(), Vec::new(), 5, Uuid::new_v4());
        assert!(!result.used_fallback);
        assert_eq!(result.total, 0);
    }
}
