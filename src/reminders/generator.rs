//! Reminder generator: asks the LLM for reminder candidates and validates
//! what comes back into [`ReminderDraft`]s.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::answers::Answer;
use crate::error::ReminderError;
use crate::llm::provider::{CompletionRequest, LlmProvider};

use super::model::{Category, ReminderDraft};
use super::prompts;

/// Days ahead a quick-added reminder is due when the text names no date.
pub const QUICK_ADD_DEFAULT_DAYS: u64 = 7;

/// Configuration for reminder generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Max tokens for a regeneration pass.
    pub max_tokens: u64,
    /// Max tokens for parsing a single quick-add note.
    pub quick_add_max_tokens: u64,
    /// LLM temperature.
    pub temperature: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            quick_add_max_tokens: 500,
            temperature: 0.2,
        }
    }
}

/// Source of reminder candidates.
#[async_trait]
pub trait ReminderGenerator: Send + Sync {
    /// Propose reminders from the user's answers, avoiding `exclude_titles`.
    async fn generate(
        &self,
        answers: &[Answer],
        exclude_titles: &[String],
        today: NaiveDate,
    ) -> Result<Vec<ReminderDraft>, ReminderError>;

    /// Turn one free-text note into a reminder draft.
    async fn parse_quick_add(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Result<ReminderDraft, ReminderError>;
}

/// [`ReminderGenerator`] backed by an [`LlmProvider`].
pub struct LlmReminderGenerator {
    llm: Arc<dyn LlmProvider>,
    config: GeneratorConfig,
}

impl LlmReminderGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: GeneratorConfig) -> Self {
        Self { llm, config }
    }
}

#[async_trait]
impl ReminderGenerator for LlmReminderGenerator {
    async fn generate(
        &self,
        answers: &[Answer],
        exclude_titles: &[String],
        today: NaiveDate,
    ) -> Result<Vec<ReminderDraft>, ReminderError> {
        info!(
            model = self.llm.model_name(),
            answers = answers.len(),
            excluded = exclude_titles.len(),
            "Generating reminders"
        );

        let prompt = prompts::generation_prompt(answers, exclude_titles, today);
        let request = CompletionRequest::new(prompt)
            .with_system(prompts::GENERATION_SYSTEM)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        let response = self.llm.complete(request).await?;

        let drafts = parse_generated(&response.content)?;
        debug!(count = drafts.len(), "Generator returned candidates");
        Ok(drafts)
    }

    async fn parse_quick_add(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Result<ReminderDraft, ReminderError> {
        let request = CompletionRequest::new(prompts::quick_add_prompt(text, today))
            .with_system(prompts::QUICK_ADD_SYSTEM)
            .with_max_tokens(self.config.quick_add_max_tokens)
            .with_temperature(self.config.temperature);
        let response = self.llm.complete(request).await?;

        parse_quick_add_response(&response.content, today)
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// One reminder as the model wrote it. Everything is optional here and
/// validated afterwards.
#[derive(Debug, Deserialize)]
struct RawReminder {
    category: Option<String>,
    title: Option<String>,
    description: Option<String>,
    due_date: Option<String>,
    recurring: Option<bool>,
    recurrence_label: Option<String>,
    recurrence_interval: Option<String>,
}

fn malformed(reason: impl Into<String>) -> ReminderError {
    ReminderError::MalformedResponse {
        reason: reason.into(),
    }
}

/// Empty strings count as absent.
fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn resolve_category(raw: Option<&str>) -> Category {
    match raw {
        Some(s) => s.parse().unwrap_or_else(|_| {
            warn!(category = s, "Unknown category from model, using personal");
            Category::Personal
        }),
        None => Category::Personal,
    }
}

fn parse_due_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

fn into_draft(raw: RawReminder, due_date: NaiveDate, title: String) -> ReminderDraft {
    ReminderDraft {
        category: resolve_category(raw.category.as_deref()),
        title,
        description: non_blank(raw.description),
        due_date,
        recurring: raw.recurring.unwrap_or(false),
        recurrence_label: non_blank(raw.recurrence_label),
        recurrence_interval: non_blank(raw.recurrence_interval),
    }
}

/// Parse a regeneration response. Any item without a title or a valid
/// due date makes the whole response malformed.
fn parse_generated(text: &str) -> Result<Vec<ReminderDraft>, ReminderError> {
    let json = extract_json(text, '[', ']');
    let raw: Vec<RawReminder> =
        serde_json::from_str(&json).map_err(|e| malformed(format!("not a reminder array: {e}")))?;

    raw.into_iter()
        .enumerate()
        .map(|(i, item)| {
            let title = non_blank(item.title.clone())
                .ok_or_else(|| malformed(format!("item {i} has no title")))?;
            let due_date = parse_due_date(item.due_date.as_deref()).ok_or_else(|| {
                malformed(format!("item {i} ('{title}') has no valid due_date"))
            })?;
            Ok(into_draft(item, due_date, title))
        })
        .collect()
}

/// Parse a quick-add response. Missing or unparseable dates fall back to a
/// week from today.
fn parse_quick_add_response(text: &str, today: NaiveDate) -> Result<ReminderDraft, ReminderError> {
    let json = extract_json(text, '{', '}');
    let raw: RawReminder =
        serde_json::from_str(&json).map_err(|e| malformed(format!("not a reminder object: {e}")))?;

    let title = non_blank(raw.title.clone()).ok_or_else(|| malformed("reminder has no title"))?;
    let due_date = parse_due_date(raw.due_date.as_deref())
        .or_else(|| today.checked_add_days(Days::new(QUICK_ADD_DEFAULT_DAYS)))
        .unwrap_or(today);
    Ok(into_draft(raw, due_date, title))
}

/// Extract the JSON value delimited by `open`/`close` from LLM output that
/// may be wrapped in markdown code fences or surrounded by prose.
fn extract_json(text: &str, open: char, close: char) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with(open) {
        return trimmed.to_string();
    }

    // Wrapped in a markdown code block, with or without a language tag
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        let inner = match after.find("```") {
            Some(end) => &after[..end],
            None => after,
        };
        let inner = inner.trim();
        if inner.starts_with(open) {
            return inner.to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
        if end > start {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}
