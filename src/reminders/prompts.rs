//! Prompt templates for reminder generation and quick-add parsing.

use chrono::NaiveDate;

use crate::answers::Answer;

use super::interval::RecurrenceInterval;
use super::model::Category;

pub const GENERATION_SYSTEM: &str =
    "You are a life maintenance assistant. You turn what a person has told you about \
     their life into concrete, dated reminders. You only ever answer with JSON.";

pub const QUICK_ADD_SYSTEM: &str =
    "You parse short free-text notes into a single structured reminder. \
     You only ever answer with JSON.";

fn category_list() -> String {
    Category::ALL
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn interval_list() -> String {
    RecurrenceInterval::ALL
        .iter()
        .map(RecurrenceInterval::key)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `[category] key: value`, one per line.
fn answers_block(answers: &[Answer]) -> String {
    answers
        .iter()
        .map(|a| format!("[{}] {}: {}", a.category, a.key, a.value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for a full regeneration pass.
pub fn generation_prompt(
    answers: &[Answer],
    exclude_titles: &[String],
    today: NaiveDate,
) -> String {
    let today = today.format("%Y-%m-%d");
    let exclusions = if exclude_titles.is_empty() {
        "(none)".to_string()
    } else {
        exclude_titles
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Based on this person's answers, generate a list of reminders for things they need to do or schedule.\n\n\
         Today's date: {today}\n\n\
         User's answers:\n{answers}\n\n\
         The user already has these reminders. Do NOT suggest anything that duplicates them:\n{exclusions}\n\n\
         Rules:\n\
         - Generate practical, actionable reminders with specific due dates\n\
         - If someone said \"don't remember\" for when they last did something, assume it's overdue and set the date within the next 2 weeks\n\
         - For recurring things (oil changes, checkups), set the next one and mark it as recurring\n\
         - Be specific: \"Schedule annual physical\" not \"Think about health\"\n\
         - Set realistic due dates based on urgency\n\
         - Keep descriptions to one helpful sentence\n\
         - Cover everything their answers suggest they need\n\n\
         Return ONLY a JSON array. Each object must have:\n\
         - \"category\": one of {categories}\n\
         - \"title\": short actionable title\n\
         - \"description\": one sentence of context\n\
         - \"due_date\": YYYY-MM-DD\n\
         - \"recurring\": boolean\n\
         - \"recurrence_label\": if recurring, how often in words (e.g. \"Every 6 months\", \"Yearly\")\n\
         - \"recurrence_interval\": if recurring, one of {intervals}\n\n\
         Return ONLY the JSON array, no markdown, no explanation.",
        answers = answers_block(answers),
        categories = category_list(),
        intervals = interval_list(),
    )
}

/// Prompt for parsing one free-text reminder.
pub fn quick_add_prompt(text: &str, today: NaiveDate) -> String {
    let today = today.format("%Y-%m-%d");
    format!(
        "Parse this reminder into structured JSON. Today is {today}.\n\n\
         \"{text}\"\n\n\
         Return ONLY a JSON object with:\n\
         - \"category\": one of {categories} (best guess)\n\
         - \"title\": short actionable title\n\
         - \"description\": one helpful sentence (or null)\n\
         - \"due_date\": YYYY-MM-DD (default: 7 days from today if no date is mentioned)\n\
         - \"recurring\": boolean\n\
         - \"recurrence_label\": if recurring, human-readable (e.g. \"Every 6 months\")\n\
         - \"recurrence_interval\": if recurring, one of {intervals}\n\n\
         Return ONLY the JSON object, no markdown.",
        text = text.trim(),
        categories = category_list(),
        intervals = interval_list(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn answer(category: Category, key: &str, value: &str) -> Answer {
        let now = Utc::now();
        Answer {
            user_id: "u1".into(),
            category,
            key: key.into(),
            value: value.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn generation_prompt_embeds_inputs() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let prompt = generation_prompt(
            &[answer(Category::Car, "car_mileage", "42000")],
            &["Renew passport".to_string()],
            today,
        );
        assert!(prompt.contains("Today's date: 2024-06-10"));
        assert!(prompt.contains("[car] car_mileage: 42000"));
        assert!(prompt.contains("- Renew passport"));
        assert!(prompt.contains("6_months"));
        assert!(prompt.contains("pets"));
    }

    #[test]
    fn generation_prompt_without_exclusions() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let prompt = generation_prompt(&[], &[], today);
        assert!(prompt.contains("(none)"));
    }

    #[test]
    fn quick_add_prompt_trims_text() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let prompt = quick_add_prompt("  dentist next tuesday  ", today);
        assert!(prompt.contains("\"dentist next tuesday\""));
        assert!(prompt.contains("Today is 2024-06-10"));
    }
}
