//! Regeneration: replace the user's open AI reminders with a fresh batch
//! without ever touching manual, recurrence-spawned or completed ones.
//!
//! Everything is staged in memory first. Storage is only written once the
//! generator output has parsed and been filtered, and the delete+insert is a
//! single transaction, so a failure at any step leaves the user's reminders
//! exactly as they were.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::answers::settings_keys;
use crate::error::ReminderError;
use crate::store::Database;

use super::dedup::DuplicateMatcher;
use super::generator::ReminderGenerator;
use super::model::{Reminder, ReminderSource};

/// Counts from one regeneration pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegenerationReport {
    /// Open AI reminders removed.
    pub deleted: usize,
    /// Candidates returned by the generator.
    pub generated: usize,
    /// Candidates dropped as duplicates of surviving reminders.
    pub suppressed: usize,
    /// Reminders inserted.
    pub created: usize,
    pub regenerated_at: DateTime<Utc>,
}

pub struct ReconciliationEngine {
    db: Arc<dyn Database>,
    generator: Arc<dyn ReminderGenerator>,
    matcher: Arc<dyn DuplicateMatcher>,
}

impl ReconciliationEngine {
    pub fn new(
        db: Arc<dyn Database>,
        generator: Arc<dyn ReminderGenerator>,
        matcher: Arc<dyn DuplicateMatcher>,
    ) -> Self {
        Self {
            db,
            generator,
            matcher,
        }
    }

    /// Run one regeneration pass for `user_id`.
    pub async fn regenerate(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RegenerationReport, ReminderError> {
        let answers = self.db.list_answers(user_id).await?;
        if answers.is_empty() {
            return Err(ReminderError::NoAnswers);
        }

        let existing = self.db.list_reminders(user_id).await?;
        let surviving_titles: Vec<String> = existing
            .iter()
            .filter(|r| !r.is_regenerable() && !r.completed)
            .map(|r| r.title.clone())
            .collect();

        let today = now.date_naive();
        let drafts = self
            .generator
            .generate(&answers, &surviving_titles, today)
            .await?;
        let generated = drafts.len();

        let mut accepted: Vec<Reminder> = Vec::with_capacity(generated);
        let mut suppressed = 0;
        for draft in drafts {
            if self.matcher.is_duplicate(&draft.title, &surviving_titles) {
                debug!(title = %draft.title, matcher = self.matcher.name(), "Suppressed duplicate");
                suppressed += 1;
                continue;
            }
            let mut reminder = draft.into_reminder(user_id, ReminderSource::Ai);
            reminder.created_at = now;
            accepted.push(reminder);
        }

        let deleted = self.db.replace_ai_reminders(user_id, &accepted).await?;

        let stamp = serde_json::Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true));
        if let Err(e) = self
            .db
            .set_setting(user_id, settings_keys::LAST_REGENERATED_AT, &stamp)
            .await
        {
            warn!(user_id, error = %e, "Failed to record regeneration time");
        }

        let report = RegenerationReport {
            deleted,
            generated,
            suppressed,
            created: accepted.len(),
            regenerated_at: now,
        };
        info!(
            user_id,
            deleted = report.deleted,
            generated = report.generated,
            suppressed = report.suppressed,
            created = report.created,
            "Reminders regenerated"
        );
        Ok(report)
    }
}
