//! User-facing reminder operations.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::ReminderError;
use crate::store::Database;

use super::generator::ReminderGenerator;
use super::lifecycle;
use super::model::{CompletionOutcome, Dashboard, Reminder, ReminderSource};

/// Default snooze length in days.
pub const DEFAULT_SNOOZE_DAYS: u64 = 7;

pub struct ReminderService {
    db: Arc<dyn Database>,
    generator: Arc<dyn ReminderGenerator>,
}

impl ReminderService {
    pub fn new(db: Arc<dyn Database>, generator: Arc<dyn ReminderGenerator>) -> Self {
        Self { db, generator }
    }

    /// All reminders, by due date.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Reminder>, ReminderError> {
        Ok(self.db.list_reminders(user_id).await?)
    }

    pub async fn dashboard(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Dashboard, ReminderError> {
        let reminders = self.db.list_reminders(user_id).await?;
        Ok(Dashboard::partition(reminders, today))
    }

    /// Parse free text into a manual reminder and store it.
    pub async fn quick_add(
        &self,
        user_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Reminder, ReminderError> {
        if text.trim().is_empty() {
            return Err(ReminderError::InvalidInput("text must not be empty".into()));
        }

        let draft = self.generator.parse_quick_add(text, now.date_naive()).await?;
        let mut reminder = draft.into_reminder(user_id, ReminderSource::Manual);
        reminder.created_at = now;
        self.db.create_reminder(&reminder).await?;

        info!(user_id, id = %reminder.id, title = %reminder.title, "Quick-added reminder");
        Ok(reminder)
    }

    /// Hide a reminder until `until`, a week from today by default.
    pub async fn snooze(
        &self,
        user_id: &str,
        id: Uuid,
        until: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Reminder, ReminderError> {
        let until = match until {
            Some(date) => date,
            None => today
                .checked_add_days(Days::new(DEFAULT_SNOOZE_DAYS))
                .ok_or_else(|| ReminderError::InvalidInput("snooze date out of range".into()))?,
        };

        if !self.db.snooze_reminder(user_id, id, until).await? {
            return Err(ReminderError::NotFound { id });
        }
        self.db
            .get_reminder(user_id, id)
            .await?
            .ok_or(ReminderError::NotFound { id })
    }

    pub async fn delete(&self, user_id: &str, id: Uuid) -> Result<(), ReminderError> {
        if !self.db.delete_reminder(user_id, id).await? {
            return Err(ReminderError::NotFound { id });
        }
        info!(user_id, %id, "Reminder deleted");
        Ok(())
    }

    pub async fn complete(
        &self,
        user_id: &str,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, ReminderError> {
        lifecycle::complete_reminder(self.db.as_ref(), user_id, id, now).await
    }
}
