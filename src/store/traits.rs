//! Unified `Database` trait: single async interface for all persistence.
//!
//! Every method is scoped by `user_id`; nothing reads or writes across users.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::answers::Answer;
use crate::checkins::model::CheckIn;
use crate::error::DatabaseError;
use crate::reminders::model::{Category, CompletionOutcome, Reminder};

/// Backend-agnostic database trait covering answers, reminders, check-ins
/// and per-user settings.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Answers ─────────────────────────────────────────────────────

    /// Insert or update the answer for (user, category, key), setting
    /// `updated_at = now`.
    async fn upsert_answer(
        &self,
        user_id: &str,
        category: Category,
        key: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// All answers for a user, oldest first.
    async fn list_answers(&self, user_id: &str) -> Result<Vec<Answer>, DatabaseError>;

    // ── Reminders ───────────────────────────────────────────────────

    /// Insert a new reminder.
    async fn create_reminder(&self, reminder: &Reminder) -> Result<(), DatabaseError>;

    /// Get a reminder owned by `user_id`.
    async fn get_reminder(&self, user_id: &str, id: Uuid)
    -> Result<Option<Reminder>, DatabaseError>;

    /// All reminders for a user, by due date.
    async fn list_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, DatabaseError>;

    /// Transition an open reminder to completed and, only when this call
    /// made the transition, insert the reminder `successor` derives from the
    /// completed row. Both writes commit together or not at all.
    ///
    /// Returns `None` when the reminder does not exist for this user.
    async fn complete_reminder(
        &self,
        user_id: &str,
        id: Uuid,
        at: DateTime<Utc>,
        successor: &(dyn for<'r> Fn(&'r Reminder) -> Option<Reminder> + Send + Sync),
    ) -> Result<Option<CompletionOutcome>, DatabaseError>;

    /// Set `snoozed_until`. Returns `false` if no such reminder.
    async fn snooze_reminder(
        &self,
        user_id: &str,
        id: Uuid,
        until: NaiveDate,
    ) -> Result<bool, DatabaseError>;

    /// Delete one reminder. Returns `false` if no such reminder.
    async fn delete_reminder(&self, user_id: &str, id: Uuid) -> Result<bool, DatabaseError>;

    /// Atomically delete the user's open AI reminders and insert
    /// `replacements`. Returns the number deleted.
    async fn replace_ai_reminders(
        &self,
        user_id: &str,
        replacements: &[Reminder],
    ) -> Result<usize, DatabaseError>;

    // ── Check-ins ───────────────────────────────────────────────────

    /// Insert a check-in. Returns `false` (and inserts nothing) when an open
    /// check-in for the same key already exists.
    async fn create_checkin(&self, checkin: &CheckIn) -> Result<bool, DatabaseError>;

    /// Get a check-in owned by `user_id`.
    async fn get_checkin(&self, user_id: &str, id: Uuid)
    -> Result<Option<CheckIn>, DatabaseError>;

    /// Open check-ins, oldest first.
    async fn list_open_checkins(&self, user_id: &str) -> Result<Vec<CheckIn>, DatabaseError>;

    /// Write `value` into the answer the check-in asks about and mark the
    /// check-in answered, in one transaction. Returns `false` when the
    /// check-in is missing or no longer open.
    async fn answer_checkin(
        &self,
        user_id: &str,
        id: Uuid,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// Mark an open check-in dismissed. Returns `false` when missing or closed.
    async fn dismiss_checkin(&self, user_id: &str, id: Uuid) -> Result<bool, DatabaseError>;

    // ── Settings ────────────────────────────────────────────────────

    /// Get a per-user setting.
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Upsert a per-user setting.
    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a per-user setting. Returns `false` if it did not exist.
    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError>;

    // ── Account ─────────────────────────────────────────────────────

    /// Delete every reminder, answer and check-in for the user.
    async fn reset_user(&self, user_id: &str) -> Result<(), DatabaseError>;
}
