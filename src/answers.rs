//! Onboarding answers: the free-text facts reminders are generated from.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AnswerError;
use crate::reminders::model::Category;
use crate::store::Database;

/// A recorded answer, unique per (user, category, key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub user_id: String,
    pub category: Category,
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One `{category, key, value}` triple as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerInput {
    pub category: Category,
    pub key: String,
    pub value: String,
}

impl AnswerInput {
    pub fn new(category: Category, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            category,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Settings keys used for per-user flags.
pub mod settings_keys {
    /// Set once the user has submitted onboarding answers.
    pub const ONBOARDING_COMPLETE: &str = "onboarding_complete";
    /// RFC 3339 time of the last regeneration pass.
    pub const LAST_REGENERATED_AT: &str = "last_regenerated_at";
}

/// Reads and writes the answer store.
pub struct AnswerService {
    db: Arc<dyn Database>,
}

impl AnswerService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// All answers for a user, oldest first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Answer>, AnswerError> {
        Ok(self.db.list_answers(user_id).await?)
    }

    /// Upsert every answer, then flag onboarding as complete.
    ///
    /// The two steps are independent: if the flag write fails the answers
    /// are still saved, and "has answers" remains the source of truth.
    pub async fn save(
        &self,
        user_id: &str,
        answers: &[AnswerInput],
        now: DateTime<Utc>,
    ) -> Result<usize, AnswerError> {
        for answer in answers {
            if answer.key.trim().is_empty() {
                return Err(AnswerError::InvalidInput("answer key must not be empty".into()));
            }
        }

        for answer in answers {
            self.db
                .upsert_answer(user_id, answer.category, &answer.key, &answer.value, now)
                .await?;
        }

        self.db
            .set_setting(
                user_id,
                settings_keys::ONBOARDING_COMPLETE,
                &serde_json::Value::Bool(true),
            )
            .await?;

        info!(user_id, count = answers.len(), "Answers saved");
        Ok(answers.len())
    }

    /// Whether the user has finished onboarding.
    pub async fn onboarding_complete(&self, user_id: &str) -> Result<bool, AnswerError> {
        let flag = self
            .db
            .get_setting(user_id, settings_keys::ONBOARDING_COMPLETE)
            .await?;
        Ok(flag.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    /// Wipe the user's reminders, answers and check-ins and clear onboarding.
    pub async fn reset(&self, user_id: &str) -> Result<(), AnswerError> {
        self.db.reset_user(user_id).await?;
        self.db
            .delete_setting(user_id, settings_keys::ONBOARDING_COMPLETE)
            .await?;
        self.db
            .delete_setting(user_id, settings_keys::LAST_REGENERATED_AT)
            .await?;
        info!(user_id, "Account reset");
        Ok(())
    }
}
