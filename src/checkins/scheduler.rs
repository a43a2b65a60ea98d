//! Check-in scheduler: opens a check-in for every stale registered answer
//! and closes check-ins when they are answered or dismissed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CheckInError;
use crate::store::Database;

use super::model::CheckIn;
use super::rules::{is_stale, rule_for};

pub struct CheckInScheduler {
    db: Arc<dyn Database>,
}

impl CheckInScheduler {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Create check-ins for stale answers, then return every open check-in,
    /// oldest first. At most one check-in per key is ever open.
    pub async fn refresh(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CheckIn>, CheckInError> {
        let answers = self.db.list_answers(user_id).await?;
        let open = self.db.list_open_checkins(user_id).await?;

        let mut created = 0;
        for answer in &answers {
            let Some(rule) = rule_for(answer.category, &answer.key) else {
                continue;
            };
            if open.iter().any(|c| c.key == rule.key) {
                continue;
            }
            if !is_stale(answer.updated_at, rule.months, now) {
                continue;
            }

            let checkin = CheckIn::new(user_id, rule.category, rule.key, rule.prompt, now);
            // A concurrent refresh may have won the race; the store ignores
            // the second insert.
            if self.db.create_checkin(&checkin).await? {
                created += 1;
                debug!(user_id, key = rule.key, "Check-in opened");
            }
        }

        if created > 0 {
            info!(user_id, created, "Check-ins created");
        }
        Ok(self.db.list_open_checkins(user_id).await?)
    }

    /// Record a fresh answer and close the check-in.
    pub async fn answer(
        &self,
        user_id: &str,
        id: Uuid,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CheckInError> {
        if value.trim().is_empty() {
            return Err(CheckInError::InvalidInput("value must not be empty".into()));
        }
        if !self.db.answer_checkin(user_id, id, value, now).await? {
            return Err(CheckInError::NotFound { id });
        }
        info!(user_id, %id, "Check-in answered");
        Ok(())
    }

    /// Close the check-in without touching the answer.
    pub async fn dismiss(&self, user_id: &str, id: Uuid) -> Result<(), CheckInError> {
        if !self.db.dismiss_checkin(user_id, id).await? {
            return Err(CheckInError::NotFound { id });
        }
        info!(user_id, %id, "Check-in dismissed");
        Ok(())
    }
}
