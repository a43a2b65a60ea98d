//! Check-in data model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reminders::model::Category;

/// An open question re-asking about one stale answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: Uuid,
    pub user_id: String,
    pub category: Category,
    pub key: String,
    pub prompt: String,
    /// Day the check-in was created.
    pub due_date: NaiveDate,
    pub dismissed: bool,
    pub answered: bool,
    pub created_at: DateTime<Utc>,
}

impl CheckIn {
    pub fn new(
        user_id: impl Into<String>,
        category: Category,
        key: impl Into<String>,
        prompt: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            category,
            key: key.into(),
            prompt: prompt.into(),
            due_date: now.date_naive(),
            dismissed: false,
            answered: false,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checkin_is_open_and_due_today() {
        let now = Utc::now();
        let c = CheckIn::new("u1", Category::Car, "car_mileage", "How many miles?", now);
        assert!(!c.answered);
        assert!(!c.dismissed);
        assert_eq!(c.due_date, now.date_naive());
        assert_eq!(c.created_at, now);
    }
}
