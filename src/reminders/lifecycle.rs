//! Reminder completion and recurrence successors.
//!
//! Completion is `Open -> Completed`, once. The store's guarded update tells
//! us whether this call made the transition; only then is the successor built,
//! from the reminder as re-read inside the same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ReminderError;
use crate::store::Database;

use super::model::{CompletionOutcome, Reminder, ReminderSource};

/// Build the next occurrence of `parent`, or `None` if it does not recur.
///
/// The successor copies category, title, description and recurrence fields,
/// starts open, links back via `parent_id`, and is due one interval after
/// `max(parent.due_date, today)`.
pub fn build_successor(parent: &Reminder, today: NaiveDate) -> Option<Reminder> {
    let interval = parent.recurrence()?;
    let due_date = interval.next_after(parent.due_date, today)?;

    let mut next = Reminder::new(
        parent.user_id.clone(),
        parent.category,
        parent.title.clone(),
        due_date,
        ReminderSource::Recurrence,
    )
    .with_recurrence(parent.recurrence_label.clone(), Some(interval))
    .with_parent(parent.id);
    next.description = parent.description.clone();
    Some(next)
}

/// Complete a reminder and, on the transition edge, create its successor.
pub async fn complete_reminder(
    db: &dyn Database,
    user_id: &str,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<CompletionOutcome, ReminderError> {
    let today = now.date_naive();
    let outcome = db
        .complete_reminder(user_id, id, now, &|parent| build_successor(parent, today))
        .await?
        .ok_or(ReminderError::NotFound { id })?;

    match (outcome.transitioned, &outcome.successor) {
        (false, _) => debug!(user_id, %id, "Reminder already completed"),
        (true, Some(next)) => info!(
            user_id,
            parent = %id,
            successor = %next.id,
            due_date = %next.due_date,
            "Recurring reminder rescheduled"
        ),
        (true, None) => info!(user_id, %id, "Reminder completed"),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::reminders::interval::RecurrenceInterval;
    use crate::reminders::model::Category;
    use crate::store::LibSqlBackend;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn recurring(due: NaiveDate, interval: RecurrenceInterval) -> Reminder {
        Reminder::new("u1", Category::Car, "Oil change", due, ReminderSource::Ai)
            .with_description("Synthetic blend")
            .with_recurrence(Some("Every few months".into()), Some(interval))
    }

    #[test]
    fn successor_copies_fields_and_links_parent() {
        let parent = recurring(day(2024, 6, 1), RecurrenceInterval::ThreeMonths);
        let next = build_successor(&parent, day(2024, 5, 20)).unwrap();

        assert_eq!(next.due_date, day(2024, 9, 1));
        assert_eq!(next.parent_id, Some(parent.id));
        assert_eq!(next.source, ReminderSource::Recurrence);
        assert_eq!(next.title, parent.title);
        assert_eq!(next.description, parent.description);
        assert_eq!(next.recurrence_label, parent.recurrence_label);
        assert_eq!(next.recurrence(), Some(RecurrenceInterval::ThreeMonths));
        assert!(!next.completed);
        assert!(next.snoozed_until.is_none());
    }

    #[test]
    fn overdue_successor_anchors_on_today() {
        let parent = recurring(day(2020, 1, 1), RecurrenceInterval::OneMonth);
        let next = build_successor(&parent, day(2024, 6, 10)).unwrap();
        assert_eq!(next.due_date, day(2024, 7, 10));
    }

    #[test]
    fn no_successor_without_known_interval() {
        let mut parent = recurring(day(2024, 6, 1), RecurrenceInterval::OneYear);
        parent.recurrence_interval = Some("every_blue_moon".into());
        assert!(build_successor(&parent, day(2024, 6, 1)).is_none());

        let plain = Reminder::new(
            "u1",
            Category::Home,
            "Fix tap",
            day(2024, 6, 1),
            ReminderSource::Manual,
        );
        assert!(build_successor(&plain, day(2024, 6, 1)).is_none());
    }

    #[tokio::test]
    async fn completing_twice_creates_one_successor() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        let parent = recurring(day(2024, 6, 1), RecurrenceInterval::SixMonths);
        db.create_reminder(&parent).await.unwrap();

        let first = complete_reminder(&db, "u1", parent.id, noon(2024, 6, 2))
            .await
            .unwrap();
        assert!(first.transitioned);
        assert!(first.reminder.completed);
        let successor = first.successor.unwrap();
        assert_eq!(successor.due_date, day(2024, 12, 2));

        let second = complete_reminder(&db, "u1", parent.id, noon(2024, 6, 3))
            .await
            .unwrap();
        assert!(!second.transitioned);
        assert!(second.successor.is_none());
        assert_eq!(second.reminder.completed_at, Some(noon(2024, 6, 2)));

        let all = db.list_reminders("u1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(
            all.iter().filter(|r| r.parent_id == Some(parent.id)).count(),
            1
        );
    }

    #[tokio::test]
    async fn completing_non_recurring_creates_nothing() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        let r = Reminder::new(
            "u1",
            Category::Finance,
            "File taxes",
            day(2024, 4, 15),
            ReminderSource::Manual,
        );
        db.create_reminder(&r).await.unwrap();

        let outcome = complete_reminder(&db, "u1", r.id, noon(2024, 4, 1)).await.unwrap();
        assert!(outcome.transitioned);
        assert!(outcome.successor.is_none());
        assert_eq!(db.list_reminders("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completing_missing_or_foreign_reminder_is_not_found() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        let r = recurring(day(2024, 6, 1), RecurrenceInterval::OneWeek);
        db.create_reminder(&r).await.unwrap();

        let err = complete_reminder(&db, "u2", r.id, noon(2024, 6, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderError::NotFound { id } if id == r.id));

        let stored = db.get_reminder("u1", r.id).await.unwrap().unwrap();
        assert!(!stored.completed);
    }

    #[tokio::test]
    async fn failed_successor_insert_leaves_parent_open_for_retry() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        let parent = recurring(day(2024, 6, 1), RecurrenceInterval::OneMonth);
        let other = recurring(day(2024, 8, 1), RecurrenceInterval::OneYear);
        db.create_reminder(&parent).await.unwrap();
        db.create_reminder(&other).await.unwrap();

        // A successor whose id is already taken cannot be inserted.
        let clash = |p: &Reminder| {
            build_successor(p, day(2024, 6, 2)).map(|next| Reminder { id: other.id, ..next })
        };
        assert!(
            db.complete_reminder("u1", parent.id, noon(2024, 6, 2), &clash)
                .await
                .is_err()
        );

        let stored = db.get_reminder("u1", parent.id).await.unwrap().unwrap();
        assert!(!stored.completed);
        assert!(stored.completed_at.is_none());

        let retry = complete_reminder(&db, "u1", parent.id, noon(2024, 6, 3))
            .await
            .unwrap();
        assert!(retry.transitioned);
        let successor = retry.successor.unwrap();
        assert_eq!(successor.parent_id, Some(parent.id));
        assert_eq!(successor.due_date, day(2024, 7, 3));
        assert_eq!(db.list_reminders("u1").await.unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_completions_spawn_one_successor() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let parent = recurring(day(2024, 6, 1), RecurrenceInterval::OneWeek);
        db.create_reminder(&parent).await.unwrap();
        let id = parent.id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    complete_reminder(db.as_ref(), "u1", id, noon(2024, 6, 1)).await
                })
            })
            .collect();

        let mut transitions = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().transitioned {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 1);
        assert_eq!(db.list_reminders("u1").await.unwrap().len(), 2);
    }
}
