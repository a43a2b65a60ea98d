//! Reminder data model: categories, provenance, reminder items and drafts.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::interval::{RecurrenceInterval, parse_recurrence_label};

/// Life area a reminder (or answer) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Health,
    Car,
    Home,
    Finance,
    Personal,
    Pets,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Health,
        Self::Car,
        Self::Home,
        Self::Finance,
        Self::Personal,
        Self::Pets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Car => "car",
            Self::Home => "home",
            Self::Finance => "finance",
            Self::Personal => "personal",
            Self::Pets => "pets",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Where a reminder came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderSource {
    /// Entered by the user (including quick-add).
    Manual,
    /// Produced by a regeneration pass.
    Ai,
    /// Spawned by completing a recurring reminder.
    Recurrence,
}

impl ReminderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Ai => "ai",
            Self::Recurrence => "recurrence",
        }
    }
}

impl FromStr for ReminderSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "ai" => Ok(Self::Ai),
            "recurrence" => Ok(Self::Recurrence),
            other => Err(format!("unknown reminder source: {other}")),
        }
    }
}

/// A single actionable, datable task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: String,
    pub category: Category,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Calendar date, serialized as `YYYY-MM-DD`.
    pub due_date: NaiveDate,
    pub recurring: bool,
    #[serde(default)]
    pub recurrence_label: Option<String>,
    /// Interval key (see [`RecurrenceInterval`]). Stored as text so unknown
    /// keys round-trip; they simply never recur.
    #[serde(default)]
    pub recurrence_interval: Option<String>,
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snoozed_until: Option<NaiveDate>,
    pub source: ReminderSource,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Create an open, non-recurring reminder.
    pub fn new(
        user_id: impl Into<String>,
        category: Category,
        title: impl Into<String>,
        due_date: NaiveDate,
        source: ReminderSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            category,
            title: title.into(),
            description: None,
            due_date,
            recurring: false,
            recurrence_label: None,
            recurrence_interval: None,
            completed: false,
            completed_at: None,
            snoozed_until: None,
            source,
            parent_id: None,
            created_at: Utc::now(),
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Builder: mark recurring with the given label and interval.
    pub fn with_recurrence(
        mut self,
        label: Option<String>,
        interval: Option<RecurrenceInterval>,
    ) -> Self {
        self.recurring = true;
        self.recurrence_label = label;
        self.recurrence_interval = interval.map(|i| i.key().to_string());
        self
    }

    /// Builder: link to the reminder whose completion spawned this one.
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// The interval this reminder recurs on, if it can recur at all.
    pub fn recurrence(&self) -> Option<RecurrenceInterval> {
        if !self.recurring {
            return None;
        }
        self.recurrence_interval
            .as_deref()
            .and_then(RecurrenceInterval::from_key)
    }

    /// Hidden from the active view while `today < snoozed_until`.
    pub fn is_snoozed(&self, today: NaiveDate) -> bool {
        self.snoozed_until.is_some_and(|until| today < until)
    }

    /// Open and not snoozed.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        !self.completed && !self.is_snoozed(today)
    }

    /// Active and due before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active(today) && self.due_date < today
    }

    /// Removed by a regeneration pass.
    pub fn is_regenerable(&self) -> bool {
        self.source == ReminderSource::Ai && !self.completed
    }
}

/// A validated reminder proposal from the generator, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderDraft {
    pub category: Category,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub recurring: bool,
    pub recurrence_label: Option<String>,
    /// Machine interval exactly as proposed; may be absent or unknown.
    pub recurrence_interval: Option<String>,
}

impl ReminderDraft {
    /// Explicit interval when it is a known key, else whatever the label
    /// parser derives, else nothing.
    pub fn resolved_interval(&self) -> Option<RecurrenceInterval> {
        self.recurrence_interval
            .as_deref()
            .and_then(RecurrenceInterval::from_key)
            .or_else(|| {
                self.recurrence_label
                    .as_deref()
                    .and_then(parse_recurrence_label)
            })
    }

    /// Turn the draft into a reminder owned by `user_id`.
    pub fn into_reminder(self, user_id: &str, source: ReminderSource) -> Reminder {
        let interval = self.resolved_interval();
        let mut reminder = Reminder::new(user_id, self.category, self.title, self.due_date, source);
        reminder.description = self.description;
        reminder.recurring = self.recurring;
        reminder.recurrence_label = self.recurrence_label;
        reminder.recurrence_interval = interval.map(|i| i.key().to_string());
        reminder
    }
}

/// Result of a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    /// The reminder as stored after the request.
    pub reminder: Reminder,
    /// `false` when the reminder was already completed.
    pub transitioned: bool,
    /// Next occurrence created by this completion, if any.
    pub successor: Option<Reminder>,
}

/// Reminders partitioned the way the dashboard shows them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub upcoming: Vec<Reminder>,
    pub snoozed: Vec<Reminder>,
    pub completed: Vec<Reminder>,
    /// How many of `upcoming` are past due.
    pub overdue: usize,
}

impl Dashboard {
    pub fn partition(reminders: Vec<Reminder>, today: NaiveDate) -> Self {
        let mut dashboard = Self::default();
        for reminder in reminders {
            if reminder.completed {
                dashboard.completed.push(reminder);
            } else if !reminder.is_active(today) {
                dashboard.snoozed.push(reminder);
            } else {
                if reminder.is_overdue(today) {
                    dashboard.overdue += 1;
                }
                dashboard.upcoming.push(reminder);
            }
        }
        dashboard
    }
}
