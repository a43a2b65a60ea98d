//! Reminders: model, recurrence, duplicate suppression, generation,
//! regeneration and completion.

pub mod dedup;
pub mod generator;
pub mod interval;
pub mod lifecycle;
pub mod model;
pub mod prompts;
pub mod reconcile;
pub mod service;

pub use generator::{GeneratorConfig, LlmReminderGenerator, ReminderGenerator};
pub use model::{
    Category, CompletionOutcome, Dashboard, Reminder, ReminderDraft, ReminderSource,
};
pub use reconcile::{ReconciliationEngine, RegenerationReport};
pub use service::ReminderService;
