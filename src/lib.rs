//! Nudge: life-maintenance reminders generated from onboarding answers.

pub mod answers;
pub mod api;
pub mod auth;
pub mod checkins;
pub mod config;
pub mod error;
pub mod llm;
pub mod reminders;
pub mod store;
