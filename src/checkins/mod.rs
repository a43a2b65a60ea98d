//! Check-ins: periodic re-asking of answers that have gone stale.

pub mod model;
pub mod rules;
pub mod scheduler;

pub use model::CheckIn;
pub use scheduler::CheckInScheduler;
