//! Staleness rules: which answers go stale, and after how long.

use chrono::{DateTime, Months, Utc};

use crate::reminders::model::Category;

/// A fixed freshness threshold for one answer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessRule {
    pub category: Category,
    pub key: &'static str,
    pub months: u32,
    pub prompt: &'static str,
}

/// The registry. Keys outside it are never considered stale.
pub static STALENESS_RULES: &[StalenessRule] = &[
    StalenessRule {
        category: Category::Car,
        key: "car_mileage",
        months: 6,
        prompt: "How many miles on your car now?",
    },
    StalenessRule {
        category: Category::Car,
        key: "last_oil_change",
        months: 6,
        prompt: "Have you gotten an oil change recently?",
    },
    StalenessRule {
        category: Category::Health,
        key: "last_checkup",
        months: 12,
        prompt: "Have you seen a doctor this year?",
    },
    StalenessRule {
        category: Category::Health,
        key: "last_dentist",
        months: 6,
        prompt: "Been to the dentist lately?",
    },
    StalenessRule {
        category: Category::Finance,
        key: "last_credit_check",
        months: 6,
        prompt: "Checked your credit recently?",
    },
    StalenessRule {
        category: Category::Pets,
        key: "last_vet_visit",
        months: 12,
        prompt: "Has your pet been to the vet this year?",
    },
    StalenessRule {
        category: Category::Home,
        key: "last_deep_clean",
        months: 3,
        prompt: "Time for another deep clean?",
    },
];

/// Look up the rule for a (category, key) pair.
pub fn rule_for(category: Category, key: &str) -> Option<&'static StalenessRule> {
    STALENESS_RULES
        .iter()
        .find(|r| r.category == category && r.key == key)
}

/// True iff `updated_at` is strictly older than `now - threshold_months`
/// (calendar months). An answer exactly at the threshold is still fresh.
pub fn is_stale(updated_at: DateTime<Utc>, threshold_months: u32, now: DateTime<Utc>) -> bool {
    match now.checked_sub_months(Months::new(threshold_months)) {
        Some(cutoff) => updated_at < cutoff,
        None => false,
    }
}
