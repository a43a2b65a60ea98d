//! Recurrence interval codec.
//!
//! A closed vocabulary of interval keys (`"3_months"`, `"2_weeks"`, ...), each
//! mapping to exactly one unit: a day delta or a calendar-month delta.
//!
//! Month arithmetic uses chrono's `checked_add_months`, which clamps to the
//! last valid day of the target month: Jan 31 + 1 month is Feb 28 (or 29).

use std::sync::LazyLock;

use chrono::{Days, Months, NaiveDate};
use regex::Regex;

/// The shift an interval key stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalDelta {
    Days(u64),
    Months(u32),
}

/// A recognised recurrence interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecurrenceInterval {
    OneWeek,
    TwoWeeks,
    OneMonth,
    TwoMonths,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    ThirtyDays,
    NinetyDays,
}

impl RecurrenceInterval {
    pub const ALL: [RecurrenceInterval; 10] = [
        Self::OneWeek,
        Self::TwoWeeks,
        Self::OneMonth,
        Self::TwoMonths,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::ThirtyDays,
        Self::NinetyDays,
    ];

    /// Machine-readable key, as stored and exchanged with the generator.
    pub fn key(&self) -> &'static str {
        match self {
            Self::OneWeek => "1_week",
            Self::TwoWeeks => "2_weeks",
            Self::OneMonth => "1_month",
            Self::TwoMonths => "2_months",
            Self::ThreeMonths => "3_months",
            Self::SixMonths => "6_months",
            Self::OneYear => "1_year",
            Self::TwoYears => "2_years",
            Self::ThirtyDays => "30_days",
            Self::NinetyDays => "90_days",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.key() == key)
    }

    pub fn delta(&self) -> IntervalDelta {
        match self {
            Self::OneWeek => IntervalDelta::Days(7),
            Self::TwoWeeks => IntervalDelta::Days(14),
            Self::ThirtyDays => IntervalDelta::Days(30),
            Self::NinetyDays => IntervalDelta::Days(90),
            Self::OneMonth => IntervalDelta::Months(1),
            Self::TwoMonths => IntervalDelta::Months(2),
            Self::ThreeMonths => IntervalDelta::Months(3),
            Self::SixMonths => IntervalDelta::Months(6),
            Self::OneYear => IntervalDelta::Months(12),
            Self::TwoYears => IntervalDelta::Months(24),
        }
    }

    /// Shift `date` forward by one interval. `None` only on calendar overflow.
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self.delta() {
            IntervalDelta::Days(n) => date.checked_add_days(Days::new(n)),
            IntervalDelta::Months(n) => date.checked_add_months(Months::new(n)),
        }
    }

    /// Next occurrence anchored at `max(current_due, today)`, so an overdue
    /// reminder recurs relative to today rather than its missed date.
    pub fn next_after(&self, current_due: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
        self.advance(current_due.max(today))
    }
}

impl std::fmt::Display for RecurrenceInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Next due date for `interval_key`. Unknown keys return `current_due`
/// unchanged; callers treat that as "recurrence unavailable".
pub fn next_due_date(current_due: NaiveDate, interval_key: &str, today: NaiveDate) -> NaiveDate {
    RecurrenceInterval::from_key(interval_key)
        .and_then(|interval| interval.next_after(current_due, today))
        .unwrap_or(current_due)
}

/// Ordered label rules. First match wins, so more specific phrasings sit
/// ahead of the words they contain ("semi-annual" before "annual").
static LABEL_RULES: LazyLock<Vec<(Regex, RecurrenceInterval)>> = LazyLock::new(|| {
    use RecurrenceInterval::*;
    [
        (r"(?i)every\s+week", OneWeek),
        (r"(?i)every\s+2\s+weeks", TwoWeeks),
        (r"(?i)every\s+month", OneMonth),
        (r"(?i)every\s+2\s+months", TwoMonths),
        (r"(?i)every\s+3\s+months", ThreeMonths),
        (r"(?i)quarterly", ThreeMonths),
        (r"(?i)every\s+6\s+months", SixMonths),
        (r"(?i)semi[- ]?annual", SixMonths),
        (r"(?i)every\s+year", OneYear),
        (r"(?i)yearly", OneYear),
        (r"(?i)annual", OneYear),
        (r"(?i)every\s+2\s+years", TwoYears),
        (r"(?i)every\s+30\s+days", ThirtyDays),
        (r"(?i)every\s+90\s+days", NinetyDays),
        (r"(?i)bi-?weekly", TwoWeeks),
        (r"(?i)weekly", OneWeek),
        (r"(?i)monthly", OneMonth),
    ]
    .into_iter()
    .map(|(pattern, interval)| {
        (
            Regex::new(pattern).expect("recurrence label patterns are valid"),
            interval,
        )
    })
    .collect()
});

/// Best-effort mapping from a human label ("Every 6 months", "quarterly") to
/// an interval. Returns `None` when no rule matches.
pub fn parse_recurrence_label(label: &str) -> Option<RecurrenceInterval> {
    LABEL_RULES
        .iter()
        .find(|(regex, _)| regex.is_match(label))
        .map(|(_, interval)| *interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn keys_roundtrip_through_from_key() {
        for interval in RecurrenceInterval::ALL {
            assert_eq!(RecurrenceInterval::from_key(interval.key()), Some(interval));
        }
        assert_eq!(RecurrenceInterval::from_key("bogus_key"), None);
        assert_eq!(RecurrenceInterval::from_key("6 months"), None);
    }

    #[test]
    fn every_key_moves_strictly_forward_and_monotonically() {
        let today = date("2024-06-10");
        for start in [date("2020-01-01"), date("2024-06-10"), date("2025-01-31")] {
            for interval in RecurrenceInterval::ALL {
                let first = next_due_date(start, interval.key(), today);
                assert!(first > start.max(today), "{interval} from {start}");

                let second = next_due_date(first, interval.key(), today);
                assert!(second > first, "{interval} repeated from {first}");
            }
        }
    }

    #[test]
    fn overdue_reminder_anchors_on_today() {
        assert_eq!(
            next_due_date(date("2020-01-01"), "1_month", date("2024-06-10")),
            date("2024-07-10")
        );
    }

    #[test]
    fn future_reminder_anchors_on_due_date() {
        assert_eq!(
            next_due_date(date("2024-08-01"), "2_weeks", date("2024-06-10")),
            date("2024-08-15")
        );
    }

    #[test]
    fn unknown_interval_is_a_no_op() {
        assert_eq!(
            next_due_date(date("2024-06-10"), "bogus_key", date("2024-06-10")),
            date("2024-06-10")
        );
        // Even when overdue, the original date comes back untouched.
        assert_eq!(
            next_due_date(date("2020-01-01"), "", date("2024-06-10")),
            date("2020-01-01")
        );
    }

    #[test]
    fn month_arithmetic_clamps_to_month_end() {
        let today = date("2024-01-01");
        assert_eq!(next_due_date(date("2024-01-31"), "1_month", today), date("2024-02-29"));
        assert_eq!(
            next_due_date(date("2023-01-31"), "1_month", date("2023-01-01")),
            date("2023-02-28")
        );
        assert_eq!(next_due_date(date("2024-02-29"), "1_year", today), date("2025-02-28"));
        assert_eq!(next_due_date(date("2024-08-31"), "6_months", today), date("2025-02-28"));
    }

    #[test]
    fn day_intervals_cross_month_and_year() {
        let today = date("2024-01-01");
        assert_eq!(next_due_date(date("2024-12-28"), "1_week", today), date("2025-01-04"));
        assert_eq!(next_due_date(date("2024-01-01"), "90_days", today), date("2024-03-31"));
        assert_eq!(next_due_date(date("2024-02-01"), "30_days", today), date("2024-03-02"));
    }

    #[test]
    fn label_parsing_examples() {
        let key = |label: &str| parse_recurrence_label(label).map(|i| i.key());
        assert_eq!(key("Every 6 months"), Some("6_months"));
        assert_eq!(key("quarterly check"), Some("3_months"));
        assert_eq!(key("whenever"), None);
        assert_eq!(key(""), None);
    }

    #[test]
    fn label_rules_respect_order() {
        let key = |label: &str| parse_recurrence_label(label).map(|i| i.key());
        assert_eq!(key("Semi-annual"), Some("6_months"));
        assert_eq!(key("semiannual review"), Some("6_months"));
        assert_eq!(key("Annual physical"), Some("1_year"));
        assert_eq!(key("Yearly"), Some("1_year"));
        assert_eq!(key("EVERY 2 WEEKS"), Some("2_weeks"));
        assert_eq!(key("every week"), Some("1_week"));
        assert_eq!(key("Every 2 years"), Some("2_years"));
        assert_eq!(key("every 90 days"), Some("90_days"));
        assert_eq!(key("Monthly"), Some("1_month"));
        assert_eq!(key("biweekly"), Some("2_weeks"));
        assert_eq!(key("Every 5,000 miles"), None);
    }
}
