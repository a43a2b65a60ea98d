//! Fuzzy duplicate detection for reminder titles.
//!
//! Titles are normalized (lowercase, only `[a-z0-9\s]`, collapsed whitespace)
//! before comparison. The comparison itself is a swappable strategy.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::DedupStrategy;

/// Lowercase, drop everything outside `[a-z0-9\s]`, collapse whitespace, trim.
pub fn normalize_title(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decides whether two reminder titles name the same task.
pub trait DuplicateMatcher: Send + Sync {
    /// Strategy name, for logs.
    fn name(&self) -> &'static str;

    /// Compare two normalized, non-empty titles.
    fn matches(&self, candidate: &str, existing: &str) -> bool;

    /// Whether `candidate` duplicates any of `existing`. Titles that normalize
    /// to the empty string never match anything.
    fn is_duplicate(&self, candidate: &str, existing: &[String]) -> bool {
        let candidate = normalize_title(candidate);
        if candidate.is_empty() {
            return false;
        }
        existing.iter().any(|title| {
            let title = normalize_title(title);
            !title.is_empty() && self.matches(&candidate, &title)
        })
    }
}

/// Equal, contains, or contained-by. Deliberately permissive: "Vet visit" and
/// "Annual vet visit checkup" count as the same task.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl DuplicateMatcher for SubstringMatcher {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn matches(&self, candidate: &str, existing: &str) -> bool {
        candidate == existing || candidate.contains(existing) || existing.contains(candidate)
    }
}

/// Jaccard ratio of the word sets, duplicate at or above `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct TokenOverlapMatcher {
    pub threshold: f64,
}

impl TokenOverlapMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn ratio(a: &str, b: &str) -> f64 {
        let a: HashSet<&str> = a.split(' ').collect();
        let b: HashSet<&str> = b.split(' ').collect();
        let union = a.union(&b).count();
        if union == 0 {
            return 0.0;
        }
        a.intersection(&b).count() as f64 / union as f64
    }
}

impl DuplicateMatcher for TokenOverlapMatcher {
    fn name(&self) -> &'static str {
        "token_overlap"
    }

    fn matches(&self, candidate: &str, existing: &str) -> bool {
        Self::ratio(candidate, existing) >= self.threshold
    }
}

/// Build the matcher for a configured strategy.
pub fn matcher_for(strategy: DedupStrategy) -> Arc<dyn DuplicateMatcher> {
    match strategy {
        DedupStrategy::Substring => Arc::new(SubstringMatcher),
        DedupStrategy::TokenOverlap { threshold } => Arc::new(TokenOverlapMatcher::new(threshold)),
    }
}

/// Duplicate check with the default substring strategy.
pub fn is_duplicate(candidate: &str, existing: &[String]) -> bool {
    SubstringMatcher.is_duplicate(candidate, existing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_strips_punctuation_and_whitespace() {
        assert_eq!(normalize_title("  Renew   Passport!! "), "renew passport");
        assert_eq!(normalize_title("Oil change (5,000 mi)"), "oil change 5000 mi");
        assert_eq!(normalize_title("Café visit"), "caf visit");
        assert_eq!(normalize_title("?!?"), "");
    }

    #[test]
    fn containment_counts_as_duplicate() {
        assert!(is_duplicate("Schedule dentist visit", &titles(&["Dentist visit"])));
        assert!(is_duplicate("Vet visit", &titles(&["Annual vet visit checkup"])));
        assert!(is_duplicate("renew passport", &titles(&["Renew Passport."])));
    }

    #[test]
    fn unrelated_titles_are_not_duplicates() {
        assert!(!is_duplicate("Oil change", &titles(&["Passport renewal"])));
        assert!(!is_duplicate("Renew car registration", &titles(&["Renew passport"])));
        assert!(!is_duplicate("Oil change", &[]));
    }

    #[test]
    fn empty_titles_never_match() {
        assert!(!is_duplicate("", &titles(&["anything"])));
        assert!(!is_duplicate("   ", &titles(&["anything"])));
        assert!(!is_duplicate("!!!", &titles(&["anything"])));
        assert!(!is_duplicate("Oil change", &titles(&["", "  ", "***"])));
    }

    #[test]
    fn token_overlap_is_stricter_than_substring() {
        let matcher = TokenOverlapMatcher::new(0.6);
        let existing = titles(&["Annual vet visit checkup"]);
        // 2 shared of 4 distinct words = 0.5
        assert!(!matcher.is_duplicate("Vet visit", &existing));
        assert!(matcher.is_duplicate("Annual vet checkup visit", &existing));
        assert!(!matcher.is_duplicate("", &existing));
    }

    #[test]
    fn matcher_for_selects_strategy() {
        assert_eq!(matcher_for(DedupStrategy::Substring).name(), "substring");
        assert_eq!(
            matcher_for(DedupStrategy::TokenOverlap { threshold: 0.5 }).name(),
            "token_overlap"
        );
    }
}
