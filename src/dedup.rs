//! Duplicate and conflict detection for contest contacts.
//!
//! The contest rule behind this: a station may be worked once per band
//! and mode, and its location (the exchange) should not change within a
//! band/mode. A repeat with the same exchange is a duplicate and is not
//! scored again; a repeat with a *different* exchange is a logging
//! anomaly that is flagged but still scored, since the checker cannot
//! decide which exchange is authoritative.

use std::collections::{HashMap, HashSet};

use crate::qso::{Band, Mode};

/// Key identifying one worked station on one band and mode.
pub type DedupKey = (String, Band, Mode);

/// Classification of an incoming contact against the tracker state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupOutcome {
    /// First contact for this key; recorded and accepted.
    New,

    /// Same key, same exchange as an earlier contact; skip scoring.
    Duplicate,

    /// Same key but a different exchange than previously accepted. The
    /// new exchange is recorded and the contact is still scored; the
    /// earlier exchanges are returned for the warning.
    Conflict(Vec<String>),
}

/// Stateful map from [`DedupKey`] to the set of exchanges already
/// accepted for that key.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashMap<DedupKey, HashSet<String>>,
    dup_count: u64,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a contact and, unless it is a duplicate, record its
    /// exchange for the key.
    pub fn check_and_record(
        &mut self,
        call: &str,
        band: Band,
        mode: Mode,
        exchange: &str,
    ) -> DedupOutcome {
        let exchanges = self
            .seen
            .entry((call.to_string(), band, mode))
            .or_default();

        if exchanges.contains(exchange) {
            self.dup_count += 1;
            return DedupOutcome::Duplicate;
        }

        let outcome = if exchanges.is_empty() {
            DedupOutcome::New
        } else {
            let mut previous: Vec<String> = exchanges.iter().cloned().collect();
            previous.sort();
            DedupOutcome::Conflict(previous)
        };

        exchanges.insert(exchange.to_string());
        outcome
    }

    /// Number of duplicates seen so far.
    pub fn dup_count(&self) -> u64 {
        self.dup_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_contact_is_new() {
        let mut tracker = DedupTracker::new();
        assert_eq!(
            tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "CT"),
            DedupOutcome::New
        );
        assert_eq!(tracker.dup_count(), 0);
    }

    #[test]
    fn test_identical_repeat_is_duplicate() {
        let mut tracker = DedupTracker::new();
        tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "CT");
        assert_eq!(
            tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "CT"),
            DedupOutcome::Duplicate
        );
        assert_eq!(tracker.dup_count(), 1);
    }

    #[test]
    fn test_different_band_or_mode_is_new() {
        let mut tracker = DedupTracker::new();
        tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "CT");
        assert_eq!(
            tracker.check_and_record("W1AW", Band::B40, Mode::Cw, "CT"),
            DedupOutcome::New
        );
        assert_eq!(
            tracker.check_and_record("W1AW", Band::B20, Mode::Ph, "CT"),
            DedupOutcome::New
        );
        assert_eq!(tracker.dup_count(), 0);
    }

    #[test]
    fn test_changed_exchange_is_conflict_but_recorded() {
        let mut tracker = DedupTracker::new();
        tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "CT");
        assert_eq!(
            tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "MA"),
            DedupOutcome::Conflict(vec!["CT".to_string()])
        );
        // Both exchanges now count as already seen
        assert_eq!(
            tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "CT"),
            DedupOutcome::Duplicate
        );
        assert_eq!(
            tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "MA"),
            DedupOutcome::Duplicate
        );
        assert_eq!(tracker.dup_count(), 2);
    }

    #[test]
    fn test_conflict_reports_all_previous_exchanges() {
        let mut tracker = DedupTracker::new();
        tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "CT");
        tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "MA");
        assert_eq!(
            tracker.check_and_record("W1AW", Band::B20, Mode::Cw, "NH"),
            DedupOutcome::Conflict(vec!["CT".to_string(), "MA".to_string()])
        );
    }
}
