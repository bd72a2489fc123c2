//! The scoring engine.
//!
//! An accumulator over accepted QSOs: it consults the dedup tracker,
//! forwards accepted contacts to the statistics intake, and keeps the
//! running QSO points and bonus credits. `finalize` runs the batch
//! aggregation and combines everything into the final score:
//!
//! ```text
//! score = qso_points * multiplier + 250 * bonus_credits
//! ```

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

use crate::dedup::{DedupOutcome, DedupTracker};
use crate::qso::{Band, ExchangeCategory, Mode, Qso};
use crate::rules::ContestRules;
use crate::stats::{StatsKeeper, StatsReport};

/// Points awarded per bonus-station credit.
const BONUS_POINTS_PER_CREDIT: u64 = 250;

/// One bonus-station credit; a set keeps repeats from double-counting.
type BonusCredit = (String, Band, Mode, String);

/// What `record` did with a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// The contact was accepted and scored.
    Accepted,

    /// The contact was a duplicate; only the duplicate count changed.
    Duplicate,
}

/// Accumulates points, bonuses, and the statistics intake over one run.
#[derive(Debug)]
pub struct Scorer {
    rules: ContestRules,
    dedup: DedupTracker,
    stats: StatsKeeper,
    qso_points: u64,
    bonuses: HashSet<BonusCredit>,
}

impl Scorer {
    pub fn new(rules: ContestRules) -> Self {
        Self {
            rules,
            dedup: DedupTracker::new(),
            stats: StatsKeeper::new(),
            qso_points: 0,
            bonuses: HashSet::new(),
        }
    }

    /// The rules this scorer was built with (the caller validates raw
    /// lines against the same rule set).
    pub fn rules(&self) -> &ContestRules {
        &self.rules
    }

    /// Record one validated contact.
    ///
    /// Duplicates are counted and skipped; a conflicting exchange warns
    /// but still scores.
    pub fn record(&mut self, qso: Qso) -> Recorded {
        match self
            .dedup
            .check_and_record(&qso.call, qso.band, qso.mode, &qso.exch_rcvd.token)
        {
            DedupOutcome::Duplicate => {
                warn!(
                    "dup {} {} {} {}",
                    qso.call, qso.band, qso.mode, qso.exch_rcvd
                );
                return Recorded::Duplicate;
            }
            DedupOutcome::Conflict(previous) => {
                warn!(
                    "QSO with {} has multiple exchanges on {} {}: {}, previously {}",
                    qso.call,
                    qso.band,
                    qso.mode,
                    qso.exch_rcvd,
                    previous.join(", ")
                );
            }
            DedupOutcome::New => {}
        }

        // Out-of-area contacts are worth more than in-state ones; DX
        // carries no multiplier so it scores like a county contact.
        self.qso_points += match qso.exch_rcvd.category {
            ExchangeCategory::State | ExchangeCategory::Province => 4,
            ExchangeCategory::Dx | ExchangeCategory::County => 2,
        };

        if self.rules.is_bonus(&qso.call) {
            self.bonuses.insert((
                qso.call.clone(),
                qso.band,
                qso.mode,
                qso.exch_rcvd.token.clone(),
            ));
        }

        self.stats.record(qso);
        Recorded::Accepted
    }

    /// Run the batch aggregation and compute the final score.
    pub fn finalize(self) -> ScoreSummary {
        let stats = self.stats.process(&self.rules);
        let unique_count = self.stats.unique_count();
        let dup_count = self.dedup.dup_count();
        let bonus_points = BONUS_POINTS_PER_CREDIT * self.bonuses.len() as u64;
        let score = self.qso_points * stats.multiplier + bonus_points;

        ScoreSummary {
            qso_count: unique_count + dup_count,
            unique_count,
            dup_count,
            qso_points: self.qso_points,
            multiplier: stats.multiplier,
            bonus_points,
            score,
            stats,
        }
    }
}

/// Final totals plus the aggregation tables, ready to render or serialize.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSummary {
    /// All QSO lines that passed validation, duplicates included.
    pub qso_count: u64,

    /// Accepted, non-duplicate QSOs.
    pub unique_count: u64,

    /// Duplicates skipped.
    pub dup_count: u64,

    pub qso_points: u64,
    pub multiplier: u64,
    pub bonus_points: u64,
    pub score: u64,

    pub stats: StatsReport,
}

impl fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "QSOs: {}  Uniques: {}  Dups: {}",
            self.qso_count, self.unique_count, self.dup_count
        )?;
        writeln!(
            f,
            "QSO POINTS: {}  MULTIPLIER: {}  BONUS POINTS: {}",
            self.qso_points, self.multiplier, self.bonus_points
        )?;
        writeln!(f, "SCORE: {}", self.score)?;
        write!(f, "{}", self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_qso;
    use crate::validate::{Validated, validate};

    fn scorer() -> Scorer {
        Scorer::new(ContestRules::default())
    }

    fn record_line(scorer: &mut Scorer, line: &str) -> Recorded {
        let raw = parse_qso(line).unwrap().expect("test line should parse");
        match validate(raw, scorer.rules()).expect("test line should validate") {
            Validated::Accepted(qso) => scorer.record(qso),
            Validated::OutOfWindow(ts) => panic!("test line out of window: {}", ts),
        }
    }

    #[test]
    fn test_duplicate_across_files_scores_once() {
        let mut scorer = scorer();
        // Same contact submitted twice (e.g. in two log files)
        let line = "QSO: 14000 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 GA";
        assert_eq!(record_line(&mut scorer, line), Recorded::Accepted);
        assert_eq!(record_line(&mut scorer, line), Recorded::Duplicate);

        let summary = scorer.finalize();
        assert_eq!(summary.qso_count, 2);
        assert_eq!(summary.unique_count, 1);
        assert_eq!(summary.dup_count, 1);
        assert_eq!(summary.qso_points, 4);
        assert_eq!(summary.multiplier, 1);
        assert_eq!(summary.bonus_points, 0);
        assert_eq!(summary.score, 4);
    }

    #[test]
    fn test_bonus_station_county_contact() {
        let mut scorer = scorer();
        let line = "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 GA W4CAE 599 ABBE";
        record_line(&mut scorer, line);

        let summary = scorer.finalize();
        assert_eq!(summary.qso_points, 2);
        assert_eq!(summary.multiplier, 1);
        assert_eq!(summary.bonus_points, 250);
        assert_eq!(summary.score, 2 * 1 + 250);
    }

    #[test]
    fn test_dx_scores_two_points_and_no_multiplier() {
        let mut scorer = scorer();
        record_line(
            &mut scorer,
            "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH DL1ABC 599 DX",
        );

        let summary = scorer.finalize();
        assert_eq!(summary.qso_points, 2);
        assert_eq!(summary.multiplier, 0);
        assert_eq!(summary.score, 0);
    }

    #[test]
    fn test_conflicting_exchange_both_scored() {
        let mut scorer = scorer();
        record_line(
            &mut scorer,
            "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT",
        );
        // Same station, band, and mode, different exchange
        assert_eq!(
            record_line(
                &mut scorer,
                "QSO: 14040 CW 2023-02-25 1530 K4YTZ 599 RICH W1AW 599 MA",
            ),
            Recorded::Accepted
        );

        let summary = scorer.finalize();
        assert_eq!(summary.unique_count, 2);
        assert_eq!(summary.dup_count, 0);
        assert_eq!(summary.qso_points, 8);
        assert_eq!(summary.multiplier, 2);
    }

    #[test]
    fn test_points_by_category() {
        let mut scorer = scorer();
        // State and province: 4 each; county and DX: 2 each
        record_line(
            &mut scorer,
            "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT",
        );
        record_line(
            &mut scorer,
            "QSO: 14039 CW 2023-02-25 1503 K4YTZ 599 RICH VE2ABC 599 QC",
        );
        record_line(
            &mut scorer,
            "QSO: 14040 CW 2023-02-25 1504 K4YTZ 599 RICH K4AAA 599 YORK",
        );
        record_line(
            &mut scorer,
            "QSO: 14041 CW 2023-02-25 1505 K4YTZ 599 RICH DL1ABC 599 DX",
        );

        let summary = scorer.finalize();
        assert_eq!(summary.qso_points, 4 + 4 + 2 + 2);
        // CT, QC, YORK on CW; DX contributes none
        assert_eq!(summary.multiplier, 3);
        assert_eq!(summary.score, 12 * 3);
    }

    #[test]
    fn test_bonus_not_double_counted() {
        let mut scorer = scorer();
        let line = "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 GA W4CAE 599 ABBE";
        record_line(&mut scorer, line);
        // Exact repeat: duplicate, no extra bonus
        record_line(&mut scorer, line);

        let summary = scorer.finalize();
        assert_eq!(summary.bonus_points, 250);
    }

    #[test]
    fn test_bonus_per_band_mode() {
        let mut scorer = scorer();
        record_line(
            &mut scorer,
            "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 GA W4CAE 599 ABBE",
        );
        record_line(
            &mut scorer,
            "QSO: 7038 CW 2023-02-25 1510 K4YTZ 599 GA W4CAE 599 ABBE",
        );
        record_line(
            &mut scorer,
            "QSO: 14250 PH 2023-02-25 1520 K4YTZ 59 GA W4CAE 59 ABBE",
        );

        let summary = scorer.finalize();
        assert_eq!(summary.bonus_points, 3 * 250);
    }

    #[test]
    fn test_scoring_formula() {
        let mut scorer = scorer();
        let lines = [
            "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT",
            "QSO: 14039 CW 2023-02-25 1503 K4YTZ 599 RICH K5XYZ 599 TX",
            "QSO: 7040 PH 2023-02-25 1600 K4YTZ 59 RICH W1AW 59 CT",
            "QSO: 14041 CW 2023-02-25 1504 K4YTZ 599 RICH K4AAA 599 YORK",
            "QSO: 14042 CW 2023-02-25 1505 K4YTZ 599 RICH DL1ABC 599 DX",
        ];
        for line in lines {
            assert_eq!(record_line(&mut scorer, line), Recorded::Accepted);
        }

        let summary = scorer.finalize();
        let points: u64 = 4 + 4 + 4 + 2 + 2;
        // (CW,CT), (CW,TX), (PH,CT), (CW,YORK)
        let multiplier: u64 = 4;
        assert_eq!(summary.qso_points, points);
        assert_eq!(summary.multiplier, multiplier);
        assert_eq!(summary.score, points * multiplier);
    }

    #[test]
    fn test_summary_display_leads_with_totals() {
        let mut scorer = scorer();
        record_line(
            &mut scorer,
            "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT",
        );
        let rendered = scorer.finalize().to_string();
        assert!(rendered.starts_with("QSOs: 1  Uniques: 1  Dups: 0\n"));
        assert!(rendered.contains("QSO POINTS: 4  MULTIPLIER: 1  BONUS POINTS: 0"));
        assert!(rendered.contains("SCORE: 4"));
        assert!(rendered.contains("QSOs By Band"));
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let mut scorer = scorer();
        record_line(
            &mut scorer,
            "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT",
        );
        let summary = scorer.finalize();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["score"], 4);
        assert_eq!(json["stats"]["qsos_by_band"]["20m"], 1);
        assert_eq!(json["stats"]["qsos_by_mode"]["CW"], 1);
    }
}
