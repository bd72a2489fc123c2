//! scqp-score - A library and CLI for scoring South Carolina QSO Party logs.
//!
//! This crate provides:
//! - A nom-based parser for Cabrillo-style `QSO:` log lines
//! - Rule validation (band plan, contest window, signal reports, exchanges)
//! - Duplicate/conflict detection keyed on (call, band, mode)
//! - A scoring engine (points x multiplier + bonus credits) with
//!   multi-dimensional statistics and missing-multiplier reports
//!
//! # Example
//!
//! ```rust
//! use scqp_score::{ContestRules, Scorer, Validated, parse_qso, validate};
//!
//! let line = "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT";
//! let raw = parse_qso(line).expect("parseable").expect("a QSO line");
//!
//! let mut scorer = Scorer::new(ContestRules::default());
//! if let Validated::Accepted(qso) = validate(raw, scorer.rules()).expect("valid") {
//!     scorer.record(qso);
//! }
//!
//! let summary = scorer.finalize();
//! assert_eq!(summary.score, 4);
//! ```

pub mod dedup;
pub mod parser;
pub mod qso;
pub mod rules;
pub mod score;
pub mod stats;
pub mod validate;

pub use dedup::{DedupOutcome, DedupTracker};
pub use parser::{ParseError, RawQso, looks_like_qso, parse_qso};
pub use qso::{Band, Exchange, ExchangeCategory, Mode, Qso};
pub use rules::{BandRange, ContestRules};
pub use score::{Recorded, ScoreSummary, Scorer};
pub use stats::{MultiplierCounts, StatsKeeper, StatsReport};
pub use validate::{Validated, ValidationError, validate};
