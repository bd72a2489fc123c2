//! Statistics aggregation over the accepted QSO log.
//!
//! The aggregator keeps the full accepted log and cross-tabulates it in
//! one batch pass after all input is consumed: QSO counts by band, mode,
//! and band×mode; a DX summary with derived totals; distinct-multiplier
//! tables over the non-DX partition; and missing-multiplier sets
//! (reference set minus observed set). Several of these require counting
//! distinct combinations across the whole log, which is why this is not
//! streamed per-QSO.
//!
//! Every table is an explicit `BTreeMap` keyed by [`Band`] / [`Mode`], so
//! rows render in band/mode order with no dataframe machinery.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::qso::{Band, ExchangeCategory, Mode, Qso};
use crate::rules::ContestRules;

/// Distinct-multiplier counts for one table row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MultiplierCounts {
    pub states: u64,
    pub provinces: u64,
    pub counties: u64,
}

/// Distinct (category, token) pairs observed within one grouping.
type TokenSet = BTreeSet<(ExchangeCategory, String)>;

impl MultiplierCounts {
    fn from_tokens(tokens: &TokenSet) -> Self {
        let count = |category| tokens.iter().filter(|(c, _)| *c == category).count() as u64;
        Self {
            states: count(ExchangeCategory::State),
            provinces: count(ExchangeCategory::Province),
            counties: count(ExchangeCategory::County),
        }
    }
}

/// Intake log for accepted, non-duplicate QSOs.
///
/// The scoring engine moves each accepted contact here; [`StatsKeeper::process`]
/// rebuilds every table from scratch.
#[derive(Debug, Default)]
pub struct StatsKeeper {
    accepted: Vec<Qso>,
}

impl StatsKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an accepted QSO to the intake log.
    pub fn record(&mut self, qso: Qso) {
        self.accepted.push(qso);
    }

    /// Number of accepted (non-duplicate) QSOs.
    pub fn unique_count(&self) -> u64 {
        self.accepted.len() as u64
    }

    /// Rebuild all aggregation tables from the intake log.
    pub fn process(&self, rules: &ContestRules) -> StatsReport {
        let mut qsos_by_band: BTreeMap<Band, u64> = BTreeMap::new();
        let mut qsos_by_mode: BTreeMap<Mode, u64> = BTreeMap::new();
        let mut qsos_by_band_mode: BTreeMap<Band, BTreeMap<Mode, u64>> = BTreeMap::new();
        let mut dx_by_band_mode: BTreeMap<Band, BTreeMap<Mode, u64>> = BTreeMap::new();

        // Distinct (category, token) pairs per grouping, over the non-DX
        // partition only.
        let mut tokens_all: TokenSet = BTreeSet::new();
        let mut tokens_by_band: BTreeMap<Band, TokenSet> = BTreeMap::new();
        let mut tokens_by_mode: BTreeMap<Mode, TokenSet> = BTreeMap::new();
        let mut tokens_by_band_mode: BTreeMap<Band, BTreeMap<Mode, TokenSet>> = BTreeMap::new();

        // Distinct (mode, category, token) combinations drive the score
        // multiplier: a multiplier counts once per mode, and DX contacts
        // contribute none.
        let mut mult_combos: BTreeSet<(Mode, ExchangeCategory, String)> = BTreeSet::new();

        for qso in &self.accepted {
            *qsos_by_band.entry(qso.band).or_insert(0) += 1;
            *qsos_by_mode.entry(qso.mode).or_insert(0) += 1;
            *qsos_by_band_mode
                .entry(qso.band)
                .or_default()
                .entry(qso.mode)
                .or_insert(0) += 1;

            if qso.exch_rcvd.is_dx() {
                *dx_by_band_mode
                    .entry(qso.band)
                    .or_default()
                    .entry(qso.mode)
                    .or_insert(0) += 1;
                continue;
            }

            let pair = (qso.exch_rcvd.category, qso.exch_rcvd.token.clone());
            tokens_all.insert(pair.clone());
            tokens_by_band
                .entry(qso.band)
                .or_default()
                .insert(pair.clone());
            tokens_by_mode
                .entry(qso.mode)
                .or_default()
                .insert(pair.clone());
            tokens_by_band_mode
                .entry(qso.band)
                .or_default()
                .entry(qso.mode)
                .or_default()
                .insert(pair.clone());
            mult_combos.insert((qso.mode, pair.0, pair.1));
        }

        let mut mults_no_breakdown = MultiplierCounts::from_tokens(&tokens_all);
        // SCQP convention: working any SC county also credits the state
        // of South Carolina once in the no-breakdown totals.
        if mults_no_breakdown.counties > 0 {
            mults_no_breakdown.states += 1;
        }

        let mults_by_band_mode = tokens_by_band_mode
            .iter()
            .map(|(band, by_mode)| (*band, counts_by_key(by_mode)))
            .collect();

        let observed = |category| -> BTreeSet<String> {
            tokens_all
                .iter()
                .filter(|(c, _)| *c == category)
                .map(|(_, token)| token.clone())
                .collect()
        };
        let missing = |category| -> Vec<String> {
            rules
                .reference_set(category)
                .difference(&observed(category))
                .cloned()
                .collect()
        };

        StatsReport {
            qsos_by_band,
            qsos_by_mode,
            qsos_by_band_mode,
            dx_by_band_mode,
            multiplier: mult_combos.len() as u64,
            mults_no_breakdown,
            mults_by_band: counts_by_key(&tokens_by_band),
            mults_by_mode: counts_by_key(&tokens_by_mode),
            mults_by_band_mode,
            missing_states: missing(ExchangeCategory::State),
            missing_provinces: missing(ExchangeCategory::Province),
            missing_counties: missing(ExchangeCategory::County),
        }
    }
}

fn counts_by_key<K: Copy + Ord>(sets: &BTreeMap<K, TokenSet>) -> BTreeMap<K, MultiplierCounts> {
    sets.iter()
        .map(|(k, v)| (*k, MultiplierCounts::from_tokens(v)))
        .collect()
}

/// All aggregation tables, rebuilt on demand from the accepted log.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub qsos_by_band: BTreeMap<Band, u64>,
    pub qsos_by_mode: BTreeMap<Mode, u64>,
    pub qsos_by_band_mode: BTreeMap<Band, BTreeMap<Mode, u64>>,

    /// DX contact counts; totals are derived by summation when rendered.
    pub dx_by_band_mode: BTreeMap<Band, BTreeMap<Mode, u64>>,

    /// Distinct (mode, category, value) combinations over non-DX QSOs.
    pub multiplier: u64,

    pub mults_no_breakdown: MultiplierCounts,
    pub mults_by_band: BTreeMap<Band, MultiplierCounts>,
    pub mults_by_mode: BTreeMap<Mode, MultiplierCounts>,
    pub mults_by_band_mode: BTreeMap<Band, BTreeMap<Mode, MultiplierCounts>>,

    /// Reference tokens never observed, sorted for display.
    pub missing_states: Vec<String>,
    pub missing_provinces: Vec<String>,
    pub missing_counties: Vec<String>,
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "=".repeat(title.len()))
}

fn write_mult_row(f: &mut fmt::Formatter<'_>, label: &str, c: &MultiplierCounts) -> fmt::Result {
    writeln!(
        f,
        "{:<10} {:>8} {:>11} {:>13}",
        label, c.states, c.provinces, c.counties
    )
}

fn write_mult_header(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
        f,
        "{:<10} {:>8} {:>11} {:>13}",
        "", "states", "provinces", "sc counties"
    )
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_section(f, "QSOs By Band")?;
        for (band, count) in &self.qsos_by_band {
            writeln!(f, "{:<10} {:>5}", band.to_string(), count)?;
        }

        write_section(f, "QSOs By Mode")?;
        for (mode, count) in &self.qsos_by_mode {
            writeln!(f, "{:<10} {:>5}", mode.to_string(), count)?;
        }

        write_section(f, "QSOs By Band/Mode")?;
        for (band, by_mode) in &self.qsos_by_band_mode {
            for (mode, count) in by_mode {
                writeln!(f, "{:<10} {:>5}", format!("{} {}", band, mode), count)?;
            }
        }

        write_section(f, "DX Summary")?;
        let dx_bands: Vec<Band> = self.dx_by_band_mode.keys().copied().collect();
        let dx_modes: BTreeSet<Mode> = self
            .dx_by_band_mode
            .values()
            .flat_map(|m| m.keys().copied())
            .collect();
        if dx_bands.is_empty() {
            writeln!(f, "(none)")?;
        } else {
            write!(f, "{:<7}", "")?;
            for band in &dx_bands {
                write!(f, "{:>7}", band.to_string())?;
            }
            writeln!(f, "{:>7}", "Total")?;
            let cell = |band: Band, mode: Mode| -> u64 {
                self.dx_by_band_mode
                    .get(&band)
                    .and_then(|m| m.get(&mode))
                    .copied()
                    .unwrap_or(0)
            };
            for mode in &dx_modes {
                write!(f, "{:<7}", mode.to_string())?;
                let mut row_total = 0;
                for band in &dx_bands {
                    let n = cell(*band, *mode);
                    row_total += n;
                    write!(f, "{:>7}", n)?;
                }
                writeln!(f, "{:>7}", row_total)?;
            }
            write!(f, "{:<7}", "Total")?;
            let mut grand_total = 0;
            for band in &dx_bands {
                let col_total: u64 = dx_modes.iter().map(|mode| cell(*band, *mode)).sum();
                grand_total += col_total;
                write!(f, "{:>7}", col_total)?;
            }
            writeln!(f, "{:>7}", grand_total)?;
        }

        write_section(f, "States/Provinces/SC Counties")?;
        write_mult_header(f)?;
        write_mult_row(f, "Total", &self.mults_no_breakdown)?;

        write_section(f, "States/Provinces/SC Counties By Band")?;
        write_mult_header(f)?;
        for (band, counts) in &self.mults_by_band {
            write_mult_row(f, &band.to_string(), counts)?;
        }

        write_section(f, "States/Provinces/SC Counties By Mode")?;
        write_mult_header(f)?;
        for (mode, counts) in &self.mults_by_mode {
            write_mult_row(f, &mode.to_string(), counts)?;
        }

        write_section(f, "States/Provinces/SC Counties By Band/Mode")?;
        write_mult_header(f)?;
        for (band, by_mode) in &self.mults_by_band_mode {
            for (mode, counts) in by_mode {
                write_mult_row(f, &format!("{} {}", band, mode), counts)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Missing States: {}", self.missing_states.join(", "))?;
        writeln!(f)?;
        writeln!(f, "Missing Provinces: {}", self.missing_provinces.join(", "))?;
        writeln!(f)?;
        writeln!(f, "Missing Counties: {}", self.missing_counties.join(", "))?;

        Ok(())
    }
}
