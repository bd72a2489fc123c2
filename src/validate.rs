//! Rule validation of parsed QSO lines.
//!
//! Turns a structurally parsed [`RawQso`] into an accepted [`Qso`] by
//! checking it against a [`ContestRules`] value: the frequency must map to
//! a band, both signal reports must be in range, and both exchange tokens
//! must classify into a multiplier category. A contact logged outside the
//! contest window is not an error; it is dropped and reported as such.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::parser::RawQso;
use crate::qso::{Exchange, Qso};
use crate::rules::ContestRules;

/// Errors that fail a structurally valid QSO line. All are fatal for the
/// run; the caller attaches the file and line number.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(u32),

    #[error("Invalid RST: {0}")]
    InvalidRst(u16),

    #[error("Invalid exchange: {0}")]
    InvalidExchange(String),
}

/// Outcome of validating one raw QSO.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    /// The contact passed every check and enters scoring.
    Accepted(Qso),

    /// The contact is valid but logged outside the contest window; it is
    /// dropped with a notice and excluded from all further processing.
    OutOfWindow(NaiveDateTime),
}

/// Validate a signal report by magnitude, not by mode: two-digit reports
/// must be 11-59, three-digit reports 111-599.
pub fn validate_rst(rst: u16) -> Result<(), ValidationError> {
    let ok = if rst < 100 {
        (11..=59).contains(&rst)
    } else {
        (111..=599).contains(&rst)
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidRst(rst))
    }
}

/// Classify an exchange token against the rules, failing if it is in no
/// reference set.
fn validate_exchange(token: &str, rules: &ContestRules) -> Result<Exchange, ValidationError> {
    rules
        .classify(token)
        .map(|category| Exchange::new(token, category))
        .ok_or_else(|| ValidationError::InvalidExchange(token.to_string()))
}

/// Validate one raw QSO against the contest rules.
pub fn validate(raw: RawQso, rules: &ContestRules) -> Result<Validated, ValidationError> {
    let band = rules
        .band_for(raw.freq_khz)
        .ok_or(ValidationError::InvalidFrequency(raw.freq_khz))?;

    if !rules.in_window(raw.timestamp) {
        return Ok(Validated::OutOfWindow(raw.timestamp));
    }

    validate_rst(raw.rst_sent)?;
    validate_rst(raw.rst_rcvd)?;

    let exch_sent = validate_exchange(&raw.exch_sent, rules)?;
    let exch_rcvd = validate_exchange(&raw.exch_rcvd, rules)?;

    Ok(Validated::Accepted(Qso {
        band,
        mode: raw.mode,
        timestamp: raw.timestamp,
        station: raw.station,
        rst_sent: raw.rst_sent,
        exch_sent,
        call: raw.call,
        rst_rcvd: raw.rst_rcvd,
        exch_rcvd,
    }))
}
