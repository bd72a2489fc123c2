//! Data structures representing contest contacts.
//!
//! This module defines the core types used throughout the application
//! to represent validated QSOs from a submitted contest log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An amateur band on which a contest contact can be made.
///
/// Variants are ordered by frequency so band-keyed tables render in the
/// conventional low-to-high order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Band {
    #[serde(rename = "160m")]
    B160,
    #[serde(rename = "80m")]
    B80,
    #[serde(rename = "40m")]
    B40,
    #[serde(rename = "20m")]
    B20,
    #[serde(rename = "15m")]
    B15,
    #[serde(rename = "10m")]
    B10,
    #[serde(rename = "6m")]
    B6,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::B160 => write!(f, "160m"),
            Band::B80 => write!(f, "80m"),
            Band::B40 => write!(f, "40m"),
            Band::B20 => write!(f, "20m"),
            Band::B15 => write!(f, "15m"),
            Band::B10 => write!(f, "10m"),
            Band::B6 => write!(f, "6m"),
        }
    }
}

impl FromStr for Band {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "160m" => Ok(Band::B160),
            "80m" => Ok(Band::B80),
            "40m" => Ok(Band::B40),
            "20m" => Ok(Band::B20),
            "15m" => Ok(Band::B15),
            "10m" => Ok(Band::B10),
            "6m" => Ok(Band::B6),
            _ => Err(format!("unknown band: {}", s)),
        }
    }
}

/// The transmission mode of a contact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Continuous Wave (Morse code)
    Cw,
    /// Phone (SSB/FM voice)
    Ph,
    /// Digital modes
    Dg,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Cw => write!(f, "CW"),
            Mode::Ph => write!(f, "PH"),
            Mode::Dg => write!(f, "DG"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CW" => Ok(Mode::Cw),
            "PH" => Ok(Mode::Ph),
            "DG" => Ok(Mode::Dg),
            _ => Err(format!("unknown mode: {}", s)),
        }
    }
}

/// Which multiplier category an exchange token belongs to.
///
/// Computed once against the contest rules when a QSO is validated and
/// carried on the record, so scoring and statistics never re-derive it
/// from the token's shape.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeCategory {
    /// The literal "DX" token for stations outside the US and Canada.
    Dx,
    /// A US state (or DC) two-letter code.
    State,
    /// A Canadian province or territory two-letter code.
    Province,
    /// A South Carolina county abbreviation.
    County,
}

impl fmt::Display for ExchangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeCategory::Dx => write!(f, "dx"),
            ExchangeCategory::State => write!(f, "states"),
            ExchangeCategory::Province => write!(f, "provinces"),
            ExchangeCategory::County => write!(f, "sc counties"),
        }
    }
}

/// A categorized exchange token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exchange {
    /// The token as logged, uppercased (e.g. "SC", "QC", "RICH", "DX").
    pub token: String,

    /// The multiplier category the token classified into.
    pub category: ExchangeCategory,
}

impl Exchange {
    pub fn new(token: impl Into<String>, category: ExchangeCategory) -> Self {
        Self {
            token: token.into(),
            category,
        }
    }

    /// True for the literal "DX" token, which carries no multiplier.
    pub fn is_dx(&self) -> bool {
        self.category == ExchangeCategory::Dx
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}

/// A validated contest contact.
///
/// A raw log line like:
/// ```text
/// QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT
/// ```
///
/// validates into a `Qso` with:
/// - `band`: Band::B20 (from 14038 kHz)
/// - `mode`: Mode::Cw
/// - `timestamp`: 2023-02-25 15:02
/// - `station`: "K4YTZ" (the logging station)
/// - `call`: "W1AW" (the station worked)
/// - `exch_rcvd`: "CT", a State
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qso {
    /// The band the contact was made on, derived from the logged frequency.
    pub band: Band,

    /// The transmission mode.
    pub mode: Mode,

    /// When the contact was logged, minute resolution, contest-local time.
    pub timestamp: NaiveDateTime,

    /// The callsign of the station submitting the log.
    pub station: String,

    /// The signal report sent to the other station.
    pub rst_sent: u16,

    /// The exchange token sent to the other station.
    pub exch_sent: Exchange,

    /// The callsign of the station worked.
    pub call: String,

    /// The signal report received from the other station.
    pub rst_rcvd: u16,

    /// The exchange token received from the other station. Drives
    /// dedup, points, multipliers, and every statistics table.
    pub exch_rcvd: Exchange,
}

impl fmt::Display for Qso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} -> {} {} {}",
            self.timestamp.format("%Y-%m-%d %H%M"),
            self.band,
            self.mode,
            self.station,
            self.rst_sent,
            self.exch_sent,
            self.call,
            self.rst_rcvd,
            self.exch_rcvd,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_ordering_follows_frequency() {
        let mut bands = vec![Band::B6, Band::B20, Band::B160, Band::B40];
        bands.sort();
        assert_eq!(bands, vec![Band::B160, Band::B40, Band::B20, Band::B6]);
    }

    #[test]
    fn test_band_display_round_trip() {
        for band in [
            Band::B160,
            Band::B80,
            Band::B40,
            Band::B20,
            Band::B15,
            Band::B10,
            Band::B6,
        ] {
            assert_eq!(band.to_string().parse::<Band>().unwrap(), band);
        }
    }

    #[test]
    fn test_mode_parse_case_insensitive() {
        assert_eq!("cw".parse::<Mode>().unwrap(), Mode::Cw);
        assert_eq!("Ph".parse::<Mode>().unwrap(), Mode::Ph);
        assert_eq!("DG".parse::<Mode>().unwrap(), Mode::Dg);
        assert!("RY".parse::<Mode>().is_err());
        assert!("SSB".parse::<Mode>().is_err());
    }

    #[test]
    fn test_exchange_is_dx() {
        assert!(Exchange::new("DX", ExchangeCategory::Dx).is_dx());
        assert!(!Exchange::new("SC", ExchangeCategory::State).is_dx());
        assert!(!Exchange::new("RICH", ExchangeCategory::County).is_dx());
    }
}
