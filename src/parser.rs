//! Parser for contest log `QSO:` lines.
//!
//! This module uses the `nom` parsing library to parse Cabrillo-style QSO
//! lines from submitted log files. The parser is designed with correctness
//! as the primary goal, followed by performance.
//!
//! # Line Format
//!
//! QSO lines follow this general format:
//! ```text
//! QSO: FREQ MODE DATE TIME MYCALL RST EXCH CALL RST EXCH
//! ```
//!
//! Example:
//! ```text
//! QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT
//! ```
//!
//! Parsing happens in two stages. The structural stage matches the line
//! shape; a line that does not match is not a QSO line and is skipped.
//! The semantic stage converts the matched fields (calendar date, `HHMM`
//! time, mode, numbers); a failure there is a hard error that aborts the
//! whole run, because the line claimed to be a QSO and is wrong.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1, take_while_m_n},
    character::complete::{char, digit1, space1},
    combinator::recognize,
};
use thiserror::Error;

use crate::qso::Mode;

/// Errors that can occur while converting a structurally matched line.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid RST: {0}")]
    InvalidRst(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A structurally parsed QSO line, before rule validation.
///
/// Frequencies are still raw kHz (not yet mapped to a band) and exchange
/// tokens are still uncategorized strings.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQso {
    /// Logged frequency in kHz.
    pub freq_khz: u32,

    /// Transmission mode.
    pub mode: Mode,

    /// Combined date and time of the contact, minute resolution.
    pub timestamp: NaiveDateTime,

    /// Callsign of the logging station.
    pub station: String,

    /// Signal report sent.
    pub rst_sent: u16,

    /// Exchange token sent, uppercased.
    pub exch_sent: String,

    /// Callsign of the station worked.
    pub call: String,

    /// Signal report received.
    pub rst_rcvd: u16,

    /// Exchange token received, uppercased.
    pub exch_rcvd: String,
}

/// Structurally captured fields, still raw text.
struct RawFields<'a> {
    freq: &'a str,
    mode: &'a str,
    date: &'a str,
    time: &'a str,
    station: &'a str,
    rst_sent: &'a str,
    exch_sent: &'a str,
    call: &'a str,
    rst_rcvd: &'a str,
    exch_rcvd: &'a str,
}

/// Check if a character is valid in a callsign.
///
/// Valid callsign characters are alphanumeric plus `/` for portable
/// designators like `W1AW/4`.
fn is_callsign_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '/'
}

/// Parse a callsign (logging station or station worked).
fn parse_callsign(input: &str) -> IResult<&str, &str> {
    take_while1(is_callsign_char).parse(input)
}

/// Parse an exchange token (state/province/county code or "DX").
fn parse_exchange(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric()).parse(input)
}

/// Parse the mode token. `RY` is matched structurally but rejected in the
/// semantic stage, so a `QSO:` line logged as RTTY fails loudly instead of
/// being silently skipped.
fn parse_mode_token(input: &str) -> IResult<&str, &str> {
    alt((
        tag_no_case("CW"),
        tag_no_case("PH"),
        tag_no_case("DG"),
        tag_no_case("RY"),
    ))
    .parse(input)
}

/// Parse an ISO date shape (`YYYY-MM-DD`), digits only; calendar validity
/// is checked in the semantic stage.
fn parse_date_shape(input: &str) -> IResult<&str, &str> {
    recognize((
        take_while_m_n(4, 4, |c: char| c.is_ascii_digit()),
        char('-'),
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
        char('-'),
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
    ))
    .parse(input)
}

/// Structural grammar for a full QSO line. Trailing content after the
/// received exchange is ignored (logs often carry an extra numeric field).
fn parse_line_shape(input: &str) -> IResult<&str, RawFields<'_>> {
    let (input, _) = (tag("QSO:"), space1).parse(input)?;
    let (input, freq) = digit1(input)?;
    let (input, _) = space1(input)?;
    let (input, mode) = parse_mode_token(input)?;
    let (input, _) = space1(input)?;
    let (input, date) = parse_date_shape(input)?;
    let (input, _) = space1(input)?;
    let (input, time) = digit1(input)?;
    let (input, _) = space1(input)?;
    let (input, station) = parse_callsign(input)?;
    let (input, _) = space1(input)?;
    let (input, rst_sent) = digit1(input)?;
    let (input, _) = space1(input)?;
    let (input, exch_sent) = parse_exchange(input)?;
    let (input, _) = space1(input)?;
    let (input, call) = parse_callsign(input)?;
    let (input, _) = space1(input)?;
    let (input, rst_rcvd) = digit1(input)?;
    let (input, _) = space1(input)?;
    let (input, exch_rcvd) = parse_exchange(input)?;

    Ok((
        input,
        RawFields {
            freq,
            mode,
            date,
            time,
            station,
            rst_sent,
            exch_sent,
            call,
            rst_rcvd,
            exch_rcvd,
        },
    ))
}

/// Convert a digit-run time field into a `NaiveTime`.
///
/// The field must be exactly four digits (`HHMM`) with in-range values.
fn convert_time(time: &str) -> ParseResult<NaiveTime> {
    if time.len() != 4 {
        return Err(ParseError::InvalidTime(time.to_string()));
    }
    let hour: u32 = time[0..2]
        .parse()
        .map_err(|_| ParseError::InvalidTime(time.to_string()))?;
    let min: u32 = time[2..4]
        .parse()
        .map_err(|_| ParseError::InvalidTime(time.to_string()))?;
    NaiveTime::from_hms_opt(hour, min, 0).ok_or_else(|| ParseError::InvalidTime(time.to_string()))
}

/// Semantic conversion of structurally matched fields.
fn convert(fields: RawFields<'_>) -> ParseResult<RawQso> {
    let freq_khz: u32 = fields
        .freq
        .parse()
        .map_err(|_| ParseError::InvalidFrequency(fields.freq.to_string()))?;

    let mode: Mode = fields
        .mode
        .parse()
        .map_err(|_| ParseError::InvalidMode(fields.mode.to_string()))?;

    let date = NaiveDate::parse_from_str(fields.date, "%Y-%m-%d")
        .map_err(|_| ParseError::InvalidDate(fields.date.to_string()))?;
    let time = convert_time(fields.time)?;

    let rst_sent: u16 = fields
        .rst_sent
        .parse()
        .map_err(|_| ParseError::InvalidRst(fields.rst_sent.to_string()))?;
    let rst_rcvd: u16 = fields
        .rst_rcvd
        .parse()
        .map_err(|_| ParseError::InvalidRst(fields.rst_rcvd.to_string()))?;

    Ok(RawQso {
        freq_khz,
        mode,
        timestamp: NaiveDateTime::new(date, time),
        station: fields.station.to_ascii_uppercase(),
        rst_sent,
        exch_sent: fields.exch_sent.to_ascii_uppercase(),
        call: fields.call.to_ascii_uppercase(),
        rst_rcvd,
        exch_rcvd: fields.exch_rcvd.to_ascii_uppercase(),
    })
}

/// Parse one line of a log file.
///
/// Returns `Ok(None)` for lines that are not QSO lines (headers, blanks,
/// comments), `Ok(Some(raw))` for a matched and converted line, and
/// `Err(_)` for a line that matched the QSO grammar but carries an
/// unconvertible field. The caller attaches the file and line number.
///
/// # Example
///
/// ```
/// use scqp_score::parser::parse_qso;
///
/// let line = "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT";
/// let raw = parse_qso(line).unwrap().unwrap();
/// assert_eq!(raw.freq_khz, 14038);
/// assert_eq!(raw.call, "W1AW");
/// assert_eq!(raw.exch_rcvd, "CT");
/// ```
pub fn parse_qso(line: &str) -> ParseResult<Option<RawQso>> {
    let line = line.trim();

    match parse_line_shape(line) {
        Ok((_, fields)) => convert(fields).map(Some),
        Err(_) => Ok(None),
    }
}

/// Check if a line looks like a QSO line (quick pre-filter).
///
/// This is a fast check to avoid running the full parser on header and
/// comment lines.
#[inline]
pub fn looks_like_qso(line: &str) -> bool {
    line.trim_start().starts_with("QSO:")
}
