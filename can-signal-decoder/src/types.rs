//! Core types for the CAN signal decoder library
//!
//! This module defines the values that flow through the decoder: the raw
//! payload read from a log line, the decoded signal triple emitted for it, and
//! the error taxonomy shared by the parser, the decoder and the log reader.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Raw CAN payload as read from one candump log line
///
/// The data bytes are packed into a single `u64`: the first byte on the wire
/// is the most significant byte and shorter frames are zero-padded on the
/// right, so `1027` becomes `0x1027_0000_0000_0000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Timestamp text as written in the log (e.g. `(1600000000.000000)`)
    pub timestamp: String,
    /// Interface name (e.g. `can0`)
    pub interface: String,
    /// CAN arbitration ID
    pub can_id: u32,
    /// Up to 8 data bytes packed big-endian into an integer
    pub data: u64,
    /// Number of data bytes present in the log line
    pub dlc: usize,
}

impl Payload {
    /// Build a payload with no interface and a full 8-byte length
    pub fn new(can_id: u32, data: u64, timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            interface: String::new(),
            can_id,
            data,
            dlc: 8,
        }
    }

    /// Convert the `(seconds.fraction)` timestamp into a `DateTime<Utc>`
    ///
    /// Returns `None` for timestamps that are not epoch seconds.
    pub fn time(&self) -> Option<Timestamp> {
        parse_timestamp(&self.timestamp)
    }
}

/// Parse a candump `(seconds.fraction)` timestamp as epoch time
///
/// The parentheses are optional. Negative values count back from the epoch,
/// so `(-1.5)` is one and a half seconds before it.
pub fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let text = text.trim_start_matches('(').trim_end_matches(')');
    let (secs_text, frac) = match text.split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (text, ""),
    };
    let secs: i64 = secs_text.parse().ok()?;

    // Right-pad (or cut) the fraction to nanoseconds
    let nanos = if frac.is_empty() {
        0
    } else {
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits: String = frac.chars().chain(std::iter::repeat('0')).take(9).collect();
        digits.parse::<u32>().ok()?
    };

    // The fraction carries the sign of the seconds, including `-0.x`
    if secs_text.starts_with('-') && nanos > 0 {
        DateTime::from_timestamp(secs.checked_sub(1)?, 1_000_000_000 - nanos)
    } else {
        DateTime::from_timestamp(secs, nanos)
    }
}

/// A decoded signal value: the (timestamp, name, value) output triple
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSignal {
    /// Timestamp text of the payload this value came from
    pub timestamp: String,
    /// Signal name from the DBC
    pub name: String,
    /// Physical value after scaling and offset
    pub value: f64,
    /// Engineering unit (e.g. "km/h"), empty when not declared
    pub unit: String,
    /// Raw value before scaling (sign-extended for signed signals)
    pub raw_value: i64,
}

impl fmt::Display for DecodedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {:.1}", self.timestamp, self.name, self.value)
    }
}

/// Reasons a DBC line could not be parsed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("no BO_ message definition found")]
    MissingHeader,

    #[error("malformed message header: {0}")]
    MalformedHeader(String),

    #[error("missing or malformed fields: {0}")]
    MissingFields(String),

    #[error("invalid number for {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("duplicate signal name '{0}'")]
    DuplicateSignal(String),
}

/// Errors that can occur during parsing and decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse DBC line {line}: {kind}")]
    DbcParseError { line: usize, kind: ParseErrorKind },

    #[error("Malformed field in signal '{signal}' (line {line}): {reason}")]
    MalformedField {
        line: usize,
        signal: String,
        reason: String,
    },

    #[error("Signal not found: {0}")]
    UnknownSignal(String),

    #[error("Signal '{signal}' value {value} outside declared range [{min}, {max}]")]
    OutOfRange {
        signal: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Failed to parse log line {line}: {reason}")]
    LogParseError { line: usize, reason: String },
}

impl DecoderError {
    pub(crate) fn dbc(line: usize, kind: ParseErrorKind) -> Self {
        DecoderError::DbcParseError { line, kind }
    }

    pub(crate) fn log(line: usize, reason: impl Into<String>) -> Self {
        DecoderError::LogParseError {
            line,
            reason: reason.into(),
        }
    }

    /// Line number of the offending input line, if the error has one
    pub fn line(&self) -> Option<usize> {
        match self {
            DecoderError::DbcParseError { line, .. }
            | DecoderError::MalformedField { line, .. }
            | DecoderError::LogParseError { line, .. } => Some(*line),
            _ => None,
        }
    }
}
