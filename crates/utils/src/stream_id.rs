//! Normalisation of client-supplied event log positions (`lastId`).
//!
//! Positions look like `<millis>-<sequence>`. Clients may send a bare millisecond timestamp, or a
//! shorter numeric prefix of one, which is right-padded to the full 13 digits.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Position that reads a log from its first entry.
pub const STREAM_START: &str = "0-0";

const TIMESTAMP_DIGITS: usize = 13;

static CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{13}-[0-9]+$").expect("canonical stream id pattern"));
static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("numeric pattern"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamIdError {
    #[error("Invalid stream position format: {0}. Expected format: timestamp-sequence")]
    InvalidFormat(String),
    #[error("Invalid stream position format: {0}. Both parts must be numeric")]
    NonNumericParts(String),
    #[error("Invalid stream position format: {0}. Timestamp cannot exceed 13 digits")]
    TimestampTooLong(String),
    #[error("Invalid stream position format: {0}. Expected numeric timestamp")]
    NonNumericTimestamp(String),
}

/// Normalise an optional `lastId` into a canonical `timestamp-sequence` position.
///
/// Missing or blank input resumes from [`STREAM_START`].
pub fn normalize_stream_id(input: Option<&str>) -> Result<String, StreamIdError> {
    let raw = match input.map(str::trim) {
        None | Some("") => return Ok(STREAM_START.to_string()),
        Some(raw) => raw,
    };

    if CANONICAL.is_match(raw) {
        return Ok(raw.to_string());
    }

    if raw.contains('-') {
        let parts: Vec<&str> = raw.split('-').collect();
        let [timestamp, sequence] = parts.as_slice() else {
            return Err(StreamIdError::InvalidFormat(raw.to_string()));
        };
        if !NUMERIC.is_match(timestamp) || !NUMERIC.is_match(sequence) {
            return Err(StreamIdError::NonNumericParts(raw.to_string()));
        }
        if timestamp.len() > TIMESTAMP_DIGITS {
            return Err(StreamIdError::TimestampTooLong(raw.to_string()));
        }
        return Ok(format!("{}-{sequence}", pad_timestamp(timestamp)));
    }

    if !NUMERIC.is_match(raw) {
        return Err(StreamIdError::NonNumericTimestamp(raw.to_string()));
    }
    if raw.len() > TIMESTAMP_DIGITS {
        return Err(StreamIdError::TimestampTooLong(raw.to_string()));
    }

    Ok(format!("{}-0", pad_timestamp(raw)))
}

fn pad_timestamp(timestamp: &str) -> String {
    format!("{:0<width$}", timestamp, width = TIMESTAMP_DIGITS)
}
