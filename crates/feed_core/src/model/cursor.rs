//! Keyset position and opaque cursor codec.
//!
//! # Responsibility
//! - Represent a page boundary as `(created_at, seq)`.
//! - Encode/decode the boundary as a caller-visible cursor string.
//!
//! # Invariants
//! - Feed order is `created_at DESC, seq DESC`; a position admits rows
//!   strictly after it in that order.
//! - Cursor text starts with an RFC 3339 UTC timestamp; the optional `~seq`
//!   suffix carries the tie-break key.

use chrono::{DateTime, SecondsFormat, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SEQ_SEPARATOR: char = '~';

/// Exclusive upper bound of a feed page in `(created_at, seq)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedPosition {
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub seq: i64,
}

impl FeedPosition {
    /// Position directly after the row `(created_at, seq)`.
    pub fn after_row(created_at: i64, seq: i64) -> Self {
        Self { created_at, seq }
    }

    /// Admits only rows created strictly before `created_at`.
    ///
    /// Sequences start at 1, so a zero sequence excludes every row at
    /// `created_at` itself.
    pub fn before_time(created_at: i64) -> Self {
        Self { created_at, seq: 0 }
    }
}

/// Cursor decode failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    Empty,
    InvalidTimestamp(String),
    InvalidSequence(String),
}

impl Display for CursorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "cursor must not be empty"),
            Self::InvalidTimestamp(value) => {
                write!(f, "cursor timestamp is not RFC 3339: `{value}`")
            }
            Self::InvalidSequence(value) => write!(f, "cursor sequence is invalid: `{value}`"),
        }
    }
}

impl Error for CursorError {}

/// Encodes a position as `<RFC 3339 millis>~<seq>`.
pub fn encode_cursor(position: FeedPosition) -> String {
    let timestamp = match DateTime::<Utc>::from_timestamp_millis(position.created_at) {
        Some(at) => at.to_rfc3339_opts(SecondsFormat::Millis, true),
        // Out of chrono's range; unreachable for stored epoch-millis values.
        None => position.created_at.to_string(),
    };
    format!("{timestamp}{SEQ_SEPARATOR}{}", position.seq)
}

/// Decodes a cursor produced by [`encode_cursor`] or a bare RFC 3339 timestamp.
///
/// A bare timestamp resumes strictly before that instant.
pub fn decode_cursor(value: &str) -> Result<FeedPosition, CursorError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CursorError::Empty);
    }

    let (timestamp_text, seq_text) = match trimmed.split_once(SEQ_SEPARATOR) {
        Some((timestamp, seq)) => (timestamp, Some(seq)),
        None => (trimmed, None),
    };

    let created_at = DateTime::parse_from_rfc3339(timestamp_text)
        .map_err(|_| CursorError::InvalidTimestamp(timestamp_text.to_string()))?
        .with_timezone(&Utc)
        .timestamp_millis();

    match seq_text {
        None => Ok(FeedPosition::before_time(created_at)),
        Some(seq_text) => {
            let seq = seq_text
                .parse::<i64>()
                .ok()
                .filter(|seq| *seq >= 0)
                .ok_or_else(|| CursorError::InvalidSequence(seq_text.to_string()))?;
            Ok(FeedPosition::after_row(created_at, seq))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_cursor, encode_cursor, CursorError, FeedPosition};

    #[test]
    fn encoded_cursor_is_rfc3339_prefixed_and_decodes_back() {
        let position = FeedPosition::after_row(20, 7);
        let cursor = encode_cursor(position);
        assert_eq!(cursor, "1970-01-01T00:00:00.020Z~7");
        assert_eq!(decode_cursor(&cursor).unwrap(), position);
    }

    #[test]
    fn bare_timestamp_means_strictly_before() {
        let position = decode_cursor("1970-01-01T00:00:00.020+00:00").unwrap();
        assert_eq!(position, FeedPosition::before_time(20));
    }

    #[test]
    fn offset_timestamps_are_normalized_to_utc() {
        let position = decode_cursor("1970-01-01T01:00:00.000+01:00").unwrap();
        assert_eq!(position.created_at, 0);
    }

    #[test]
    fn malformed_cursors_are_rejected() {
        assert_eq!(decode_cursor("  "), Err(CursorError::Empty));
        assert!(matches!(
            decode_cursor("yesterday"),
            Err(CursorError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            decode_cursor("1970-01-01T00:00:00.020Z~x"),
            Err(CursorError::InvalidSequence(_))
        ));
        assert!(matches!(
            decode_cursor("1970-01-01T00:00:00.020Z~-3"),
            Err(CursorError::InvalidSequence(_))
        ));
    }

    #[test]
    fn positions_order_by_time_then_sequence() {
        assert!(FeedPosition::before_time(20) < FeedPosition::after_row(20, 1));
        assert!(FeedPosition::after_row(20, 1) < FeedPosition::after_row(20, 2));
        assert!(FeedPosition::after_row(19, i64::MAX) < FeedPosition::before_time(20));
    }
}
