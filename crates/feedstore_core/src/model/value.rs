//! Backend-neutral column values.
//!
//! # Invariants
//! - Text compares bytewise, integers numerically, flags `false < true`.
//! - Timestamps are always UTC and render with nanosecond precision so that
//!   their text form sorts chronologically.

use chrono::{DateTime, SecondsFormat, Utc};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Storage kind of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// UUID stored as hyphenated lowercase text.
    Id,
    Text,
    Integer,
    Bool,
    Blob,
    /// UTC instant stored as RFC 3339 text.
    Timestamp,
}

impl ColumnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Bool => "bool",
            Self::Blob => "blob",
            Self::Timestamp => "timestamp",
        }
    }
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named, typed column of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn id(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Id,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
        }
    }

    pub const fn flag(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Bool,
        }
    }

    pub const fn blob(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Blob,
        }
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Timestamp,
        }
    }
}

/// A single column value as it crosses the backend seam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Returns whether this value may be stored in / compared with `kind`.
    pub fn fits(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (Self::Text(_), ColumnKind::Id | ColumnKind::Text)
                | (Self::Integer(_), ColumnKind::Integer)
                | (Self::Bool(_), ColumnKind::Bool)
                | (Self::Blob(_), ColumnKind::Blob)
                | (Self::Timestamp(_), ColumnKind::Timestamp)
        )
    }

    /// Total order used by backends that sort in process.
    ///
    /// Values of different variants never share a column, so they fall back
    /// to a fixed variant rank.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(left), Self::Text(right)) => left.as_bytes().cmp(right.as_bytes()),
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Bool(left), Self::Bool(right)) => left.cmp(right),
            (Self::Blob(left), Self::Blob(right)) => left.cmp(right),
            (Self::Timestamp(left), Self::Timestamp(right)) => left.cmp(right),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Integer(_) | Self::Bool(_) => 0,
            Self::Text(_) | Self::Timestamp(_) => 1,
            Self::Blob(_) => 2,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Renders a timestamp in the fixed-width form used by every backend.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parses a timestamp previously written by [`format_timestamp`].
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, parse_timestamp, ColumnKind, FieldValue};
    use chrono::{TimeZone, Utc};
    use std::cmp::Ordering;

    #[test]
    fn text_values_fit_id_and_text_columns_only() {
        let value = FieldValue::from("abc");
        assert!(value.fits(ColumnKind::Id));
        assert!(value.fits(ColumnKind::Text));
        assert!(!value.fits(ColumnKind::Bool));
        assert!(!FieldValue::Bool(true).fits(ColumnKind::Integer));
    }

    #[test]
    fn timestamp_text_sorts_like_the_instant() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(500);
        assert!(format_timestamp(&early) < format_timestamp(&late));
        assert_eq!(parse_timestamp(&format_timestamp(&late)), Some(late));
    }

    #[test]
    fn compare_is_bytewise_for_text() {
        let upper = FieldValue::from("Zeta");
        let lower = FieldValue::from("alpha");
        assert_eq!(upper.compare(&lower), Ordering::Less);
        assert_eq!(
            FieldValue::Bool(false).compare(&FieldValue::Bool(true)),
            Ordering::Less
        );
    }
}
