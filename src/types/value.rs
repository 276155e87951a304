use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::error::DatabaseError;

/// Codec type tags, also the on-disk discriminants.
pub const TAG_NULL: u8 = 0;
pub const TAG_BOOLEAN: u8 = 1;
pub const TAG_INTEGER: u8 = 2;
pub const TAG_REAL: u8 = 3;
pub const TAG_TEXT: u8 = 4;
pub const TAG_TIMESTAMP: u8 = 5;

/// A single field value. Records are schemaless, so every value carries its
/// own type tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn type_tag(&self) -> u8 {
        match self {
            Value::Null => TAG_NULL,
            Value::Boolean(_) => TAG_BOOLEAN,
            Value::Integer(_) => TAG_INTEGER,
            Value::Real(_) => TAG_REAL,
            Value::Text(_) => TAG_TEXT,
            Value::Timestamp(_) => TAG_TIMESTAMP,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn coerce_to_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            Value::Text(s) => s.parse().ok(),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Timestamp(ts) => Some(ts.timestamp() as f64),
            Value::Null => None,
        }
    }

    /// Parse a timestamp from the accepted input formats: RFC 3339,
    /// "YYYY-MM-DD HH:MM:SS", or a bare date at midnight UTC.
    pub fn timestamp_from_str(s: &str) -> Result<Value, DatabaseError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Value::Timestamp(dt.with_timezone(&Utc)));
        }

        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(Value::Timestamp(Utc.from_utc_datetime(&dt)));
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(Value::Timestamp(Utc.from_utc_datetime(&dt)));
            }
        }

        Err(DatabaseError::SerializationError {
            details: format!("failed to parse timestamp '{}'", s),
        })
    }

    pub fn now() -> Value {
        Value::Timestamp(Utc::now())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,

            // Cross-type numeric comparisons
            (Value::Integer(a), Value::Real(b)) => (*a as f64) == *b,
            (Value::Real(a), Value::Integer(b)) => *a == (*b as f64),

            (a, b) => {
                if a.is_null() || b.is_null() {
                    return false;
                }
                match (a.coerce_to_number(), b.coerce_to_number()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            }
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Real(b)) => (*a as f64).partial_cmp(b),
            (Value::Real(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.partial_cmp(b),
            (a, b) => match (a.coerce_to_number(), b.coerce_to_number()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}
