use chrono::{TimeZone, Utc};
use sawitdb::types::value::Value;

#[test]
fn test_equality_same_types() {
    assert_eq!(Value::Null, Value::Null);
    assert_eq!(Value::Integer(42), Value::Integer(42));
    assert_eq!(Value::Real(1.5), Value::Real(1.5));
    assert_eq!(Value::Text("Dura".to_string()), Value::Text("Dura".to_string()));
    assert_eq!(Value::Boolean(true), Value::Boolean(true));
    assert_ne!(Value::Integer(1), Value::Integer(2));
}

#[test]
fn test_cross_type_numeric_equality() {
    assert_eq!(Value::Integer(5), Value::Real(5.0));
    assert_eq!(Value::Real(5.0), Value::Integer(5));
    assert_ne!(Value::Integer(5), Value::Real(5.5));
}

#[test]
fn test_null_never_equals_non_null() {
    assert_ne!(Value::Null, Value::Integer(0));
    assert_ne!(Value::Null, Value::Text(String::new()));
    assert_ne!(Value::Boolean(false), Value::Null);
}

#[test]
fn test_ordering() {
    use std::cmp::Ordering;

    assert_eq!(
        Value::Integer(3).partial_cmp(&Value::Integer(5)),
        Some(Ordering::Less)
    );
    assert_eq!(
        Value::Integer(5).partial_cmp(&Value::Real(4.5)),
        Some(Ordering::Greater)
    );
    assert_eq!(
        Value::Text("a".to_string()).partial_cmp(&Value::Text("b".to_string())),
        Some(Ordering::Less)
    );
    // NULL sorts below everything
    assert_eq!(
        Value::Null.partial_cmp(&Value::Integer(i64::MIN)),
        Some(Ordering::Less)
    );
}

#[test]
fn test_coerce_to_number() {
    assert_eq!(Value::Integer(7).coerce_to_number(), Some(7.0));
    assert_eq!(Value::Real(2.5).coerce_to_number(), Some(2.5));
    assert_eq!(Value::Boolean(true).coerce_to_number(), Some(1.0));
    assert_eq!(Value::Text("3.5".to_string()).coerce_to_number(), Some(3.5));
    assert_eq!(Value::Text("sawit".to_string()).coerce_to_number(), None);
    assert_eq!(Value::Null.coerce_to_number(), None);
}

#[test]
fn test_timestamp_from_rfc3339() {
    let value = Value::timestamp_from_str("2022-01-01T12:30:45+00:00").unwrap();
    match value {
        Value::Timestamp(ts) => {
            assert_eq!(ts, Utc.with_ymd_and_hms(2022, 1, 1, 12, 30, 45).unwrap());
        }
        other => panic!("expected timestamp, got {:?}", other),
    }
}

#[test]
fn test_timestamp_from_datetime_string() {
    let value = Value::timestamp_from_str("2022-01-01 12:30:45").unwrap();
    match value {
        Value::Timestamp(ts) => {
            assert_eq!(ts, Utc.with_ymd_and_hms(2022, 1, 1, 12, 30, 45).unwrap());
        }
        other => panic!("expected timestamp, got {:?}", other),
    }
}

#[test]
fn test_timestamp_from_date_only() {
    let value = Value::timestamp_from_str("2022-01-01").unwrap();
    match value {
        Value::Timestamp(ts) => {
            assert_eq!(ts, Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap());
        }
        other => panic!("expected timestamp, got {:?}", other),
    }
}

#[test]
fn test_timestamp_parse_failure() {
    assert!(Value::timestamp_from_str("not a date").is_err());
}

#[test]
fn test_display() {
    assert_eq!(Value::Null.to_string(), "NULL");
    assert_eq!(Value::Integer(12).to_string(), "12");
    assert_eq!(Value::Boolean(false).to_string(), "FALSE");
    assert_eq!(Value::Text("Tenera".to_string()).to_string(), "Tenera");
}
