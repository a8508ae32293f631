//! Test assertions for captured log records.

use serde_json::Value;

use crate::logging::LogRecord;

/// Asserts that the record carries `key` with the expected value.
pub fn assert_field(record: &LogRecord, key: &str, expected: &Value) {
    let actual = record.field(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected value {expected} for key '{key}', got {actual:?}"
    );
}

/// Asserts that the record does not carry `key`.
pub fn assert_no_field(record: &LogRecord, key: &str) {
    assert!(
        record.field(key).is_none(),
        "Expected no '{key}' field, got {:?}",
        record.field(key)
    );
}

/// Asserts that the `event` fields of `records` are exactly `expected`.
pub fn assert_events(records: &[LogRecord], expected: &[&str]) {
    let events: Vec<&str> = records
        .iter()
        .filter_map(|r| r.field("event").and_then(Value::as_str))
        .collect();
    assert_eq!(events, expected, "Unexpected event sequence");
}

/// Asserts that the record has a numeric `duration_ms`.
pub fn assert_timed(record: &LogRecord) {
    assert!(
        record.field("duration_ms").is_some_and(Value::is_number),
        "Expected a numeric duration_ms, got {:?}",
        record.field("duration_ms")
    );
}
