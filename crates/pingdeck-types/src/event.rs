use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Delivery state of an event. Written once at creation (`Pending`) and
/// updated exactly once after the delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Failed => "FAILED",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "DELIVERED" => DeliveryStatus::Delivered,
            "FAILED" => DeliveryStatus::Failed,
            _ => DeliveryStatus::Pending,
        }
    }
}

/// A single scalar value in an event's field bag.
///
/// Numbers keep their JSON representation (`serde_json::Number`) so that `2`
/// stringifies as `"2"` and `2.5` as `"2.5"` without a float round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Insertion-ordered mapping of field name to scalar value. The render order
/// of an event's fields is the order the caller sent them in.
pub type FieldMap = IndexMap<String, FieldValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [DeliveryStatus::Pending, DeliveryStatus::Delivered, DeliveryStatus::Failed] {
            assert_eq!(DeliveryStatus::from_db(status.as_str()), status);
        }
        assert_eq!(DeliveryStatus::from_db(""), DeliveryStatus::Pending);
    }

    #[test]
    fn field_map_preserves_insertion_order() {
        let map: FieldMap = serde_json::from_str(r#"{"a": "1", "b": 2, "c": true}"#).unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        let values: Vec<String> = map.values().map(|v| v.to_string()).collect();
        assert_eq!(values, vec!["1", "2", "true"]);
    }

    #[test]
    fn untagged_scalars() {
        let v: FieldValue = serde_json::from_str("\"hi\"").unwrap();
        assert_eq!(v, FieldValue::String("hi".into()));

        let v: FieldValue = serde_json::from_str("3.25").unwrap();
        assert_eq!(v.to_string(), "3.25");

        let v: FieldValue = serde_json::from_str("false").unwrap();
        assert_eq!(v, FieldValue::Bool(false));

        // Objects and arrays are not scalars
        assert!(serde_json::from_str::<FieldValue>("{}").is_err());
        assert!(serde_json::from_str::<FieldValue>("[1]").is_err());
    }

    #[test]
    fn field_map_serializes_in_order() {
        let map: FieldMap = serde_json::from_str(r#"{"z": 1, "a": 2}"#).unwrap();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"z":1,"a":2}"#);
    }
}
