//! Conversions between serde types and JSON values.

use serde::de::DeserializeOwned;
use serde::Serialize;
use stowage_core_store::{Error, Result};

/// Convert a JSON value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::deserialization(e.to_string()))
}

/// Convert a Rust type to a JSON value via serde.
pub fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<serde_json::Value> {
    serde_json::to_value(data).map_err(|e| Error::serialization("record", e.to_string()))
}

/// Join `elements` onto a stored record.
///
/// An array gets the elements appended; any other record becomes the first
/// element of a new array.
pub fn append_records(
    existing: Option<serde_json::Value>,
    elements: Vec<serde_json::Value>,
) -> serde_json::Value {
    let mut records = match existing {
        Some(serde_json::Value::Array(records)) => records,
        Some(record) => vec![record],
        None => Vec::with_capacity(elements.len()),
    };
    records.extend(elements);
    serde_json::Value::Array(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Message {
        body: String,
        read: bool,
    }

    #[test]
    fn roundtrip_struct() {
        let original = Message {
            body: "hello".to_string(),
            read: true,
        };

        let value = to_value(&original).unwrap();
        let recovered: Message = from_value(value).unwrap();

        assert_eq!(original, recovered);
    }

    #[test]
    fn wrong_shape_is_a_deserialization_error() {
        let result: Result<Message> = from_value(json!([1, 2, 3]));
        assert!(matches!(result, Err(Error::Deserialization { .. })));
    }

    #[test]
    fn non_string_map_keys_fail_to_serialize() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], "x");
        assert!(matches!(to_value(&map), Err(Error::Serialization { .. })));
    }

    #[test]
    fn append_to_nothing() {
        assert_eq!(append_records(None, vec![json!(1)]), json!([1]));
    }

    #[test]
    fn append_to_array() {
        assert_eq!(
            append_records(Some(json!([1, 2])), vec![json!(3), json!(4)]),
            json!([1, 2, 3, 4])
        );
    }

    #[test]
    fn append_promotes_single_record() {
        assert_eq!(
            append_records(Some(json!({ "a": 1 })), vec![json!({ "a": 2 })]),
            json!([{ "a": 1 }, { "a": 2 }])
        );
    }
}
