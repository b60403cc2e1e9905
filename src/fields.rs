//! Display formatting for extracted field values.
//!
//! Values vary by field: strings, numbers, lists, nested objects, or null.
//! The review screen renders them all through `format_value`, which is
//! idempotent so already-formatted strings pass through untouched.

use serde_json::Value;

/// Metadata keys stripped from object values before display.
pub const INTERNAL_KEYS: [&str; 4] = ["confidence", "missing_reason", "quotes", "source_locations"];

/// Shown for null values and for objects with nothing left after
/// stripping metadata.
pub const NOT_REPORTED: &str = "Not reported";

/// Render a stored value for display.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => NOT_REPORTED.to_string(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => {
            let remainder: serde_json::Map<String, Value> = map
                .iter()
                .filter(|(k, _)| !INTERNAL_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if remainder.is_empty() {
                NOT_REPORTED.to_string()
            } else {
                serde_json::to_string(&Value::Object(remainder))
                    .unwrap_or_else(|_| NOT_REPORTED.to_string())
            }
        }
    }
}

/// Display form of a field's stored value.
pub fn display_value(field: &crate::models::ExtractedField) -> String {
    format_value(&field.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_formats_as_not_reported() {
        assert_eq!(format_value(&Value::Null), "Not reported");
    }

    #[test]
    fn booleans_format_as_yes_no() {
        assert_eq!(format_value(&json!(true)), "Yes");
        assert_eq!(format_value(&json!(false)), "No");
    }

    #[test]
    fn numbers_keep_natural_form() {
        assert_eq!(format_value(&json!(240)), "240");
        assert_eq!(format_value(&json!(0.05)), "0.05");
    }

    #[test]
    fn arrays_join_recursively() {
        assert_eq!(
            format_value(&json!(["aspirin", 81, true])),
            "aspirin, 81, Yes"
        );
        assert_eq!(format_value(&json!([["a", "b"], "c"])), "a, b, c");
    }

    #[test]
    fn objects_strip_metadata_keys() {
        let v = json!({
            "confidence": "high",
            "missing_reason": null,
            "quotes": ["q"],
            "source_locations": [],
            "dose": "81 mg"
        });
        assert_eq!(format_value(&v), r#"{"dose":"81 mg"}"#);
    }

    #[test]
    fn object_empty_after_strip_is_not_reported() {
        let v = json!({"confidence": "low", "quotes": []});
        assert_eq!(format_value(&v), "Not reported");
    }

    #[test]
    fn formatting_is_idempotent() {
        let inputs = [
            json!(null),
            json!(true),
            json!(12.5),
            json!("multicentre RCT"),
            json!(["a", 1]),
            json!({"confidence": "low"}),
        ];
        for input in inputs {
            let once = format_value(&input);
            let twice = format_value(&Value::String(once.clone()));
            assert_eq!(once, twice);
        }
    }
}
