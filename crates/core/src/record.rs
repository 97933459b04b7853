//! Record representation and key derivation shared by the pipeline stages.

use serde_json::Value;

/// A record as read from the source, before any transform.
pub type RawRecord = Value;

/// Derive the store key suffix for a record.
///
/// Uses the value of `id_field` when it is present and scalar; otherwise
/// falls back to the record's 1-based position in the source.
pub fn record_key(record: &Value, id_field: Option<&str>, position: u64) -> String {
    if let Some(field) = id_field {
        match record.get(field) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            Some(Value::Bool(b)) => return b.to_string(),
            _ => {}
        }
    }
    position.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_from_id_field() {
        let rec = json!({"productId": "P-1", "n": 7});
        assert_eq!(record_key(&rec, Some("productId"), 3), "P-1");
        assert_eq!(record_key(&rec, Some("n"), 3), "7");
    }

    #[test]
    fn key_falls_back_to_position() {
        let rec = json!({"nested": {"a": 1}, "empty": ""});
        assert_eq!(record_key(&rec, None, 5), "5");
        assert_eq!(record_key(&rec, Some("missing"), 5), "5");
        assert_eq!(record_key(&rec, Some("nested"), 5), "5");
        assert_eq!(record_key(&rec, Some("empty"), 5), "5");
    }
}
