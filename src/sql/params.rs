//! Convert serde_json::Value to text parameters.
//!
//! Tenant column types are only known at call time, so every value is bound as text
//! and cast in SQL to the column's catalog type (`$n::text::<type>`).

use serde_json::Value;

/// Text form of a JSON value, or `None` for SQL NULL. Arrays and objects are sent as JSON text.
pub fn to_text_param(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}

/// Placeholder with a cast through text to the target type.
pub fn cast_placeholder(n: usize, data_type: &str) -> String {
    format!("${}::text::{}", n, data_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_become_their_text_form() {
        assert_eq!(to_text_param(&json!(42)), Some("42".into()));
        assert_eq!(to_text_param(&json!(true)), Some("true".into()));
        assert_eq!(to_text_param(&json!("abc")), Some("abc".into()));
        assert_eq!(to_text_param(&Value::Null), None);
    }

    #[test]
    fn documents_become_json_text() {
        assert_eq!(to_text_param(&json!({"a": 1})), Some(r#"{"a":1}"#.into()));
    }
}
