//! Value normalization rules
//!
//! Cell values arrive as raw JSON scalars. These helpers decide truthiness for
//! group extraction and coerce values into the representation the schema declares.

use serde_json::Value;

/// Default delimiter for list-encoded cells
pub const DEFAULT_LIST_DELIMITER: &str = ",";

/// Whether a cell counts as populated for group extraction.
///
/// Null, empty strings, zero, `false` and empty containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Whether a cell should fall back to the field default.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Render a scalar as text.
///
/// Integral floats drop their fractional part (`12.0` becomes `"12"`), which is
/// how spreadsheet exports usually carry whole numbers.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Coerce a value to a JSON string.
pub fn to_text(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        other => Value::String(text_of(other)),
    }
}

/// Split a delimiter-encoded cell into a list.
///
/// Strings are split, each piece trimmed and empty pieces dropped, so `""`
/// gives `[]`. Arrays are already lists and pass through untouched. Null is an
/// empty list; any other scalar becomes a one-element list of its text.
pub fn split_list(value: &Value, delimiter: &str) -> Value {
    match value {
        Value::String(s) => Value::Array(
            s.split(delimiter)
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(|piece| Value::String(piece.to_string()))
                .collect(),
        ),
        Value::Array(_) => value.clone(),
        Value::Null => Value::Array(Vec::new()),
        other => Value::Array(vec![to_text(other)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!("boleto")));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!(5)));
        assert!(is_truthy(&json!(true)));

        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!([])));
    }

    #[test]
    fn test_split_trims_and_drops_empty() {
        assert_eq!(split_list(&json!("A, B,C"), ","), json!(["A", "B", "C"]));
        assert_eq!(split_list(&json!(" A ,, ,B "), ","), json!(["A", "B"]));
        assert_eq!(split_list(&json!(""), ","), json!([]));
        assert_eq!(split_list(&Value::Null, ","), json!([]));
    }

    #[test]
    fn test_split_is_idempotent_on_lists() {
        let once = split_list(&json!("Canal A, Canal B"), ",");
        let twice = split_list(&once, ",");
        assert_eq!(once, twice);

        let reparsed: Value = serde_json::from_str(&once.to_string()).unwrap();
        assert_eq!(split_list(&reparsed, ","), once);
    }

    #[test]
    fn test_split_custom_delimiter() {
        assert_eq!(split_list(&json!("4G;5G"), ";"), json!(["4G", "5G"]));
        assert_eq!(split_list(&json!("4G,5G"), ";"), json!(["4G,5G"]));
    }

    #[test]
    fn test_split_non_string_scalar() {
        assert_eq!(split_list(&json!(42), ","), json!(["42"]));
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(to_text(&json!(12345678)), json!("12345678"));
        assert_eq!(to_text(&json!(12.0)), json!("12"));
        assert_eq!(to_text(&json!(99.9)), json!("99.9"));
        assert_eq!(to_text(&json!(true)), json!("true"));
        assert_eq!(to_text(&json!("texto")), json!("texto"));
        assert_eq!(to_text(&Value::Null), json!(""));
    }

    #[test]
    fn test_blank() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!("")));
        assert!(!is_blank(&json!(" ")));
        assert!(!is_blank(&json!(0)));
    }
}
