//! Conversions from loosely-typed cell values.
//!
//! Cells come from CSV text, spreadsheet numbers, or `GeoJSON` properties,
//! so all of them are carried as [`serde_json::Value`].

use serde_json::Value;

/// Renders a cell as an admin-code join key: trimmed and upper-cased.
///
/// Integral numbers render without a fractional part (`101.0` -> `"101"`).
/// Returns `None` for null, empty, or structured cells.
#[must_use]
pub fn admin_code_from_value(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(_) => cell_as_text(value)?,
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };

    if raw.is_empty() {
        None
    } else {
        Some(raw.to_uppercase())
    }
}

/// Reads a cell as a finite `f64`.
///
/// Numeric text is accepted (surrounding whitespace and `,` thousands
/// separators are ignored). Anything else is `None`.
#[must_use]
pub fn cell_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

/// Reads a cell as display text. Null and structured cells are `None`.
#[must_use]
pub fn cell_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.as_i64().map_or_else(
            || {
                n.as_u64().map_or_else(
                    || n.as_f64().map_or_else(String::new, format_float),
                    |u| u.to_string(),
                )
            },
            |i| i.to_string(),
        )),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[allow(clippy::float_cmp)]
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn admin_code_is_trimmed_and_uppercased() {
        assert_eq!(
            admin_code_from_value(&json!("  pk0101 ")).as_deref(),
            Some("PK0101")
        );
    }

    #[test]
    fn integral_numeric_codes_drop_fraction() {
        assert_eq!(admin_code_from_value(&json!(101.0)).as_deref(), Some("101"));
        assert_eq!(admin_code_from_value(&json!(42)).as_deref(), Some("42"));
    }

    #[test]
    fn empty_codes_are_none() {
        assert!(admin_code_from_value(&json!("   ")).is_none());
        assert!(admin_code_from_value(&Value::Null).is_none());
    }

    #[test]
    fn parses_numeric_text() {
        assert_eq!(cell_as_f64(&json!(" 1,250.5 ")), Some(1250.5));
        assert_eq!(cell_as_f64(&json!(3)), Some(3.0));
        assert_eq!(cell_as_f64(&json!("n/a")), None);
        assert_eq!(cell_as_f64(&json!("")), None);
        assert_eq!(cell_as_f64(&json!(true)), None);
    }

    #[test]
    fn renders_text_cells() {
        assert_eq!(cell_as_text(&json!(2.5)).as_deref(), Some("2.5"));
        assert_eq!(cell_as_text(&json!("Wheat")).as_deref(), Some("Wheat"));
        assert!(cell_as_text(&Value::Null).is_none());
    }
}
