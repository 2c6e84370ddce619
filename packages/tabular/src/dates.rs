//! Lenient date parsing for price-monitoring sources.

use chrono::{Days, NaiveDate};
use serde_json::Value;

/// Day zero of the spreadsheet serial date system (1900 system, including
/// the phantom 1900-02-29).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial accepted (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses a date cell.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY`, ISO date-times (the
/// date part is kept), `YYYY-MM` (first of month) and spreadsheet serial
/// day numbers. Anything else is `None`.
#[must_use]
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => from_serial(n.as_f64()?),
        Value::String(s) => parse_date_text(s),
        _ => None,
    }
}

/// Parses date text. See [`parse_date`].
#[must_use]
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    {
        return Some(date);
    }

    // Date-time: keep the calendar date as written.
    if text.len() > 10 && text.is_char_boundary(10) {
        let (date, rest) = text.split_at(10);
        if rest.starts_with('T') || rest.starts_with(' ') {
            return NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
        }
    }

    if text.len() == 7 {
        return NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d").ok();
    }

    None
}

/// Converts a spreadsheet serial day number (fraction = time of day).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.floor() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn parses_common_text_formats() {
        assert_eq!(parse_date(&json!("2024-01-15")), date(2024, 1, 15));
        assert_eq!(parse_date(&json!(" 2024/01/15 ")), date(2024, 1, 15));
        assert_eq!(parse_date(&json!("01/15/2024")), date(2024, 1, 15));
        assert_eq!(parse_date(&json!("2024-01")), date(2024, 1, 1));
    }

    #[test]
    fn keeps_date_part_of_datetimes() {
        assert_eq!(parse_date(&json!("2024-01-15T00:00:00Z")), date(2024, 1, 15));
        assert_eq!(parse_date(&json!("2024-01-15 13:45:00")), date(2024, 1, 15));
        assert_eq!(parse_date(&json!("2024-01-15T23:00:00+05:00")), date(2024, 1, 15));
    }

    #[test]
    fn parses_spreadsheet_serials() {
        assert_eq!(parse_date(&json!(45306)), date(2024, 1, 15));
        assert_eq!(parse_date(&json!(45306.75)), date(2024, 1, 15));
        assert_eq!(parse_date(&json!(-3)), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(&json!("not a date")), None);
        assert_eq!(parse_date(&json!("2024-13-01")), None);
        assert_eq!(parse_date(&json!("")), None);
        assert_eq!(parse_date(&Value::Null), None);
        assert_eq!(parse_date(&json!(true)), None);
    }
}
