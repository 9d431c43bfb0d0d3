//! Lenient cell coercion for spreadsheet exports.
//!
//! Cells arrive as whatever the export produced: strings with currency
//! symbols and thousands separators, bare numbers, blanks or `N/A`. These
//! helpers never fail; anything unusable becomes `None`.

use super::Record;
use chrono::{Days, NaiveDate};
use serde_json::Value;

/// Days between the spreadsheet epoch (1899-12-30) and 1970-01-01.
pub const EXCEL_UNIX_EPOCH_OFFSET: f64 = 25569.0;

const NOT_AVAILABLE: &str = "N/A";

/// Text form of a cell.
///
/// Null, `""` and `"N/A"` are `None`. Integral numbers render without a
/// trailing `.0`. The result is trimmed.
pub fn safe_string(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Number(n) => render_number(n),
        other => other.to_string(),
    };
    if text.is_empty() || text == NOT_AVAILABLE {
        return None;
    }
    Some(text.trim().to_string())
}

/// Leading integer of a cell after dropping everything but digits and `-`.
///
/// `"$1,250"` is 1250, `"12-34"` is 12, `"abc"` is `None`.
pub fn safe_int(value: Option<&Value>) -> Option<i64> {
    let text = raw_text(value?)?;
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    let end = numeric_prefix(&cleaned, false);
    cleaned[..end].parse().ok()
}

/// Leading decimal of a cell after dropping everything but digits, `.`
/// and `-`.
///
/// `"$1,234.50"` is 1234.5, `"1.2.3"` is 1.2.
pub fn safe_float(value: Option<&Value>) -> Option<f64> {
    let text = raw_text(value?)?;
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let end = numeric_prefix(&cleaned, true);
    cleaned[..end].parse().ok()
}

/// Calendar date for a spreadsheet serial day number.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    let days = (serial - EXCEL_UNIX_EPOCH_OFFSET).floor();
    if days >= 0.0 {
        epoch.checked_add_days(Days::new(days as u64))
    } else {
        epoch.checked_sub_days(Days::new((-days) as u64))
    }
}

/// Value of the first listed field that holds something.
///
/// Alternatives that are missing, null, empty, zero or `false` are passed
/// over, so `first_present(r, &["PROPERTY_ADDRESS", "Address"])` falls back
/// to `Address` when the first column is blank. The last field is taken as
/// it is: a lone `0` column still reads as zero.
pub fn first_present<'a>(record: &'a Record, fields: &[&str]) -> Option<&'a Value> {
    let (last, alternatives) = fields.split_last()?;
    alternatives
        .iter()
        .filter_map(|f| record.get(*f))
        .find(|v| is_present(v))
        .or_else(|| record.get(*last))
}

/// [`safe_string`] over the first present field.
pub fn first_string(record: &Record, fields: &[&str]) -> Option<String> {
    safe_string(first_present(record, fields))
}

/// [`safe_float`] over the first present field.
pub fn first_float(record: &Record, fields: &[&str]) -> Option<f64> {
    safe_float(first_present(record, fields))
}

/// [`safe_int`] over the first present field.
pub fn first_int(record: &Record, fields: &[&str]) -> Option<i64> {
    safe_int(first_present(record, fields))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        _ => true,
    }
}

fn raw_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(render_number(n)),
        other => Some(other.to_string()),
    }
}

fn render_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Byte length of the leading `-?digits[.digits]` run, or 0 when it holds
/// no digit.
fn numeric_prefix(s: &str, allow_fraction: bool) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if allow_fraction && i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if digits > 0 || j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }

    if digits == 0 {
        0
    } else {
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s(v: Value) -> Option<String> {
        safe_string(Some(&v))
    }

    fn i(v: Value) -> Option<i64> {
        safe_int(Some(&v))
    }

    fn f(v: Value) -> Option<f64> {
        safe_float(Some(&v))
    }

    #[test]
    fn test_safe_string() {
        assert_eq!(safe_string(None), None);
        assert_eq!(s(Value::Null), None);
        assert_eq!(s(json!("")), None);
        assert_eq!(s(json!("N/A")), None);
        assert_eq!(s(json!("  1200 Main St ")), Some("1200 Main St".to_string()));
        assert_eq!(s(json!(77002)), Some("77002".to_string()));
        assert_eq!(s(json!(77002.0)), Some("77002".to_string()));
        assert_eq!(s(json!(2.5)), Some("2.5".to_string()));
        assert_eq!(s(json!(true)), Some("true".to_string()));
    }

    #[test]
    fn test_safe_string_trims_after_placeholder_check() {
        // Only the exact placeholder is rejected
        assert_eq!(s(json!(" N/A ")), Some("N/A".to_string()));
        assert_eq!(s(json!("   ")), Some(String::new()));
    }

    #[test]
    fn test_safe_int() {
        assert_eq!(i(json!("$1,250")), Some(1250));
        assert_eq!(i(json!("-42 units")), Some(-42));
        assert_eq!(i(json!("12-34")), Some(12));
        assert_eq!(i(json!("abc")), None);
        assert_eq!(i(json!("-")), None);
        assert_eq!(i(json!("")), None);
        assert_eq!(i(json!(1985)), Some(1985));
        assert_eq!(safe_int(None), None);
    }

    #[test]
    fn test_safe_float() {
        assert_eq!(f(json!("$1,234.50")), Some(1234.5));
        assert_eq!(f(json!("1.2.3")), Some(1.2));
        assert_eq!(f(json!("-.5")), Some(-0.5));
        assert_eq!(f(json!("43,560 sqft")), Some(43560.0));
        assert_eq!(f(json!(".")), None);
        assert_eq!(f(json!("N/A")), None);
        assert_eq!(f(json!(0.98)), Some(0.98));
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(
            excel_serial_to_date(25569.0),
            NaiveDate::from_ymd_opt(1970, 1, 1)
        );
        assert_eq!(
            excel_serial_to_date(43831.0),
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );
        assert_eq!(
            excel_serial_to_date(43831.75),
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );
        assert_eq!(
            excel_serial_to_date(25568.0),
            NaiveDate::from_ymd_opt(1969, 12, 31)
        );
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_first_present_skips_blank_fields() {
        let record = json!({
            "PROPERTY_ADDRESS": "",
            "Address": null,
            "SITE_ADDR": "500 Bagby St",
            "MARKET_VALUE": 0,
            "LAND_VALUE": "120000",
        });
        let record = record.as_object().unwrap();

        assert_eq!(
            first_string(record, &["PROPERTY_ADDRESS", "Address", "SITE_ADDR"]),
            Some("500 Bagby St".to_string())
        );
        assert_eq!(first_float(record, &["MARKET_VALUE", "LAND_VALUE"]), Some(120000.0));
        assert_eq!(first_int(record, &["MISSING"]), None);
    }

    #[test]
    fn test_first_present_keeps_zero_in_last_field() {
        let record = json!({
            "IMPROVEMENT_VALUE": 0,
            "MARKET_VALUE": 0.0,
            "VACANT": false,
            "Address": "",
        });
        let record = record.as_object().unwrap();

        assert_eq!(first_float(record, &["IMPROVEMENT_VALUE"]), Some(0.0));
        assert_eq!(first_float(record, &["MISSING", "MARKET_VALUE"]), Some(0.0));
        assert_eq!(first_int(record, &["IMPROVEMENT_VALUE", "MISSING"]), None);
        assert_eq!(first_string(record, &["VACANT"]), Some("false".to_string()));
        assert_eq!(first_string(record, &["Address"]), None);
        assert_eq!(first_present(record, &[]), None);
    }
}
