use std::sync::OnceLock;

use chrono::{NaiveDate, TimeDelta};
use regex::Regex;

use crate::models::RawCell;

const UNIT_MARKERS: [char; 2] = ['원', '₩'];

/// Largest magnitude accepted as an amount (100 trillion won). Anything
/// bigger is treated as malformed, which keeps ledger sums far from overflow.
pub const MAX_AMOUNT: i64 = 100_000_000_000_000;

/// Last spreadsheet serial chrono can place on the calendar (9999-12-31).
pub const MAX_SERIAL: f64 = 2_958_465.0;

pub fn is_plausible_serial(serial: f64) -> bool {
    (1.0..=MAX_SERIAL).contains(&serial)
}

/// Convert a raw cell into whole won. Malformed input yields 0.
pub fn normalize_amount(raw: &RawCell) -> i64 {
    match raw {
        RawCell::Empty => 0,
        RawCell::Int(i) => bounded(*i as f64),
        RawCell::Float(f) | RawCell::Serial(f) => bounded(*f),
        RawCell::Text(s) => parse_amount(s),
    }
}

fn bounded(v: f64) -> i64 {
    if v.is_finite() && v.abs() <= MAX_AMOUNT as f64 {
        v.trunc() as i64
    } else {
        tracing::debug!("amount {v} out of range, using 0");
        0
    }
}

pub fn parse_amount(raw: &str) -> i64 {
    let s: String = raw
        .replace(',', "")
        .chars()
        .filter(|c| !c.is_whitespace() && !UNIT_MARKERS.contains(c))
        .collect();
    if s.contains('-') {
        return -parse_number(&s.replace('-', "")).abs();
    }
    parse_number(&s)
}

fn parse_number(s: &str) -> i64 {
    match s.parse::<f64>() {
        Ok(v) => bounded(v),
        Err(_) => {
            tracing::debug!("unparseable amount {s:?}, using 0");
            0
        }
    }
}

struct DatePattern {
    re: Regex,
    format: &'static str,
}

fn date_patterns() -> &'static [DatePattern] {
    static PATTERNS: OnceLock<Vec<DatePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$", "%Y-%m-%d %H:%M:%S"),
            (r"^\d{4}\.\d{2}\.\d{2} \d{2}:\d{2}:\d{2}$", "%Y.%m.%d %H:%M:%S"),
            (r"^\d{4}-\d{2}-\d{2}$", "%Y-%m-%d"),
            (r"^\d{4}\.\d{2}\.\d{2}$", "%Y.%m.%d"),
        ]
        .into_iter()
        .map(|(pattern, format)| DatePattern {
            re: Regex::new(pattern).expect("static date pattern"),
            format,
        })
        .collect()
    })
}

/// Canonicalize a date cell to `YYYY-MM-DD`. Strings matching none of the
/// supported layouts come back trimmed but otherwise unchanged.
pub fn normalize_date(raw: &RawCell) -> Option<String> {
    match raw {
        RawCell::Empty => None,
        RawCell::Serial(serial) => Some(excel_serial_to_date(*serial).unwrap_or_else(|| {
            tracing::debug!("serial {serial} is not a calendar date, keeping as-is");
            raw.text()
        })),
        RawCell::Int(_) | RawCell::Float(_) => Some(raw.text()),
        RawCell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            Some(parse_date(s))
        }
    }
}

pub fn parse_date(s: &str) -> String {
    for pattern in date_patterns() {
        if !pattern.re.is_match(s) {
            continue;
        }
        let parsed = if pattern.format.contains("%H") {
            chrono::NaiveDateTime::parse_from_str(s, pattern.format).map(|dt| dt.date())
        } else {
            NaiveDate::parse_from_str(s, pattern.format)
        };
        if let Ok(date) = parsed {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    tracing::debug!("unrecognized date {s:?}, keeping as-is");
    s.to_string()
}

/// `None` for serials outside the calendar range.
pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    if !is_plausible_serial(serial) {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_signed(TimeDelta::try_days(serial.trunc() as i64)?)?;
    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fmt::won;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(normalize_amount(&text("1,234,567")), 1234567);
        assert_eq!(normalize_amount(&text("50,000원")), 50000);
        assert_eq!(normalize_amount(&text(" 3 000 ")), 3000);
        assert_eq!(normalize_amount(&text("1234.9")), 1234);
        assert_eq!(normalize_amount(&text("not_a_number")), 0);
        assert_eq!(normalize_amount(&RawCell::Empty), 0);
    }

    #[test]
    fn test_parse_amount_minus_anywhere() {
        assert_eq!(normalize_amount(&text("-10,000")), -10000);
        assert_eq!(normalize_amount(&text("10,000-")), -10000);
        assert_eq!(normalize_amount(&text("- 500원")), -500);
    }

    #[test]
    fn test_numeric_cells_truncate() {
        assert_eq!(normalize_amount(&RawCell::Int(7000)), 7000);
        assert_eq!(normalize_amount(&RawCell::Float(7000.99)), 7000);
        assert_eq!(normalize_amount(&RawCell::Float(-250.5)), -250);
    }

    #[test]
    fn test_amount_inverts_formatting() {
        for n in [1, 999, 1000, 50000, 1234567, 987654321] {
            assert_eq!(normalize_amount(&text(&won(n))), n);
            assert_eq!(normalize_amount(&text(&format!("{}원", won(n).trim_start_matches('₩')))), n);
        }
    }

    #[test]
    fn test_parse_date_patterns() {
        assert_eq!(normalize_date(&text("2025-03-05 14:22:01")).as_deref(), Some("2025-03-05"));
        assert_eq!(normalize_date(&text("2025.03.05 09:00:00")).as_deref(), Some("2025-03-05"));
        assert_eq!(normalize_date(&text("2025-03-05")).as_deref(), Some("2025-03-05"));
        assert_eq!(normalize_date(&text(" 2025.03.05 ")).as_deref(), Some("2025-03-05"));
    }

    #[test]
    fn test_parse_date_is_idempotent() {
        for raw in ["2025-03-05 14:22:01", "2025.12.31", "2024-02-29", "3/5/2025"] {
            let once = normalize_date(&text(raw)).unwrap();
            let twice = normalize_date(&text(&once)).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_unmatched_date_passes_through() {
        assert_eq!(normalize_date(&text("  3/5/2025 ")).as_deref(), Some("3/5/2025"));
        assert_eq!(normalize_date(&text("2025-13-40")).as_deref(), Some("2025-13-40"));
        assert_eq!(normalize_date(&RawCell::Empty), None);
        assert_eq!(normalize_date(&text("   ")), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0).as_deref(), Some("2025-01-10"));
        assert_eq!(normalize_date(&RawCell::Serial(45721.6)).as_deref(), Some("2025-03-05"));
    }

    #[test]
    fn test_out_of_range_serial_keeps_text() {
        assert_eq!(excel_serial_to_date(20250305.0), None);
        assert_eq!(normalize_date(&RawCell::Serial(20250305.0)).as_deref(), Some("20250305"));
        assert_eq!(
            normalize_date(&RawCell::Serial(202503051200.0)).as_deref(),
            Some("202503051200")
        );
        assert_eq!(excel_serial_to_date(-3.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_unrepresentable_amounts_are_zero() {
        assert_eq!(normalize_amount(&RawCell::Float(-1e19)), 0);
        assert_eq!(normalize_amount(&RawCell::Float(f64::INFINITY)), 0);
        assert_eq!(normalize_amount(&RawCell::Int(i64::MIN)), 0);
        assert_eq!(normalize_amount(&text("-99999999999999999999")), 0);
        assert_eq!(normalize_amount(&RawCell::Int(MAX_AMOUNT)), MAX_AMOUNT);
        assert_eq!(normalize_amount(&RawCell::Float(-(MAX_AMOUNT as f64))), -MAX_AMOUNT);
    }
}
