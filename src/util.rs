// Utility helpers for coercion, rounding and formatting.
//
// Every percentage the crate produces goes through `rate_percent` or
// `round2`, so the zero-denominator and rounding rules live in one place.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use std::io::BufRead;

/// Date layouts seen in the inspection exports, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters other than an
///   exponent marker, so `1e3` parses while `NaN`, `inf` and `n/a` do not.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a cell into an integer count: parse as number, floor, and fall
/// back to 0 when the cell is missing or unparseable. Negative values are
/// kept as they are.
pub fn coerce_int(s: Option<&str>) -> i64 {
    parse_f64_safe(s).map(|v| v.floor() as i64).unwrap_or(0)
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    // Spreadsheet exports sometimes carry a time part; only the date matters.
    let day = s.split_whitespace().next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

/// Read one line, trimmed. `None` once the reader is exhausted or fails,
/// so an interactive loop can stop instead of spinning on closed stdin.
pub fn read_trimmed_line<R: BufRead>(reader: &mut R) -> Option<String> {
    let mut buf = String::new();
    match reader.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Round to exactly two decimals, half away from zero.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `numerator / denominator * 100`, rounded to two decimals.
///
/// A zero denominator yields `0.0`, never NaN or infinity.
pub fn rate_percent(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64 * 100.0)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234.56`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Percentage cell text such as `12.50%`.
pub fn format_percent(p: f64) -> String {
    format!("{}%", format_number(p, 2))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
