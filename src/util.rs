// Utility helpers for lenient number parsing and display formatting.
//
// CSV uploads come from spreadsheets of varying quality, so everything here
// degrades to a default instead of failing. Callers decide whether a miss
// becomes `0` (well records) or a gap (price and log series).
use num_format::{Locale, ToFormattedString};

/// Longest numeric prefix of `s` after trimming, as accepted by the
/// integer/float parsers below. Returns `None` when no digit is present.
fn numeric_prefix(s: &str, allow_fraction: bool) -> Option<&str> {
    let s = s.trim();
    let bytes = s.as_bytes();
    let mut end = 0usize;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut saw_digit = end > digits_start;
    if allow_fraction && end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > end + 1 || saw_digit {
            saw_digit |= frac_end > end + 1;
            end = frac_end;
        }
    }
    if !saw_digit {
        return None;
    }
    if allow_fraction && end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    Some(&s[..end])
}

/// Parse the leading integer of a string (`"1250.7"` → 1250, `"12 bpd"` → 12).
///
/// Anything without a leading digit yields `None`.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    numeric_prefix(s, false)?.parse::<i64>().ok()
}

/// Parse the leading float of a string (`"22.1%"` → 22.1).
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    numeric_prefix(s, true)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse a cell from a spreadsheet export: trims, strips thousands
/// separators and rejects anything alphabetic.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Keep only characters that can take part in a plain decimal number, then
/// parse (`"12,500 BOE"` → 12500).
pub fn parse_stripped_f64(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; 0 for an empty slice so KPIs never show NaN.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Filter key for a field name: lowercase, each whitespace char becomes `-`.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus locale-aware thousands separators
    // (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
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

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Signed percentage for table cells: `+1.5%`, `-0.3%`, `0%`.
pub fn format_signed_pct(v: f64) -> String {
    if v > 0.0 {
        format!("+{}%", v)
    } else {
        format!("{}%", v)
    }
}
