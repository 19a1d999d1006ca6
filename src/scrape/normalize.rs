//! Coercion of locale-formatted cell text into typed values.
//!
//! Only the day-first, comma-grouped convention used by the Brazilian site is
//! understood. Anything else becomes `FieldValue::Null`; a bad field never
//! costs the rest of its record.

use crate::models::{FieldKind, FieldValue, NormalizedRecord, ParsedRow};
use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate, Utc};
use std::str::FromStr;

/// Parses `day<sep>month<sep>year` with `/`, `.` or `-` as separator.
///
/// A four-digit first component is read year-first (`2024-03-05`), two-digit
/// years land within 50 years of the current one, and a trailing annotation
/// such as `(Fev)` on calendar rows is ignored.
pub fn coerce_date(text: &str) -> Option<NaiveDate> {
    coerce_date_near(text, Utc::now().year())
}

fn coerce_date_near(text: &str, this_year: i32) -> Option<NaiveDate> {
    let text = strip_annotation(text.trim());

    let sep = text.chars().find(|c| !c.is_ascii_digit())?;
    if !matches!(sep, '/' | '.' | '-') {
        return None;
    }

    let parts: Vec<&str> = text.split(sep).collect();
    if parts.len() != 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let (day, month, year) = if parts[0].len() == 4 {
        (parts[2], parts[1], parts[0])
    } else {
        (parts[0], parts[1], parts[2])
    };

    if day.len() > 2 || month.len() > 2 {
        return None;
    }

    let year: i32 = match year.len() {
        2 => expand_short_year(year.parse().ok()?, this_year),
        4 => year.parse().ok()?,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Two-digit years go to the century that puts them within 50 years of
/// `this_year`: in 2026, `23` is 2023 and `99` is 1999.
fn expand_short_year(short: i32, this_year: i32) -> i32 {
    let year = this_year - this_year.rem_euclid(100) + short;
    if year >= this_year + 50 {
        year - 100
    } else if year < this_year - 50 {
        year + 100
    } else {
        year
    }
}

/// Strips thousands separators and parses a plain decimal (optional sign,
/// digits, at most one point), keeping its written scale.
pub fn coerce_number(text: &str) -> Option<BigDecimal> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if !is_plain_decimal(&cleaned) {
        return None;
    }
    BigDecimal::from_str(&cleaned).ok()
}

fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    match frac {
        None => !int.is_empty() && digits(int),
        Some(frac) => !frac.is_empty() && digits(int) && digits(frac),
    }
}

pub fn coerce(kind: FieldKind, text: &str) -> FieldValue {
    let value = match kind {
        FieldKind::Date => coerce_date(text).map(FieldValue::Date),
        FieldKind::Number => coerce_number(text).map(FieldValue::Number),
        FieldKind::Text => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| FieldValue::Text(trimmed.to_string()))
        }
    };
    value.unwrap_or(FieldValue::Null)
}

pub fn normalize_row(row: ParsedRow) -> NormalizedRecord {
    NormalizedRecord::new(
        row.fields
            .into_iter()
            .map(|f| (f.name, coerce(f.kind, &f.text)))
            .collect(),
    )
}

fn strip_annotation(text: &str) -> &str {
    match text.find('(') {
        Some(idx) if text.ends_with(')') => text[..idx].trim_end(),
        _ => text,
    }
}
