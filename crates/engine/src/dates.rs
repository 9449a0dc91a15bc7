//! Date normalization for irregular source sheets.
//!
//! Source publications encode the same time point in several incompatible
//! ways: plain years, roman-numeral quarters ("III 24"), Spanish month codes
//! ("Ene-24") and ordinary calendar dates. Everything resolves to one
//! `NaiveDate`; period codes always land on the last day of the period.
//!
//! Resolution is an ordered rule table. The first rule whose pattern matches
//! decides the result, including an unparseable one.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::cell::CellValue;

/// Day-precision join key shared by every table in the store.
pub type CanonicalDate = NaiveDate;

/// A raw date as found in a source cell. Borrowed, never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateToken<'a> {
    Text(&'a str),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl<'a> DateToken<'a> {
    pub fn from_cell(cell: &'a CellValue) -> Self {
        match cell {
            CellValue::Empty => DateToken::Missing,
            CellValue::Number(n) => DateToken::Number(*n),
            CellValue::Text(s) => DateToken::Text(s),
            CellValue::Date(d) => DateToken::Date(*d),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

struct DateRule {
    name: &'static str,
    matches: fn(&str) -> bool,
    resolve: fn(&str) -> Option<NaiveDate>,
}

const RULES: &[DateRule] = &[
    DateRule { name: "year", matches: is_year, resolve: resolve_year },
    DateRule { name: "quarter", matches: is_quarter, resolve: resolve_quarter },
    DateRule { name: "month_code", matches: is_month_code, resolve: resolve_month_code },
    DateRule { name: "calendar", matches: |_| true, resolve: resolve_calendar },
];

/// Spanish month abbreviations, indexed by month - 1.
const MONTH_CODES: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

/// Formats tried by the calendar rule, in order.
const CALENDAR_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Formats a whole column may share. All numeric, so none of them can also
/// match the year, quarter or month-code rules.
const UNIFORM_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y-%m-%d %H:%M:%S"];

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}$").unwrap())
}

fn quarter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([IVXLCDM]+)\s+(\d{2})$").unwrap())
}

fn month_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(ene|feb|mar|abr|may|jun|jul|ago|sep|oct|nov|dic)[\s\-/.]?(\d{4}|\d{2})$")
            .unwrap()
    })
}

fn year_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap())
}

fn is_year(s: &str) -> bool {
    year_re().is_match(s)
}

fn resolve_year(s: &str) -> Option<NaiveDate> {
    let year: i32 = s.parse().ok()?;
    NaiveDate::from_ymd_opt(year, 12, 31)
}

fn is_quarter(s: &str) -> bool {
    quarter_re().is_match(s)
}

fn resolve_quarter(s: &str) -> Option<NaiveDate> {
    let caps = quarter_re().captures(s)?;
    let year = 2000 + caps[2].parse::<i32>().ok()?;
    let (month, day) = match &caps[1] {
        "I" => (3, 31),
        "II" => (6, 30),
        "III" => (9, 30),
        "IV" => (12, 31),
        other => {
            log::debug!("unsupported quarter numeral '{other}' in '{s}'");
            return None;
        }
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn is_month_code(s: &str) -> bool {
    month_code_re().is_match(s)
}

fn resolve_month_code(s: &str) -> Option<NaiveDate> {
    let caps = month_code_re().captures(s)?;
    let code = caps[1].to_lowercase();
    let month = MONTH_CODES.iter().position(|m| *m == code)? as u32 + 1;
    let digits = &caps[2];
    let year: i32 = digits.parse().ok()?;
    let year = if digits.len() == 2 { 2000 + year } else { year };
    month_end(year, month)
}

fn resolve_calendar(s: &str) -> Option<NaiveDate> {
    for fmt in CALENDAR_FORMATS.iter().chain(DATETIME_FORMATS) {
        if let Some(date) = parse_with_format(s, fmt) {
            return Some(date);
        }
    }

    let caps = year_month_re().captures(s)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    month_end(year, month)
}

/// Parse with one strftime format. Date-time formats keep only the date.
/// Years outside 1000..=9999 are rejected so "1/2/24" is never year 24.
fn parse_with_format(s: &str, fmt: &str) -> Option<NaiveDate> {
    let date = if fmt.contains("%H") {
        NaiveDateTime::parse_from_str(s, fmt).ok()?.date()
    } else {
        NaiveDate::parse_from_str(s, fmt).ok()?
    };
    let year = chrono::Datelike::year(&date);
    (1000..=9999).contains(&year).then_some(date)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve a single token. `None` means unparseable.
pub fn normalize(token: DateToken<'_>) -> Option<CanonicalDate> {
    match token {
        DateToken::Date(d) => Some(d),
        DateToken::Missing => None,
        DateToken::Number(n) if n.is_finite() => normalize_text(&CellValue::Number(n).match_text()),
        DateToken::Number(_) => None,
        DateToken::Text(s) => normalize_text(s),
    }
}

/// Resolve the text form of a token through the rule table.
pub fn normalize_text(raw: &str) -> Option<CanonicalDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let rule = RULES.iter().find(|rule| (rule.matches)(s))?;
    let resolved = (rule.resolve)(s);
    if resolved.is_none() {
        log::debug!("date token '{s}' matched rule '{}' but did not resolve", rule.name);
    }
    resolved
}

pub fn normalize_cell(cell: &CellValue) -> Option<CanonicalDate> {
    normalize(DateToken::from_cell(cell))
}

/// Resolve a whole date column.
///
/// Columns usually share one format, so a uniform parse is attempted first;
/// only if any token fails it does every token go through [`normalize`].
/// Both paths give the same result per token.
pub fn normalize_many(tokens: &[DateToken<'_>]) -> Vec<Option<CanonicalDate>> {
    if let Some(dates) = uniform_parse(tokens) {
        return dates;
    }
    tokens.iter().map(|token| normalize(*token)).collect()
}

fn uniform_parse(tokens: &[DateToken<'_>]) -> Option<Vec<Option<CanonicalDate>>> {
    if tokens.iter().all(|t| matches!(t, DateToken::Date(_))) {
        return Some(
            tokens
                .iter()
                .map(|t| match t {
                    DateToken::Date(d) => Some(*d),
                    _ => None,
                })
                .collect(),
        );
    }

    'formats: for fmt in UNIFORM_FORMATS {
        let mut dates = Vec::with_capacity(tokens.len());
        for token in tokens {
            let DateToken::Text(s) = token else {
                continue 'formats;
            };
            match parse_with_format(s.trim(), fmt) {
                Some(date) => dates.push(Some(date)),
                None => continue 'formats,
            }
        }
        return Some(dates);
    }

    None
}

/// Last calendar day of `month` in `year`.
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|d| d - Duration::days(1))
}

// ---------------------------------------------------------------------------
// Excel serial dates (1900 system)
// ---------------------------------------------------------------------------

fn excel_epoch() -> NaiveDate {
    // 1899-12-30 makes serial 61 = 1900-03-01; earlier serials are off by one
    // because of Excel's fictitious 1900-02-29.
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch")
}

/// Convert a date to its Excel serial number.
pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - excel_epoch()).num_days() as f64
}

/// Convert an Excel serial number to a date, dropping any time fraction.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    excel_epoch().checked_add_signed(Duration::days(serial.floor() as i64))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> Option<NaiveDate> {
        normalize(DateToken::Text(s))
    }

    #[test]
    fn test_year_resolves_to_december_31() {
        assert_eq!(text("2023"), Some(ymd(2023, 12, 31)));
        assert_eq!(text(" 1999 "), Some(ymd(1999, 12, 31)));
        assert_eq!(normalize(DateToken::Number(2024.0)), Some(ymd(2024, 12, 31)));
    }

    #[test]
    fn test_quarter_codes() {
        assert_eq!(text("I 24"), Some(ymd(2024, 3, 31)));
        assert_eq!(text("II 24"), Some(ymd(2024, 6, 30)));
        assert_eq!(text("III 24"), Some(ymd(2024, 9, 30)));
        assert_eq!(text("IV 24"), Some(ymd(2024, 12, 31)));
        assert_eq!(text("IV 99"), Some(ymd(2099, 12, 31)));
        assert_eq!(text("I  05"), Some(ymd(2005, 3, 31)));
    }

    #[test]
    fn test_unsupported_quarter_numeral_is_unparseable() {
        assert_eq!(text("V 24"), None);
        assert_eq!(text("XI 24"), None);
        // lowercase numerals are not quarter codes and nothing else parses them
        assert_eq!(text("iv 24"), None);
        // D, I and C are all roman digits, so the quarter rule claims this first
        assert_eq!(text("DIC 24"), None);
    }

    #[test]
    fn test_month_codes() {
        assert_eq!(text("Ene-24"), Some(ymd(2024, 1, 31)));
        assert_eq!(text("Ene24"), Some(ymd(2024, 1, 31)));
        assert_eq!(text("Feb 24"), Some(ymd(2024, 2, 29)));
        assert_eq!(text("feb-23"), Some(ymd(2023, 2, 28)));
        assert_eq!(text("Abr/24"), Some(ymd(2024, 4, 30)));
        assert_eq!(text("Ago.24"), Some(ymd(2024, 8, 31)));
        assert_eq!(text("DIC 2023"), Some(ymd(2023, 12, 31)));
        assert_eq!(text("Jan-24"), None);
    }

    #[test]
    fn test_calendar_formats() {
        assert_eq!(text("2024-03-15"), Some(ymd(2024, 3, 15)));
        assert_eq!(text("2024/03/15"), Some(ymd(2024, 3, 15)));
        assert_eq!(text("15/03/2024"), Some(ymd(2024, 3, 15)));
        assert_eq!(text("01/02/2024"), Some(ymd(2024, 2, 1)));
        assert_eq!(text("15-03-2024"), Some(ymd(2024, 3, 15)));
        assert_eq!(text("15.03.2024"), Some(ymd(2024, 3, 15)));
        assert_eq!(text("2024-03-15 00:00:00"), Some(ymd(2024, 3, 15)));
        assert_eq!(text("2024-03-15T12:30:00"), Some(ymd(2024, 3, 15)));
        assert_eq!(text("2024-02"), Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn test_unparseable_tokens() {
        assert_eq!(text(""), None);
        assert_eq!(text("   "), None);
        assert_eq!(text("Total"), None);
        assert_eq!(text("1/2/24"), None);
        assert_eq!(text("2024-13"), None);
        assert_eq!(normalize(DateToken::Missing), None);
        assert_eq!(normalize(DateToken::Number(f64::NAN)), None);
        assert_eq!(normalize(DateToken::Number(45000.0)), None);
    }

    #[test]
    fn test_native_date_passes_through() {
        let d = ymd(2020, 6, 30);
        assert_eq!(normalize(DateToken::Date(d)), Some(d));
        assert_eq!(normalize_cell(&CellValue::Date(d)), Some(d));
    }

    #[test]
    fn test_normalize_many_uniform_and_mixed() {
        let uniform = [DateToken::Text("2024-01-31"), DateToken::Text("2024-02-29")];
        assert_eq!(
            normalize_many(&uniform),
            vec![Some(ymd(2024, 1, 31)), Some(ymd(2024, 2, 29))]
        );

        let mixed = [
            DateToken::Text("2023"),
            DateToken::Text("I 24"),
            DateToken::Text("Ene-24"),
            DateToken::Number(2025.0),
            DateToken::Missing,
        ];
        assert_eq!(
            normalize_many(&mixed),
            vec![
                Some(ymd(2023, 12, 31)),
                Some(ymd(2024, 3, 31)),
                Some(ymd(2024, 1, 31)),
                Some(ymd(2025, 12, 31)),
                None,
            ]
        );

        assert!(normalize_many(&[]).is_empty());
    }

    #[test]
    fn test_month_end() {
        assert_eq!(month_end(2023, 2), Some(ymd(2023, 2, 28)));
        assert_eq!(month_end(2024, 12), Some(ymd(2024, 12, 31)));
        assert_eq!(month_end(2024, 0), None);
        assert_eq!(month_end(2024, 13), None);
    }

    #[test]
    fn test_serial_roundtrip_known_values() {
        assert_eq!(date_to_serial(ymd(2000, 1, 1)), 36526.0);
        assert_eq!(date_to_serial(ymd(2024, 1, 1)), 45292.0);
        assert_eq!(serial_to_date(45351.0), Some(ymd(2024, 2, 29)));
        assert_eq!(serial_to_date(45351.75), Some(ymd(2024, 2, 29)));
        assert_eq!(serial_to_date(0.0), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_token() -> impl Strategy<Value = String> {
            prop_oneof![
                r"[12][0-9]{3}",
                r"(I|II|III|IV|V) [0-9]{2}",
                r"(Ene|Feb|Mar|Abr|May|Jun|Jul|Ago|Sep|Oct|Nov|Dic)-?[0-9]{2}",
                r"[0-2][0-9]/(0[1-9]|1[0-2])/20[0-9]{2}",
                r"20[0-9]{2}-(0[1-9]|1[0-2])-[0-2][0-9]",
                r"[A-Za-z0-9 /-]{0,10}",
            ]
        }

        proptest! {
            #[test]
            fn year_tokens_resolve_to_december_31(year in 1000i32..=9999) {
                let s = year.to_string();
                prop_assert_eq!(text(&s), NaiveDate::from_ymd_opt(year, 12, 31));
            }

            #[test]
            fn quarter_years_are_2000_based(yy in 0i32..=99, q in 0usize..4) {
                let numerals = ["I", "II", "III", "IV"];
                let ends = [(3, 31), (6, 30), (9, 30), (12, 31)];
                let s = format!("{} {:02}", numerals[q], yy);
                let (m, d) = ends[q];
                prop_assert_eq!(text(&s), NaiveDate::from_ymd_opt(2000 + yy, m, d));
            }

            #[test]
            fn normalize_is_pure(s in arb_token()) {
                prop_assert_eq!(text(&s), text(&s));
            }

            #[test]
            fn batch_matches_per_token(tokens in proptest::collection::vec(arb_token(), 0..8)) {
                let batch: Vec<DateToken<'_>> = tokens.iter().map(|s| DateToken::Text(s)).collect();
                let one_by_one: Vec<_> = batch.iter().map(|t| normalize(*t)).collect();
                prop_assert_eq!(normalize_many(&batch), one_by_one);
            }
        }
    }
}
