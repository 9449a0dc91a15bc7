use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single untyped spreadsheet cell.
///
/// Source sheets carry no schema, so every comparison against an identifier
/// goes through [`CellValue::match_text`] rather than through the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl CellValue {
    /// Parse user-typed input the way a spreadsheet would: blank is empty,
    /// anything numeric is a number, the rest is text.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Some(num) = parse_finite(trimmed) {
            return CellValue::Number(num);
        }

        CellValue::Text(trimmed.to_string())
    }

    /// True for cells that terminate a value run.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(n) => n.is_nan(),
            CellValue::Text(s) => s.is_empty(),
            CellValue::Date(_) => false,
        }
    }

    /// Text form used for identifier matching and header names.
    ///
    /// Integral numbers render without a fractional part so a numeric `100`
    /// cell matches the identifier `"100"`. Text is returned verbatim.
    pub fn match_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Coerce an extracted series value: numbers stay numbers, text that
    /// parses as a finite number becomes one, everything else is kept as text.
    pub fn coerce_numeric(&self) -> CellValue {
        match self {
            CellValue::Empty => CellValue::Empty,
            CellValue::Number(n) => CellValue::Number(*n),
            CellValue::Text(s) => match parse_finite(s.trim()) {
                Some(n) => CellValue::Number(n),
                None => CellValue::Text(s.clone()),
            },
            CellValue::Date(d) => CellValue::Text(d.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// `f64::from_str` also accepts "nan" and "inf"; series values never do.
fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
