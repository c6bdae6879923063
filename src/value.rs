//! Cell values as handed in by the spreadsheet reader, and their typed
//! coercion against a column's logical type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::LogicalType;

/// Format used for timestamp literals in generated SQL.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A raw cell, tagged by the reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the runtime tag, for messages.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }

    /// Coerce this cell to the given column type.
    ///
    /// The error string says why the cell does not fit; it ends up in a
    /// `TypeMismatch` issue.
    pub fn coerce(&self, ty: &LogicalType) -> Result<SqlValue, String> {
        if self.is_null() {
            return Ok(SqlValue::Null);
        }
        match ty {
            LogicalType::Integer => self.coerce_integer(),
            LogicalType::Decimal(_) => self.coerce_decimal(),
            LogicalType::Text(_) => Ok(match self {
                Self::Text(s) => SqlValue::Text(s.clone()),
                Self::Number(n) => SqlValue::Text(format_number(*n)),
                Self::Boolean(b) => SqlValue::Text(b.to_string()),
                Self::Null => SqlValue::Null,
            }),
            LogicalType::Boolean => self.coerce_boolean(),
            LogicalType::Timestamp => self.coerce_timestamp(),
        }
    }

    fn coerce_integer(&self) -> Result<SqlValue, String> {
        match self {
            Self::Number(n) => whole_number(*n)
                .map(SqlValue::Integer)
                .ok_or_else(|| format!("number {} is not a whole number", n)),
            Self::Text(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Ok(SqlValue::Integer(i));
                }
                parse_decimal_text(trimmed)
                    .and_then(whole_number)
                    .map(SqlValue::Integer)
                    .ok_or_else(|| format!("'{}' is not an integer", s))
            }
            Self::Boolean(b) => Ok(SqlValue::Integer(i64::from(*b))),
            Self::Null => Ok(SqlValue::Null),
        }
    }

    fn coerce_decimal(&self) -> Result<SqlValue, String> {
        match self {
            Self::Number(n) if n.is_finite() => Ok(SqlValue::Decimal(*n)),
            Self::Number(n) => Err(format!("number {} is not finite", n)),
            Self::Text(s) => parse_decimal_text(s.trim())
                .map(SqlValue::Decimal)
                .ok_or_else(|| format!("'{}' is not a number", s)),
            Self::Boolean(_) => Err("boolean cannot be stored as a decimal".to_string()),
            Self::Null => Ok(SqlValue::Null),
        }
    }

    fn coerce_boolean(&self) -> Result<SqlValue, String> {
        match self {
            Self::Boolean(b) => Ok(SqlValue::Boolean(*b)),
            Self::Number(n) if *n == 1.0 => Ok(SqlValue::Boolean(true)),
            Self::Number(n) if *n == 0.0 => Ok(SqlValue::Boolean(false)),
            Self::Number(n) => Err(format!("number {} is not a boolean (expected 0 or 1)", n)),
            Self::Text(s) => parse_bool_token(s)
                .map(SqlValue::Boolean)
                .ok_or_else(|| format!("'{}' is not a boolean", s)),
            Self::Null => Ok(SqlValue::Null),
        }
    }

    fn coerce_timestamp(&self) -> Result<SqlValue, String> {
        match self {
            Self::Text(s) => parse_timestamp(s)
                .map(SqlValue::Timestamp)
                .ok_or_else(|| format!("'{}' is not a date/time", s)),
            Self::Number(n) => excel_serial_to_datetime(*n)
                .map(SqlValue::Timestamp)
                .ok_or_else(|| format!("number {} is not a spreadsheet date", n)),
            Self::Boolean(_) => Err("boolean cannot be stored as a timestamp".to_string()),
            Self::Null => Ok(SqlValue::Null),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Boolean(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Number(f64::from(v))
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Number(v as f64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}

/// One input row: cells in schema column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Vec<CellValue>);

impl Record {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self(cells)
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<CellValue>> for Record {
    fn from(cells: Vec<CellValue>) -> Self {
        Self(cells)
    }
}

impl<T: Into<CellValue>> FromIterator<T> for Record {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl AsRef<[CellValue]> for Record {
    fn as_ref(&self) -> &[CellValue] {
        &self.0
    }
}

/// A text cell clipped by the cleaner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Truncation {
    /// Column position.
    pub column: usize,
    /// Length in characters before truncation.
    pub original_length: usize,
    /// Length in characters after truncation.
    pub truncated_length: usize,
}

/// A record after cleaning. Carries the truncations performed so the
/// validator can report them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CleanedRecord {
    pub(crate) cells: Vec<CellValue>,
    pub(crate) truncations: Vec<Truncation>,
}

impl CleanedRecord {
    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    pub fn truncations(&self) -> &[Truncation] {
        &self.truncations
    }

    pub fn truncation_at(&self, column: usize) -> Option<&Truncation> {
        self.truncations.iter().find(|t| t.column == column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl AsRef<[CellValue]> for CleanedRecord {
    fn as_ref(&self) -> &[CellValue] {
        &self.cells
    }
}

/// A cell coerced to its column type, ready to be rendered as a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Decimal(f64),
    Text(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

/// Render a number the way a person would type it: `11` rather than `11.0`.
pub fn format_number(n: f64) -> String {
    match whole_number(n) {
        Some(i) if i.abs() < 1_000_000_000_000_000 => i.to_string(),
        _ => n.to_string(),
    }
}

fn whole_number(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Parse decimal text, accepting `,` as the separator when there is no `.`.
pub fn parse_decimal_text(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let normalized = if s.contains(',') && !s.contains('.') {
        s.replace(',', ".")
    } else {
        s.to_string()
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Recognize a truthy/falsy token.
pub fn parse_bool_token(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "y" | "yes" | "s" | "sim" => Some(true),
        "0" | "false" | "f" | "n" | "no" | "nao" | "não" => Some(false),
        _ => None,
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse ISO or day-first (`DD/MM/YYYY`) date/time text.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local())
}

/// Spreadsheet serial dates count days from 1899-12-30.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial <= 0.0 || serial >= 2_958_466.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}
