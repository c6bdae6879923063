//! Cell normalization, independent of dialect.
//!
//! Cleaning never fails. It collapses missing markers to Null, turns
//! whole-number text like `11.0` into `11` for text columns, canonicalizes
//! boolean tokens and clips text to the column's declared length. Clips are
//! recorded on the [`CleanedRecord`] so the validator can report them.
//!
//! Nullability is not repaired here; a Null in a NOT NULL column stays Null.

use tracing::warn;

use crate::schema::{Column, LogicalType, Schema};
use crate::value::{format_number, parse_bool_token, CellValue, CleanedRecord, Truncation};

/// Text that spreadsheets use for "no value".
const NULL_MARKERS: &[&str] = &["nan", "none", "null"];

/// Clean one record against a schema.
///
/// Cells beyond the schema are kept untouched for the validator to report.
/// Applying `clean` to its own output yields the same cells.
pub fn clean<R: AsRef<[CellValue]> + ?Sized>(record: &R, schema: &Schema) -> CleanedRecord {
    let mut truncations = Vec::new();
    let cells = record
        .as_ref()
        .iter()
        .enumerate()
        .map(|(position, cell)| match schema.columns().get(position) {
            Some(column) => clean_cell(cell, column, position, &mut truncations),
            None => cell.clone(),
        })
        .collect();

    CleanedRecord { cells, truncations }
}

fn clean_cell(
    cell: &CellValue,
    column: &Column,
    position: usize,
    truncations: &mut Vec<Truncation>,
) -> CellValue {
    match (cell, &column.logical_type) {
        (CellValue::Null, _) => CellValue::Null,
        (CellValue::Number(n), _) if n.is_nan() => CellValue::Null,

        (CellValue::Text(s), LogicalType::Text(max)) => {
            clean_text(s, *max, column, position, truncations)
        }
        (CellValue::Number(n), LogicalType::Text(max)) => {
            clean_text(&format_number(*n), *max, column, position, truncations)
        }
        (CellValue::Boolean(b), LogicalType::Text(max)) => {
            clean_text(&b.to_string(), *max, column, position, truncations)
        }

        (CellValue::Text(s), LogicalType::Boolean) => match trimmed_or_null(s) {
            None => CellValue::Null,
            Some(t) => parse_bool_token(strip_zero_fraction(t))
                .map(CellValue::Boolean)
                .unwrap_or_else(|| CellValue::Text(t.to_string())),
        },
        (CellValue::Number(n), LogicalType::Boolean) if *n == 0.0 || *n == 1.0 => {
            CellValue::Boolean(*n == 1.0)
        }

        (CellValue::Text(s), _) => match trimmed_or_null(s) {
            None => CellValue::Null,
            Some(t) => CellValue::Text(t.to_string()),
        },

        (other, _) => other.clone(),
    }
}

/// Text destined for a text column.
fn clean_text(
    raw: &str,
    max: Option<u32>,
    column: &Column,
    position: usize,
    truncations: &mut Vec<Truncation>,
) -> CellValue {
    let mut text = raw.trim().to_string();

    if let Some(max) = max.map(|m| m as usize) {
        let original_length = text.chars().count();
        if original_length > max {
            text = text.chars().take(max).collect::<String>().trim_end().to_string();
            let truncated_length = text.chars().count();
            warn!(
                column = %column.name,
                original_length,
                truncated_length,
                "truncated text value"
            );
            truncations.push(Truncation {
                column: position,
                original_length,
                truncated_length,
            });
        }
    }

    let text = strip_zero_fraction(&text);
    match trimmed_or_null(text) {
        None => CellValue::Null,
        Some(t) => CellValue::Text(t.to_string()),
    }
}

/// `"11.0"` becomes `"11"`; anything else is returned unchanged.
fn strip_zero_fraction(s: &str) -> &str {
    let Some((whole, fraction)) = s.split_once('.') else {
        return s;
    };
    let digits = whole.strip_prefix('-').unwrap_or(whole);
    let is_whole = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && !fraction.is_empty()
        && fraction.chars().all(|c| c == '0');
    if is_whole { whole } else { s }
}

/// Trimmed text, or `None` when it is empty or a null marker.
fn trimmed_or_null(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() || NULL_MARKERS.iter().any(|m| t.eq_ignore_ascii_case(m)) {
        None
    } else {
        Some(t)
    }
}
