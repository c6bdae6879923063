//! Record validation against a [`Schema`].
//!
//! A bad row is never an error: every problem becomes a [`ValidationIssue`]
//! in the [`ValidationReport`] and checking carries on. Only an empty schema
//! or an empty record set fails the whole request.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use crate::error::ValidationError;
use crate::schema::{Column, DefaultValue, LogicalType, Schema};
use crate::value::{
    parse_bool_token, parse_decimal_text, CellValue, CleanedRecord, SqlValue, TIMESTAMP_FORMAT,
};

/// What is wrong with a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum IssueKind {
    /// Record has fewer cells than the schema has columns.
    MissingColumn,
    /// Cell cannot be coerced to the column type.
    TypeMismatch,
    /// Text longer than the column allows (clipped, or still too long).
    LengthExceeded,
    /// Null in a NOT NULL column.
    NullNotAllowed,
    /// Cell beyond the last schema column.
    UnknownColumn,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueKind::MissingColumn => "MissingColumn",
            IssueKind::TypeMismatch => "TypeMismatch",
            IssueKind::LengthExceeded => "LengthExceeded",
            IssueKind::NullNotAllowed => "NullNotAllowed",
            IssueKind::UnknownColumn => "UnknownColumn",
        };
        f.write_str(name)
    }
}

/// Errors keep their row out of the generated INSERTs; warnings do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One problem with one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// 0-based position of the record in the input.
    pub row_index: usize,
    pub column_name: String,
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    /// Text length before clipping, for `LengthExceeded`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_length: Option<usize>,
}

impl ValidationIssue {
    fn error(row_index: usize, column_name: &str, kind: IssueKind, message: String) -> Self {
        Self {
            row_index,
            column_name: column_name.to_string(),
            kind,
            severity: Severity::Error,
            message,
            original_length: None,
        }
    }

    fn warning(row_index: usize, column_name: &str, kind: IssueKind, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(row_index, column_name, kind, message)
        }
    }

    pub fn blocks_row(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} [{}] {} ({}): {}",
            self.row_index, self.column_name, self.kind, self.severity, self.message
        )
    }
}

/// Issues for a record set, in row order, plus counts.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
    total_rows: usize,
}

impl ValidationReport {
    pub fn new(total_rows: usize, issues: Vec<ValidationIssue>) -> Self {
        Self { issues, total_rows }
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// No issues at all: the dataset fits the schema.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::blocks_row)
    }

    /// Rows with at least one error-severity issue.
    pub fn blocked_rows(&self) -> BTreeSet<usize> {
        self.issues
            .iter()
            .filter(|i| i.blocks_row())
            .map(|i| i.row_index)
            .collect()
    }

    pub fn is_blocked(&self, row_index: usize) -> bool {
        self.issues
            .iter()
            .any(|i| i.row_index == row_index && i.blocks_row())
    }

    /// Append a report covering the rows that follow this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
        self.total_rows += other.total_rows;
    }

    pub fn summary(&self) -> ReportSummary {
        let mut by_kind = BTreeMap::new();
        for issue in &self.issues {
            *by_kind.entry(issue.kind).or_insert(0) += 1;
        }
        let errors = self.issues.iter().filter(|i| i.blocks_row()).count();
        let blocked_rows = self.blocked_rows().len();
        ReportSummary {
            total_rows: self.total_rows,
            valid_rows: self.total_rows.saturating_sub(blocked_rows),
            blocked_rows,
            errors,
            warnings: self.issues.len() - errors,
            by_kind,
        }
    }
}

/// Counts derived from a [`ValidationReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub blocked_rows: usize,
    pub errors: usize,
    pub warnings: usize,
    pub by_kind: BTreeMap<IssueKind, usize>,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Rows: {} ({} valid, {} blocked)",
            self.total_rows, self.valid_rows, self.blocked_rows
        )?;
        write!(f, "Issues: {} errors, {} warnings", self.errors, self.warnings)?;
        for (kind, count) in &self.by_kind {
            write!(f, "\n  {}: {}", kind, count)?;
        }
        Ok(())
    }
}

/// Checks cleaned records against one schema.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a Schema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Validate a whole record set.
    pub fn validate(&self, records: &[CleanedRecord]) -> Result<ValidationReport, ValidationError> {
        if self.schema.is_empty() {
            return Err(ValidationError::EmptySchema);
        }
        if records.is_empty() {
            return Err(ValidationError::NoRecords);
        }
        let report = self.check_rows(0, records);
        debug!(
            rows = report.total_rows(),
            issues = report.issues().len(),
            "validated records"
        );
        Ok(report)
    }

    /// Check a contiguous slice whose first record sits at `offset` in the input.
    pub fn check_rows(&self, offset: usize, records: &[CleanedRecord]) -> ValidationReport {
        let mut issues = Vec::new();
        for (i, record) in records.iter().enumerate() {
            self.check_record(offset + i, record, &mut issues);
        }
        ValidationReport::new(records.len(), issues)
    }

    pub fn check_record(
        &self,
        row_index: usize,
        record: &CleanedRecord,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for (position, column) in self.schema.columns().iter().enumerate() {
            let Some(cell) = record.cells().get(position) else {
                issues.push(ValidationIssue::error(
                    row_index,
                    &column.name,
                    IssueKind::MissingColumn,
                    format!("no value for column '{}' (position {})", column.name, position),
                ));
                continue;
            };

            if let Some(t) = record.truncation_at(position) {
                issues.push(ValidationIssue {
                    original_length: Some(t.original_length),
                    ..ValidationIssue::warning(
                        row_index,
                        &column.name,
                        IssueKind::LengthExceeded,
                        format!(
                            "text truncated from {} to {} characters",
                            t.original_length, t.truncated_length
                        ),
                    )
                });
            }

            self.check_cell(row_index, column, cell, issues);
        }

        for position in self.schema.len()..record.len() {
            issues.push(ValidationIssue::warning(
                row_index,
                &format!("#{}", position),
                IssueKind::UnknownColumn,
                format!(
                    "value at position {} has no column in table '{}'",
                    position,
                    self.schema.table_name()
                ),
            ));
        }
    }

    fn check_cell(
        &self,
        row_index: usize,
        column: &Column,
        cell: &CellValue,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if cell.is_null() {
            if !column.nullable && !column.is_auto_increment {
                issues.push(ValidationIssue::error(
                    row_index,
                    &column.name,
                    IssueKind::NullNotAllowed,
                    format!("column '{}' does not accept NULL", column.name),
                ));
            }
            return;
        }

        match cell.coerce(&column.logical_type) {
            Err(reason) => issues.push(ValidationIssue::error(
                row_index,
                &column.name,
                IssueKind::TypeMismatch,
                format!("expected {}, got {}: {}", column.logical_type, cell.tag(), reason),
            )),
            Ok(SqlValue::Text(s)) => {
                let Some(max) = column.logical_type.max_length() else {
                    return;
                };
                let length = s.chars().count();
                if length > max {
                    issues.push(ValidationIssue {
                        original_length: Some(length),
                        ..ValidationIssue::error(
                            row_index,
                            &column.name,
                            IssueKind::LengthExceeded,
                            format!("text of {} characters exceeds limit of {}", length, max),
                        )
                    });
                }
            }
            Ok(_) => {}
        }
    }
}

/// Validate records against a schema.
pub fn validate(
    records: &[CleanedRecord],
    schema: &Schema,
) -> Result<ValidationReport, ValidationError> {
    Validator::new(schema).validate(records)
}

/// Replace Null cells with their column default, using the local clock for
/// current-time defaults.
///
/// Auto-increment columns and expression defaults are left alone. The result
/// is a new record; the input is not touched.
pub fn apply_defaults(record: &CleanedRecord, schema: &Schema) -> CleanedRecord {
    apply_defaults_at(record, schema, chrono::Local::now().naive_local())
}

/// [`apply_defaults`] with an explicit "now".
pub fn apply_defaults_at(
    record: &CleanedRecord,
    schema: &Schema,
    now: NaiveDateTime,
) -> CleanedRecord {
    let cells = record
        .cells()
        .iter()
        .enumerate()
        .map(|(position, cell)| {
            let column = match schema.columns().get(position) {
                Some(c) if cell.is_null() && !c.is_auto_increment => c,
                _ => return cell.clone(),
            };
            column
                .default
                .as_ref()
                .and_then(|d| materialize_default(d, &column.logical_type, now))
                .unwrap_or(CellValue::Null)
        })
        .collect();

    CleanedRecord {
        cells,
        truncations: record.truncations().to_vec(),
    }
}

fn materialize_default(
    default: &DefaultValue,
    ty: &LogicalType,
    now: NaiveDateTime,
) -> Option<CellValue> {
    match (default, ty) {
        (DefaultValue::Null | DefaultValue::Expression(_), _) => None,
        (DefaultValue::CurrentTimestamp, _) => {
            Some(CellValue::Text(now.format(TIMESTAMP_FORMAT).to_string()))
        }
        (DefaultValue::Boolean(b), _) => Some(CellValue::Boolean(*b)),
        (DefaultValue::Number(n) | DefaultValue::Text(n), LogicalType::Boolean) => {
            parse_bool_token(n).map(CellValue::Boolean)
        }
        (DefaultValue::Number(n), LogicalType::Integer | LogicalType::Decimal(_)) => {
            parse_decimal_text(n).map(CellValue::Number)
        }
        (DefaultValue::Number(n) | DefaultValue::Text(n), _) => Some(CellValue::Text(n.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::clean;
    use crate::schema::default_schema;
    use crate::value::Record;
    use chrono::NaiveDate;

    fn contact_schema() -> Schema {
        Schema::new(
            "contatos",
            vec![
                Column::new("nome", LogicalType::Text(None)),
                Column::new("telefone", LogicalType::Text(None)),
                Column::new("ativo", LogicalType::Boolean)
                    .not_null()
                    .with_default(DefaultValue::Number("1".into())),
            ],
        )
        .unwrap()
    }

    fn cleaned(schema: &Schema, cells: Vec<CellValue>) -> CleanedRecord {
        clean(&Record::from(cells), schema)
    }

    #[test]
    fn test_scenario_b_validation() {
        let schema = contact_schema();
        let records = vec![cleaned(
            &schema,
            vec!["Joao Silva".into(), "11.0".into(), CellValue::Null],
        )];
        let report = validate(&records, &schema).unwrap();

        assert_eq!(report.issues().len(), 1);
        let issue = &report.issues()[0];
        assert_eq!(issue.kind, IssueKind::NullNotAllowed);
        assert_eq!(issue.column_name, "ativo");
        assert_eq!(issue.row_index, 0);
    }

    #[test]
    fn test_apply_defaults_fills_nulls() {
        let schema = contact_schema();
        let record = cleaned(&schema, vec!["Joao".into(), CellValue::Null, CellValue::Null]);
        let filled = apply_defaults(&record, &schema);

        assert_eq!(filled.cells()[1], CellValue::Null);
        assert_eq!(filled.cells()[2], CellValue::Boolean(true));
        assert!(validate(&[filled], &schema).unwrap().is_clean());
        // the input record is left as it was
        assert_eq!(record.cells()[2], CellValue::Null);
    }

    #[test]
    fn test_apply_defaults_current_timestamp() {
        let schema = default_schema();
        let now = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let record = cleaned(
            schema,
            vec![
                CellValue::Null,
                "Ana".into(),
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
            ],
        );
        let filled = apply_defaults_at(&record, schema, now);
        assert_eq!(filled.cells()[0], CellValue::Null);
        assert_eq!(filled.cells()[5], CellValue::Boolean(true));
        assert_eq!(filled.cells()[6], CellValue::from("2024-05-01 08:00:00"));
    }

    #[test]
    fn test_missing_and_unknown_columns() {
        let schema = contact_schema();
        let records = vec![
            cleaned(&schema, vec!["Ana".into()]),
            cleaned(
                &schema,
                vec!["Bia".into(), "1".into(), true.into(), "extra".into()],
            ),
        ];
        let report = validate(&records, &schema).unwrap();

        let kinds: Vec<(usize, IssueKind)> =
            report.issues().iter().map(|i| (i.row_index, i.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (0, IssueKind::MissingColumn),
                (0, IssueKind::MissingColumn),
                (1, IssueKind::UnknownColumn),
            ]
        );
        assert_eq!(report.blocked_rows().into_iter().collect::<Vec<_>>(), vec![0]);
        assert!(!report.is_blocked(1));
    }

    #[test]
    fn test_type_mismatch() {
        let schema = default_schema();
        let records = vec![cleaned(
            schema,
            vec![
                "abc".into(),
                "Ana".into(),
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                "talvez".into(),
                "ontem".into(),
            ],
        )];
        let report = validate(&records, schema).unwrap();
        let columns: Vec<&str> = report
            .issues()
            .iter()
            .filter(|i| i.kind == IssueKind::TypeMismatch)
            .map(|i| i.column_name.as_str())
            .collect();
        assert_eq!(columns, vec!["id", "ativo", "created_at"]);
    }

    #[test]
    fn test_truncation_is_a_warning() {
        let schema =
            Schema::new("t", vec![Column::new("d", LogicalType::Text(Some(255)))]).unwrap();
        let records = vec![cleaned(&schema, vec!["x".repeat(300).into()])];
        let report = validate(&records, &schema).unwrap();

        assert_eq!(report.issues().len(), 1);
        let issue = &report.issues()[0];
        assert_eq!(issue.kind, IssueKind::LengthExceeded);
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(issue.original_length, Some(300));
        assert!(!report.has_errors());
    }

    #[test]
    fn test_unclipped_overflow_is_an_error() {
        let schema =
            Schema::new("t", vec![Column::new("d", LogicalType::Text(Some(3)))]).unwrap();
        // bypasses the cleaner
        let record = CleanedRecord {
            cells: vec![CellValue::from("abcdef")],
            truncations: Vec::new(),
        };
        let report = validate(&[record], &schema).unwrap();
        assert_eq!(report.issues()[0].kind, IssueKind::LengthExceeded);
        assert_eq!(report.issues()[0].severity, Severity::Error);
        assert_eq!(report.issues()[0].original_length, Some(6));
    }

    #[test]
    fn test_auto_increment_accepts_null() {
        let schema = default_schema();
        let records = vec![cleaned(
            schema,
            vec![
                CellValue::Null,
                "Ana".into(),
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                true.into(),
                CellValue::Null,
            ],
        )];
        assert!(validate(&records, schema).unwrap().is_clean());
    }

    #[test]
    fn test_request_level_errors() {
        let schema = contact_schema();
        assert_eq!(validate(&[], &schema), Err(ValidationError::NoRecords));
    }

    #[test]
    fn test_merge_and_summary() {
        let schema = contact_schema();
        let validator = Validator::new(&schema);
        let first = vec![cleaned(&schema, vec!["A".into(), CellValue::Null, true.into()])];
        let second = vec![
            cleaned(&schema, vec!["B".into(), CellValue::Null, CellValue::Null]),
            cleaned(&schema, vec!["C".into(), CellValue::Null, false.into(), 1.into()]),
        ];

        let mut report = validator.check_rows(0, &first);
        report.merge(validator.check_rows(first.len(), &second));

        assert_eq!(report.total_rows(), 3);
        assert_eq!(report.issues()[0].row_index, 1);
        assert_eq!(report.issues()[1].row_index, 2);

        let summary = report.summary();
        assert_eq!(summary.valid_rows, 2);
        assert_eq!(summary.blocked_rows, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.by_kind.get(&IssueKind::NullNotAllowed), Some(&1));
        assert!(summary.to_string().starts_with("Rows: 3 (2 valid, 1 blocked)"));
    }
}
