//! SQL generation for a [`Schema`] and its cleaned records.
//!
//! One [`SqlGenerator`] strategy per [`Dialect`]; [`generate`] produces the
//! CREATE TABLE and batched INSERTs for one dialect.

pub mod ddl;
pub mod dialect;
pub mod dml;
pub mod sql;
pub mod traits;

pub use dialect::Dialect;
pub use traits::SqlGenerator;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::schema::Schema;
use crate::validator::ValidationReport;
use crate::value::{CleanedRecord, TIMESTAMP_FORMAT};

/// Rows per INSERT when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Rows per INSERT statement, before the dialect's own cap.
    pub batch_size: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// SQL for one dialect. Statements carry no trailing semicolon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedSql {
    pub dialect: Dialect,
    pub table_name: String,
    pub create_table: String,
    /// INSERT batches in row order, with any identity toggles in between.
    pub inserts: Vec<String>,
    /// Rows written to the INSERTs.
    pub row_count: usize,
    /// Input rows left out, by 0-based index.
    pub skipped_rows: Vec<usize>,
}

impl GeneratedSql {
    /// Render a complete script: header, session settings, DDL, data, footer.
    pub fn to_script(&self, source: Option<&str>) -> String {
        let generator = self.dialect.generator();
        let rule = format!("-- {}", "=".repeat(60));
        let mut out = String::new();

        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!(
            "-- {} script for table {}\n",
            self.dialect, self.table_name
        ));
        if let Some(source) = source {
            out.push_str(&format!("-- Source: {}\n", source));
        }
        out.push_str(&format!(
            "-- Records: {} written, {} skipped\n",
            self.row_count,
            self.skipped_rows.len()
        ));
        out.push_str(&format!(
            "-- Generated: {}\n",
            chrono::Local::now().format(TIMESTAMP_FORMAT)
        ));
        out.push_str(&rule);
        out.push_str("\n\n");

        for stmt in generator.preamble() {
            out.push_str(stmt);
            out.push_str(";\n");
        }
        if !generator.preamble().is_empty() {
            out.push('\n');
        }

        out.push_str(&self.create_table);
        out.push_str(";\n\n");

        for stmt in &self.inserts {
            out.push_str(stmt);
            out.push_str(";\n");
        }

        if !generator.footer().is_empty() {
            out.push('\n');
        }
        for stmt in generator.footer() {
            out.push_str(stmt);
            out.push_str(";\n");
        }
        out
    }
}

/// Generate SQL for one dialect.
///
/// Rows blocked by an error in `report`, or that fail coercion here, are not
/// emitted and are listed in [`GeneratedSql::skipped_rows`].
pub fn generate(
    schema: &Schema,
    records: &[CleanedRecord],
    report: &ValidationReport,
    dialect: Dialect,
    options: &GenerateOptions,
) -> Result<GeneratedSql, GenerationError> {
    if schema.is_empty() {
        return Err(GenerationError::EmptySchema);
    }
    if options.batch_size == 0 {
        return Err(GenerationError::InvalidBatchSize(options.batch_size));
    }

    let blocked = report.blocked_rows();
    let mut rows = Vec::with_capacity(records.len());
    let mut skipped_rows = Vec::new();

    for (row_index, record) in records.iter().enumerate() {
        if blocked.contains(&row_index) {
            skipped_rows.push(row_index);
            continue;
        }
        match dml::prepare_row(schema, record) {
            Ok(values) => rows.push(values),
            Err(reason) => {
                warn!(row = row_index, %dialect, %reason, "row left out of INSERTs");
                skipped_rows.push(row_index);
            }
        }
    }

    let create_table = ddl::build_create_table(schema, dialect);
    let inserts = dml::build_inserts(schema, &rows, dialect, options.batch_size);
    debug!(
        %dialect,
        rows = rows.len(),
        statements = inserts.len(),
        skipped = skipped_rows.len(),
        "generated SQL"
    );

    Ok(GeneratedSql {
        dialect,
        table_name: schema.table_name().to_string(),
        create_table,
        inserts,
        row_count: rows.len(),
        skipped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::clean;
    use crate::schema::default_schema;
    use crate::validator::validate;
    use crate::value::{CellValue, Record};

    fn records() -> Vec<CleanedRecord> {
        let rows = vec![
            Record::from(vec![
                CellValue::Null,
                "Ana".into(),
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                "S".into(),
                CellValue::Null,
            ]),
            // nome is NOT NULL
            Record::from(vec![
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
            ]),
        ];
        rows.iter().map(|r| clean(r, default_schema())).collect()
    }

    #[test]
    fn test_generate_skips_blocked_rows() {
        let records = records();
        let report = validate(&records, default_schema()).unwrap();
        let out = generate(
            default_schema(),
            &records,
            &report,
            Dialect::SQLite,
            &GenerateOptions::default(),
        )
        .unwrap();

        assert_eq!(out.row_count, 1);
        assert_eq!(out.skipped_rows, vec![1]);
        assert_eq!(out.inserts.len(), 1);
    }

    #[test]
    fn test_generate_checks_rows_without_a_report() {
        let records = records();
        let out = generate(
            default_schema(),
            &records,
            &ValidationReport::default(),
            Dialect::MySQL,
            &GenerateOptions::default(),
        )
        .unwrap();
        assert_eq!(out.skipped_rows, vec![1]);
    }

    #[test]
    fn test_zero_batch_size() {
        let err = generate(
            default_schema(),
            &records(),
            &ValidationReport::default(),
            Dialect::MySQL,
            &GenerateOptions { batch_size: 0 },
        )
        .unwrap_err();
        assert_eq!(err, GenerationError::InvalidBatchSize(0));
    }

    #[test]
    fn test_mysql_script_layout() {
        let records = records();
        let report = validate(&records, default_schema()).unwrap();
        let out = generate(
            default_schema(),
            &records,
            &report,
            Dialect::MySQL,
            &GenerateOptions::default(),
        )
        .unwrap();
        let script = out.to_script(Some("clientes.json"));

        assert!(script.contains("-- MySQL script for table cadastro\n"));
        assert!(script.contains("-- Source: clientes.json\n"));
        assert!(script.contains("-- Records: 1 written, 1 skipped\n"));
        let names = script.find("SET NAMES utf8mb4;").unwrap();
        let create = script.find("CREATE TABLE IF NOT EXISTS `cadastro`").unwrap();
        let insert = script.find("INSERT INTO `cadastro`").unwrap();
        let footer = script.find("SET FOREIGN_KEY_CHECKS = 1;").unwrap();
        assert!(names < create && create < insert && insert < footer);
    }
}
