//! # sheet2sql: spreadsheet rows to multi-dialect SQL
//!
//! Parses a `CREATE TABLE` statement into a dialect-neutral schema, cleans and
//! validates spreadsheet rows against it, and emits `CREATE TABLE` plus batched
//! `INSERT` statements for MySQL, PostgreSQL, SQLite and SQL Server.
//!
//! ## Quick Example
//!
//! ```rust
//! use sheet2sql::prelude::*;
//!
//! let schema = sheet2sql::parse(
//!     "CREATE TABLE produtos (id INT PRIMARY KEY AUTO_INCREMENT, nome VARCHAR(255) NOT NULL, preco DECIMAL(10,2));",
//! ).unwrap();
//!
//! let converter = Converter::new(schema, ConvertOptions::default());
//! let rows = vec![Record::from_iter([CellValue::Null, "Caneta".into(), 2.5.into()])];
//! let conversion = converter.run(&rows).unwrap();
//!
//! assert!(conversion.report.is_clean());
//! let pg = conversion.output(Dialect::PostgreSQL).unwrap();
//! assert!(pg.create_table.contains("\"id\" SERIAL PRIMARY KEY"));
//! ```
//!
//! ## Pipeline
//!
//! | Stage     | Module        | Input → Output                          |
//! |-----------|---------------|-----------------------------------------|
//! | Parse     | [`parser`]    | DDL text → [`Schema`](schema::Schema)   |
//! | Clean     | [`cleaner`]   | `Record` → `CleanedRecord`              |
//! | Validate  | [`validator`] | `CleanedRecord`s → `ValidationReport`   |
//! | Generate  | [`transpiler`]| schema + rows → `GeneratedSql`          |
//! | Run       | [`engine`]    | all of the above, per dialect           |

pub mod cleaner;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod schema;
pub mod transpiler;
pub mod typemap;
pub mod validator;
pub mod value;

pub mod prelude {
    pub use crate::cleaner::clean;
    pub use crate::engine::{Conversion, ConvertOptions, Converter, NullPolicy};
    pub use crate::error::*;
    pub use crate::parser::parse;
    pub use crate::schema::{default_schema, Column, DefaultValue, LogicalType, Schema};
    pub use crate::transpiler::{generate, Dialect, GenerateOptions, GeneratedSql};
    pub use crate::validator::{
        apply_defaults, validate, IssueKind, Severity, ValidationIssue, ValidationReport,
    };
    pub use crate::value::{CellValue, CleanedRecord, Record};
}

/// Parse a `CREATE TABLE` statement into a schema.
///
/// # Example
///
/// ```
/// use sheet2sql::parse;
///
/// let schema = parse("CREATE TABLE t (id INT PRIMARY KEY, nome TEXT)").unwrap();
/// assert_eq!(schema.table_name(), "t");
/// ```
pub fn parse(input: &str) -> Result<schema::Schema, error::ParseError> {
    parser::parse(input)
}
