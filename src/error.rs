//! Error types for sheet2sql.
//!
//! Fatal errors only. Per-row problems are never errors; they are collected as
//! [`ValidationIssue`](crate::validator::ValidationIssue)s in a report.

use thiserror::Error;

/// Failure to turn DDL text into a [`Schema`](crate::schema::Schema).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The statement does not have the `CREATE TABLE name (...)` shape.
    #[error("Malformed CREATE TABLE at position {position}: {reason}")]
    Malformed { position: usize, reason: String },

    /// A column type token is not in the alias table.
    #[error("Unknown column type: '{0}'")]
    UnknownType(String),

    /// More than one primary key declaration.
    #[error("Duplicate primary key declaration on column '{0}'")]
    DuplicatePrimaryKey(String),
}

impl ParseError {
    /// Create a malformed-statement error at the given byte offset.
    pub fn malformed(position: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            position,
            reason: reason.into(),
        }
    }
}

/// Request-level validation failures. A bad row is never one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Schema has no columns")]
    EmptySchema,

    #[error("No records to validate")]
    NoRecords,
}

/// Failure of a single generation call. Other dialects are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Dialect name that does not map to any [`Dialect`](crate::transpiler::Dialect).
    #[error("Unsupported dialect: '{0}'. Expected: mysql, postgresql, sqlite or sqlserver")]
    UnsupportedDialect(String),

    #[error("Cannot generate SQL for a schema without columns")]
    EmptySchema,

    #[error("Invalid batch size {0}: must be at least 1")]
    InvalidBatchSize(usize),
}

/// Top-level error for the orchestrator and configuration layer.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A parallel worker failed before returning its chunk.
    #[error("Worker error: {0}")]
    Worker(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for schema parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type alias for conversion runs.
pub type ConvertResult<T> = Result<T, ConvertError>;
