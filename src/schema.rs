//! Dialect-neutral table model.
//!
//! A [`Schema`] is built once per run, either by the parser or from the
//! built-in [`DEFAULT_SCHEMA`], and never mutated afterwards. Quoting is not
//! part of the model; identifiers are stored bare.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{ParseError, ParseResult};

/// Logical column type shared by every dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalType {
    Integer,
    /// Exact numeric with `(precision, scale)`, or an approximate number when `None`.
    Decimal(Option<(u16, u16)>),
    /// Character data with a maximum length in characters, or unbounded when `None`.
    Text(Option<u32>),
    Boolean,
    Timestamp,
}

impl LogicalType {
    /// Declared maximum length for bounded text.
    pub fn max_length(&self) -> Option<usize> {
        match self {
            Self::Text(Some(n)) => Some(*n as usize),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Decimal(Some((p, s))) => write!(f, "DECIMAL({},{})", p, s),
            Self::Decimal(None) => write!(f, "DECIMAL"),
            Self::Text(Some(n)) => write!(f, "TEXT({})", n),
            Self::Text(None) => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

/// Column default, stored without dialect spelling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DefaultValue {
    Null,
    /// Numeric literal kept as written (`1`, `0.00`, `-5`).
    Number(String),
    /// String literal content, unquoted and unescaped.
    Text(String),
    Boolean(bool),
    /// `CURRENT_TIMESTAMP`, `NOW()`, `GETDATE()`, `datetime('now')` and friends.
    CurrentTimestamp,
    /// Anything else, passed through verbatim.
    Expression(String),
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::CurrentTimestamp => write!(f, "CURRENT_TIMESTAMP"),
            Self::Expression(e) => write!(f, "{}", e),
        }
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub is_unique: bool,
}

impl Column {
    /// A nullable column with no constraints.
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable: true,
            default: None,
            is_primary_key: false,
            is_auto_increment: false,
            is_unique: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as primary key. Primary keys are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A table: name plus ordered columns.
///
/// Column order defines both the DDL column order and the positional mapping
/// of record cells. Invariants: at least one column, unique names
/// (case-insensitive), at most one auto-increment column and that column is
/// the whole primary key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    table_name: String,
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema, checking its invariants.
    pub fn new(table_name: impl Into<String>, columns: Vec<Column>) -> ParseResult<Self> {
        let table_name = table_name.into();
        if table_name.is_empty() {
            return Err(ParseError::malformed(0, "missing table name"));
        }
        if columns.is_empty() {
            return Err(ParseError::malformed(0, "empty column list"));
        }

        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.to_lowercase()) {
                return Err(ParseError::malformed(
                    0,
                    format!("duplicate column name '{}'", col.name),
                ));
            }
        }

        let auto: Vec<&Column> = columns.iter().filter(|c| c.is_auto_increment).collect();
        if auto.len() > 1 {
            return Err(ParseError::malformed(
                0,
                format!(
                    "more than one auto-increment column ('{}' and '{}')",
                    auto[0].name, auto[1].name
                ),
            ));
        }
        if let Some(col) = auto.first() {
            if !col.is_primary_key {
                return Err(ParseError::malformed(
                    0,
                    format!("auto-increment column '{}' must be the primary key", col.name),
                ));
            }
            if columns.iter().filter(|c| c.is_primary_key).count() > 1 {
                return Err(ParseError::malformed(
                    0,
                    format!(
                        "auto-increment column '{}' must be the only primary key column",
                        col.name
                    ),
                ));
            }
            if col.logical_type != LogicalType::Integer {
                return Err(ParseError::malformed(
                    0,
                    format!("auto-increment column '{}' must be an integer", col.name),
                ));
            }
        }

        Ok(Self {
            table_name,
            columns,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Find a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Position of a column by name (case-insensitive).
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Map spreadsheet headers to column positions.
    ///
    /// Exact names (case-insensitive) win. Remaining headers are matched
    /// through [`HEADER_VARIANTS`]; each column is taken at most once.
    pub fn match_headers<S: AsRef<str>>(&self, headers: &[S]) -> Vec<Option<usize>> {
        let mut taken = vec![false; self.columns.len()];
        let mut matched = vec![None; headers.len()];

        for (slot, header) in matched.iter_mut().zip(headers) {
            if let Some(pos) = self.position(header.as_ref().trim()) {
                if !taken[pos] {
                    taken[pos] = true;
                    *slot = Some(pos);
                }
            }
        }

        for (slot, header) in matched.iter_mut().zip(headers) {
            if slot.is_some() {
                continue;
            }
            let header = header.as_ref().trim().to_lowercase();
            *slot = HEADER_VARIANTS.iter().find_map(|(name, variants)| {
                let pos = self.position(name)?;
                (!taken[pos] && variants.iter().any(|v| header.contains(*v))).then_some(pos)
            });
            if let Some(pos) = *slot {
                taken[pos] = true;
            }
        }

        matched
    }

    pub fn primary_key(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_primary_key).collect()
    }

    pub fn auto_increment_column(&self) -> Option<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.is_auto_increment)
    }

    /// Human-readable summary of the table.
    pub fn summary(&self) -> String {
        let mut out = Vec::new();
        out.push(format!("Table: {}", self.table_name));
        out.push(format!("Columns: {}", self.columns.len()));
        let pk: Vec<&str> = self.primary_key().iter().map(|c| c.name.as_str()).collect();
        out.push(format!("Primary key: {}", pk.join(", ")));
        out.push(String::new());

        for col in &self.columns {
            let mut line = format!("  {}: {}", col.name, col.logical_type);
            line.push_str(if col.nullable { " NULL" } else { " NOT NULL" });
            if let Some(default) = &col.default {
                line.push_str(&format!(" DEFAULT {}", default));
            }
            if col.is_auto_increment {
                line.push_str(" AUTO_INCREMENT");
            }
            if col.is_unique {
                line.push_str(" UNIQUE");
            }
            out.push(line);
        }

        out.join("\n")
    }
}

/// Header spellings accepted for common columns, matched as substrings.
pub const HEADER_VARIANTS: &[(&str, &[&str])] = &[
    ("nome", &["name", "produto", "item"]),
    ("preco", &["price", "valor", "custo"]),
    ("categoria", &["category", "tipo", "class"]),
    ("descricao", &["description", "desc", "detalhes"]),
    ("email", &["e-mail", "e_mail", "mail"]),
    ("ativo", &["active", "status"]),
];

/// Built-in `cadastro` table used when no schema text is supplied.
///
/// The column list is a fixed contract: id, nome, email, telefone, cidade,
/// ativo, created_at.
pub static DEFAULT_SCHEMA: LazyLock<Schema> = LazyLock::new(|| Schema {
    table_name: "cadastro".to_string(),
    columns: vec![
        Column::new("id", LogicalType::Integer)
            .primary_key()
            .auto_increment(),
        Column::new("nome", LogicalType::Text(Some(255))).not_null(),
        Column::new("email", LogicalType::Text(Some(100))),
        Column::new("telefone", LogicalType::Text(Some(20))),
        Column::new("cidade", LogicalType::Text(Some(100))),
        Column::new("ativo", LogicalType::Boolean).with_default(DefaultValue::Boolean(true)),
        Column::new("created_at", LogicalType::Timestamp)
            .with_default(DefaultValue::CurrentTimestamp),
    ],
});

/// The built-in default schema.
pub fn default_schema() -> &'static Schema {
    &DEFAULT_SCHEMA
}
