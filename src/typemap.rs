//! Type mapping between dialect spellings and [`LogicalType`].
//!
//! Parsing goes through a fixed alias table; rendering is an exhaustive match
//! over `(LogicalType, Dialect)`, so every pair has a spelling.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::{ParseError, ParseResult};
use crate::schema::LogicalType;
use crate::transpiler::Dialect;

/// Families of type tokens recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Integer,
    /// `TINYINT`; `TINYINT(1)` is a boolean.
    TinyInt,
    /// `SERIAL` and friends: integer plus auto-increment.
    Serial,
    Decimal,
    Float,
    /// Length-bounded character types.
    Char,
    /// Unbounded character types.
    Text,
    Boolean,
    /// `BIT`; `BIT`/`BIT(1)` is a boolean.
    Bit,
    Timestamp,
    Enum,
    Set,
}

static TYPE_ALIASES: LazyLock<HashMap<&'static str, TypeFamily>> = LazyLock::new(|| {
    use TypeFamily::*;
    HashMap::from([
        ("INT", Integer),
        ("INTEGER", Integer),
        ("BIGINT", Integer),
        ("SMALLINT", Integer),
        ("MEDIUMINT", Integer),
        ("INT2", Integer),
        ("INT4", Integer),
        ("INT8", Integer),
        ("TINYINT", TinyInt),
        ("SERIAL", Serial),
        ("SERIAL4", Serial),
        ("SERIAL8", Serial),
        ("BIGSERIAL", Serial),
        ("SMALLSERIAL", Serial),
        ("DECIMAL", Decimal),
        ("DEC", Decimal),
        ("NUMERIC", Decimal),
        ("NUMBER", Decimal),
        ("MONEY", Decimal),
        ("SMALLMONEY", Decimal),
        ("REAL", Float),
        ("FLOAT", Float),
        ("FLOAT4", Float),
        ("FLOAT8", Float),
        ("DOUBLE", Float),
        ("VARCHAR", Char),
        ("CHAR", Char),
        ("CHARACTER", Char),
        ("NVARCHAR", Char),
        ("NCHAR", Char),
        ("VARCHAR2", Char),
        ("NVARCHAR2", Char),
        ("TEXT", Text),
        ("TINYTEXT", Text),
        ("MEDIUMTEXT", Text),
        ("LONGTEXT", Text),
        ("NTEXT", Text),
        ("CLOB", Text),
        ("STRING", Text),
        ("BOOLEAN", Boolean),
        ("BOOL", Boolean),
        ("BIT", Bit),
        ("TIMESTAMP", Timestamp),
        ("TIMESTAMPTZ", Timestamp),
        ("DATETIME", Timestamp),
        ("DATETIME2", Timestamp),
        ("SMALLDATETIME", Timestamp),
        ("DATETIMEOFFSET", Timestamp),
        ("DATE", Timestamp),
        ("ENUM", Enum),
        ("SET", Set),
    ])
});

/// Look up a type token (case-insensitive).
pub fn lookup(token: &str) -> Option<TypeFamily> {
    TYPE_ALIASES.get(token.to_uppercase().as_str()).copied()
}

/// Result of resolving a type token and its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedType {
    pub logical_type: LogicalType,
    /// The type itself implies auto-increment (`SERIAL`).
    pub auto_increment: bool,
    /// Plain `TEXT`, which SQLite schemas use for dates. Becomes a timestamp
    /// when the column defaults to `datetime('now')`.
    pub date_capable_text: bool,
}

impl ResolvedType {
    fn of(logical_type: LogicalType) -> Self {
        Self {
            logical_type,
            auto_increment: false,
            date_capable_text: false,
        }
    }
}

/// Resolve a type token plus its parenthesized arguments.
///
/// `position` is the byte offset of the token, used for error reporting.
pub fn resolve(token: &str, args: &[String], position: usize) -> ParseResult<ResolvedType> {
    let family = lookup(token).ok_or_else(|| ParseError::UnknownType(token.to_string()))?;
    let number = |s: &str| -> ParseResult<u32> {
        s.trim().parse::<u32>().map_err(|_| {
            ParseError::malformed(position, format!("invalid argument '{}' for type {}", s, token))
        })
    };

    let resolved = match family {
        TypeFamily::Integer => ResolvedType::of(LogicalType::Integer),
        TypeFamily::TinyInt => match args {
            [one] if one.trim() == "1" => ResolvedType::of(LogicalType::Boolean),
            _ => ResolvedType::of(LogicalType::Integer),
        },
        TypeFamily::Serial => ResolvedType {
            auto_increment: true,
            ..ResolvedType::of(LogicalType::Integer)
        },
        TypeFamily::Decimal => {
            let precision = match args {
                [] => None,
                [p] => Some((narrow(number(p)?, token, position)?, 0)),
                [p, s] => Some((
                    narrow(number(p)?, token, position)?,
                    narrow(number(s)?, token, position)?,
                )),
                _ => {
                    return Err(ParseError::malformed(
                        position,
                        format!("type {} takes at most two arguments", token),
                    ));
                }
            };
            ResolvedType::of(LogicalType::Decimal(precision))
        }
        TypeFamily::Float => ResolvedType::of(LogicalType::Decimal(None)),
        TypeFamily::Char => match args {
            [] => ResolvedType::of(LogicalType::Text(None)),
            [n] if n.trim().eq_ignore_ascii_case("MAX") => {
                ResolvedType::of(LogicalType::Text(None))
            }
            [n] => ResolvedType::of(LogicalType::Text(Some(number(n)?))),
            _ => {
                return Err(ParseError::malformed(
                    position,
                    format!("type {} takes one length argument", token),
                ));
            }
        },
        TypeFamily::Text => ResolvedType {
            date_capable_text: token.eq_ignore_ascii_case("TEXT"),
            ..ResolvedType::of(LogicalType::Text(None))
        },
        TypeFamily::Boolean => ResolvedType::of(LogicalType::Boolean),
        TypeFamily::Bit => match args {
            [] => ResolvedType::of(LogicalType::Boolean),
            [one] if one.trim() == "1" => ResolvedType::of(LogicalType::Boolean),
            _ => ResolvedType::of(LogicalType::Integer),
        },
        TypeFamily::Timestamp => ResolvedType::of(LogicalType::Timestamp),
        TypeFamily::Enum | TypeFamily::Set => {
            if args.is_empty() {
                return Err(ParseError::malformed(
                    position,
                    format!("type {} needs at least one value", token),
                ));
            }
            let longest = args.iter().map(|a| a.chars().count()).max().unwrap_or(0);
            let width = if family == TypeFamily::Set {
                // every member plus separating commas
                args.iter().map(|a| a.chars().count()).sum::<usize>() + args.len() - 1
            } else {
                longest
            };
            ResolvedType::of(LogicalType::Text(Some(width.max(1) as u32)))
        }
    };

    Ok(resolved)
}

fn narrow(n: u32, token: &str, position: usize) -> ParseResult<u16> {
    u16::try_from(n).map_err(|_| {
        ParseError::malformed(position, format!("argument {} out of range for type {}", n, token))
    })
}

/// Render a logical type in the dialect's type syntax.
pub fn render(ty: &LogicalType, dialect: Dialect) -> String {
    use Dialect::*;
    match (ty, dialect) {
        (LogicalType::Integer, MySQL | SqlServer) => "INT".to_string(),
        (LogicalType::Integer, PostgreSQL | SQLite) => "INTEGER".to_string(),

        (LogicalType::Decimal(Some((p, s))), MySQL | SqlServer) => {
            format!("DECIMAL({},{})", p, s)
        }
        (LogicalType::Decimal(Some((p, s))), PostgreSQL | SQLite) => {
            format!("NUMERIC({},{})", p, s)
        }
        (LogicalType::Decimal(None), MySQL) => "DOUBLE".to_string(),
        (LogicalType::Decimal(None), PostgreSQL) => "DOUBLE PRECISION".to_string(),
        (LogicalType::Decimal(None), SQLite) => "REAL".to_string(),
        (LogicalType::Decimal(None), SqlServer) => "FLOAT".to_string(),

        (LogicalType::Text(Some(n)), _) => format!("VARCHAR({})", n),
        (LogicalType::Text(None), MySQL | PostgreSQL | SQLite) => "TEXT".to_string(),
        (LogicalType::Text(None), SqlServer) => "VARCHAR(MAX)".to_string(),

        (LogicalType::Boolean, MySQL) => "TINYINT(1)".to_string(),
        (LogicalType::Boolean, PostgreSQL) => "BOOLEAN".to_string(),
        (LogicalType::Boolean, SQLite) => "INTEGER".to_string(),
        (LogicalType::Boolean, SqlServer) => "BIT".to_string(),

        (LogicalType::Timestamp, MySQL | SQLite) => "DATETIME".to_string(),
        (LogicalType::Timestamp, PostgreSQL) => "TIMESTAMP".to_string(),
        (LogicalType::Timestamp, SqlServer) => "DATETIME2".to_string(),
    }
}

/// Type syntax for an auto-increment primary key column.
pub fn render_auto_increment(ty: &LogicalType, dialect: Dialect) -> String {
    match dialect {
        Dialect::MySQL | Dialect::SQLite => render(ty, dialect),
        Dialect::PostgreSQL => "SERIAL".to_string(),
        Dialect::SqlServer => format!("{} IDENTITY(1,1)", render(ty, dialect)),
    }
}

/// Keyword appended after the column constraints of an auto-increment column.
pub fn auto_increment_keyword(dialect: Dialect) -> Option<&'static str> {
    match dialect {
        Dialect::MySQL => Some("AUTO_INCREMENT"),
        Dialect::SQLite => Some("AUTOINCREMENT"),
        Dialect::PostgreSQL | Dialect::SqlServer => None,
    }
}

/// The dialect's native "current time" default for a type, if it has one.
pub fn native_default(ty: &LogicalType, dialect: Dialect) -> Option<&'static str> {
    match (ty, dialect) {
        (LogicalType::Timestamp, Dialect::MySQL | Dialect::PostgreSQL) => Some("CURRENT_TIMESTAMP"),
        (LogicalType::Timestamp, Dialect::SQLite) => Some("(datetime('now'))"),
        (LogicalType::Timestamp, Dialect::SqlServer) => Some("GETDATE()"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_types() -> Vec<LogicalType> {
        vec![
            LogicalType::Integer,
            LogicalType::Decimal(Some((10, 2))),
            LogicalType::Decimal(None),
            LogicalType::Text(Some(255)),
            LogicalType::Text(None),
            LogicalType::Boolean,
            LogicalType::Timestamp,
        ]
    }

    #[test]
    fn test_every_pair_renders() {
        for ty in all_types() {
            for dialect in Dialect::ALL {
                assert!(!render(&ty, dialect).is_empty(), "{:?} / {:?}", ty, dialect);
            }
        }
    }

    #[test]
    fn test_boolean_spellings() {
        let ty = LogicalType::Boolean;
        assert_eq!(render(&ty, Dialect::MySQL), "TINYINT(1)");
        assert_eq!(render(&ty, Dialect::PostgreSQL), "BOOLEAN");
        assert_eq!(render(&ty, Dialect::SQLite), "INTEGER");
        assert_eq!(render(&ty, Dialect::SqlServer), "BIT");
    }

    #[test]
    fn test_auto_increment_spellings() {
        let ty = LogicalType::Integer;
        assert_eq!(render_auto_increment(&ty, Dialect::MySQL), "INT");
        assert_eq!(render_auto_increment(&ty, Dialect::PostgreSQL), "SERIAL");
        assert_eq!(render_auto_increment(&ty, Dialect::SQLite), "INTEGER");
        assert_eq!(render_auto_increment(&ty, Dialect::SqlServer), "INT IDENTITY(1,1)");
    }

    #[test]
    fn test_unbounded_text() {
        assert_eq!(render(&LogicalType::Text(None), Dialect::SqlServer), "VARCHAR(MAX)");
        assert_eq!(render(&LogicalType::Text(None), Dialect::PostgreSQL), "TEXT");
    }

    #[test]
    fn test_resolve_aliases() {
        let r = resolve("varchar", &["120".into()], 0).unwrap();
        assert_eq!(r.logical_type, LogicalType::Text(Some(120)));

        let r = resolve("TINYINT", &["1".into()], 0).unwrap();
        assert_eq!(r.logical_type, LogicalType::Boolean);

        let r = resolve("serial", &[], 0).unwrap();
        assert_eq!(r.logical_type, LogicalType::Integer);
        assert!(r.auto_increment);

        let r = resolve("NUMERIC", &["12".into(), "4".into()], 0).unwrap();
        assert_eq!(r.logical_type, LogicalType::Decimal(Some((12, 4))));

        let r = resolve("NVARCHAR", &["MAX".into()], 0).unwrap();
        assert_eq!(r.logical_type, LogicalType::Text(None));
    }

    #[test]
    fn test_resolve_enum_and_set() {
        let r = resolve("ENUM", &["S".into(), "N".into()], 0).unwrap();
        assert_eq!(r.logical_type, LogicalType::Text(Some(1)));

        let r = resolve("SET", &["red".into(), "green".into()], 0).unwrap();
        assert_eq!(r.logical_type, LogicalType::Text(Some(9)));
    }

    #[test]
    fn test_unknown_type() {
        let err = resolve("GEOMETRY", &[], 4).unwrap_err();
        assert_eq!(err, ParseError::UnknownType("GEOMETRY".into()));
    }

    #[test]
    fn test_native_default() {
        assert_eq!(
            native_default(&LogicalType::Timestamp, Dialect::SqlServer),
            Some("GETDATE()")
        );
        assert_eq!(native_default(&LogicalType::Integer, Dialect::MySQL), None);
    }
}
