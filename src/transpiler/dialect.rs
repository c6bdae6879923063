use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::GenerationError;
use crate::transpiler::sql::mysql::MysqlGenerator;
use crate::transpiler::sql::postgres::PostgresGenerator;
use crate::transpiler::sql::sqlite::SqliteGenerator;
use crate::transpiler::sql::sqlserver::SqlServerGenerator;
use crate::transpiler::traits::SqlGenerator;

/// Supported SQL Dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySQL,
    PostgreSQL,
    SQLite,
    SqlServer,
}

impl Dialect {
    /// Every dialect, in output order.
    pub const ALL: [Dialect; 4] = [
        Dialect::MySQL,
        Dialect::PostgreSQL,
        Dialect::SQLite,
        Dialect::SqlServer,
    ];

    pub fn generator(&self) -> Box<dyn SqlGenerator> {
        match self {
            Dialect::MySQL => Box::new(MysqlGenerator),
            Dialect::PostgreSQL => Box::new(PostgresGenerator),
            Dialect::SQLite => Box::new(SqliteGenerator),
            Dialect::SqlServer => Box::new(SqlServerGenerator),
        }
    }

    /// Lowercase name used in file names and configuration.
    pub fn slug(&self) -> &'static str {
        match self {
            Dialect::MySQL => "mysql",
            Dialect::PostgreSQL => "postgresql",
            Dialect::SQLite => "sqlite",
            Dialect::SqlServer => "sqlserver",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::MySQL => "MySQL",
            Dialect::PostgreSQL => "PostgreSQL",
            Dialect::SQLite => "SQLite",
            Dialect::SqlServer => "SQL Server",
        };
        f.write_str(name)
    }
}

impl FromStr for Dialect {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySQL),
            "postgresql" | "postgres" | "pg" => Ok(Dialect::PostgreSQL),
            "sqlite" | "sqlite3" => Ok(Dialect::SQLite),
            "sqlserver" | "mssql" | "tsql" | "sql server" => Ok(Dialect::SqlServer),
            _ => Err(GenerationError::UnsupportedDialect(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("MySQL".parse::<Dialect>(), Ok(Dialect::MySQL));
        assert_eq!("postgres".parse::<Dialect>(), Ok(Dialect::PostgreSQL));
        assert_eq!("sqlite3".parse::<Dialect>(), Ok(Dialect::SQLite));
        assert_eq!("MSSQL".parse::<Dialect>(), Ok(Dialect::SqlServer));
        assert_eq!(
            "oracle".parse::<Dialect>(),
            Err(GenerationError::UnsupportedDialect("oracle".into()))
        );
    }

    #[test]
    fn test_slug_round_trips() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.slug().parse::<Dialect>(), Ok(dialect));
        }
    }
}
