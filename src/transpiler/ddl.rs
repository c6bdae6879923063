//! CREATE TABLE generation.

use super::dialect::Dialect;
use super::traits::SqlGenerator;
use crate::schema::{Column, DefaultValue, LogicalType, Schema};
use crate::typemap;
use crate::value::parse_bool_token;

/// Generate CREATE TABLE SQL, without a trailing semicolon.
pub fn build_create_table(schema: &Schema, dialect: Dialect) -> String {
    let generator = dialect.generator();
    let pk = schema.primary_key();
    let composite = pk.len() > 1;

    let mut defs: Vec<String> = schema
        .columns()
        .iter()
        .map(|col| {
            format!(
                "    {}",
                column_definition(col, composite, dialect, generator.as_ref())
            )
        })
        .collect();

    if composite {
        let cols = pk
            .iter()
            .map(|c| generator.quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        defs.push(format!("    PRIMARY KEY ({})", cols));
    }

    format!(
        "{} {} (\n{}\n){}",
        generator.create_table_prefix(),
        generator.quote_identifier(schema.table_name()),
        defs.join(",\n"),
        generator.table_options()
    )
}

fn column_definition(
    col: &Column,
    composite_key: bool,
    dialect: Dialect,
    generator: &dyn SqlGenerator,
) -> String {
    let name = generator.quote_identifier(&col.name);
    let sql_type = if col.is_auto_increment {
        typemap::render_auto_increment(&col.logical_type, dialect)
    } else {
        typemap::render(&col.logical_type, dialect)
    };
    let mut line = format!("{} {}", name, sql_type);

    let inline_pk = col.is_primary_key && !composite_key;
    if !col.nullable && !inline_pk {
        line.push_str(" NOT NULL");
    }

    if !col.is_auto_increment {
        if let Some(default) = &col.default {
            let mut rendered = render_default(default, &col.logical_type, dialect, generator);
            if col.logical_type == LogicalType::Text(None) && *default != DefaultValue::Null {
                rendered = generator.unbounded_text_default(rendered);
            }
            line.push_str(" DEFAULT ");
            line.push_str(&rendered);
        }
    }

    if col.is_unique && !inline_pk {
        line.push_str(" UNIQUE");
    }
    if inline_pk {
        line.push_str(" PRIMARY KEY");
    }
    if col.is_auto_increment {
        if let Some(keyword) = typemap::auto_increment_keyword(dialect) {
            line.push(' ');
            line.push_str(keyword);
        }
    }
    if col.logical_type == LogicalType::Boolean {
        if let Some(check) = generator.boolean_check(&name) {
            line.push(' ');
            line.push_str(&check);
        }
    }

    line
}

fn render_default(
    default: &DefaultValue,
    ty: &LogicalType,
    dialect: Dialect,
    generator: &dyn SqlGenerator,
) -> String {
    match default {
        DefaultValue::Null => "NULL".to_string(),
        DefaultValue::Boolean(b) => generator.bool_literal(*b),
        DefaultValue::Number(n) | DefaultValue::Text(n) if *ty == LogicalType::Boolean => {
            match parse_bool_token(n) {
                Some(b) => generator.bool_literal(b),
                None => n.clone(),
            }
        }
        DefaultValue::Number(n) => n.clone(),
        DefaultValue::Text(s) => generator.string_literal(s),
        DefaultValue::CurrentTimestamp => typemap::native_default(ty, dialect)
            .unwrap_or("CURRENT_TIMESTAMP")
            .to_string(),
        DefaultValue::Expression(e) => e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::schema::default_schema;

    fn produtos() -> Schema {
        parse(
            "CREATE TABLE produtos (id INT PRIMARY KEY AUTO_INCREMENT, nome VARCHAR(255) NOT NULL, preco DECIMAL(10,2));",
        )
        .unwrap()
    }

    #[test]
    fn test_mysql_create_table() {
        let sql = build_create_table(&produtos(), Dialect::MySQL);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `produtos` (\n    `id` INT PRIMARY KEY AUTO_INCREMENT,\n    `nome` VARCHAR(255) NOT NULL,\n    `preco` DECIMAL(10,2)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn test_postgres_serial() {
        let sql = build_create_table(&produtos(), Dialect::PostgreSQL);
        assert!(sql.contains("\"id\" SERIAL PRIMARY KEY"));
        assert!(sql.contains("\"preco\" NUMERIC(10,2)"));
    }

    #[test]
    fn test_sqlite_autoincrement_and_boolean_check() {
        let sql = build_create_table(default_schema(), Dialect::SQLite);
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"ativo\" INTEGER DEFAULT 1 CHECK (\"ativo\" IN (0, 1))"));
        assert!(sql.contains("\"created_at\" DATETIME DEFAULT (datetime('now'))"));
    }

    #[test]
    fn test_sqlserver_identity() {
        let sql = build_create_table(default_schema(), Dialect::SqlServer);
        assert!(sql.starts_with("CREATE TABLE [cadastro] ("));
        assert!(sql.contains("[id] INT IDENTITY(1,1) PRIMARY KEY"));
        assert!(sql.contains("[ativo] BIT DEFAULT 1"));
        assert!(sql.contains("[created_at] DATETIME2 DEFAULT GETDATE()"));
    }

    #[test]
    fn test_composite_key_is_a_table_constraint() {
        let schema =
            parse("CREATE TABLE itens (pedido INT, linha INT, PRIMARY KEY (pedido, linha))")
                .unwrap();
        let sql = build_create_table(&schema, Dialect::PostgreSQL);
        assert!(sql.contains("\"pedido\" INTEGER NOT NULL,"));
        assert!(sql.contains("    PRIMARY KEY (\"pedido\", \"linha\")\n)"));
    }

    #[test]
    fn test_mysql_text_defaults_are_expressions() {
        let schema = parse(
            "CREATE TABLE t (nota TEXT DEFAULT 'x', quando NVARCHAR(MAX) DEFAULT GETDATE(), \
             vazio TEXT DEFAULT NULL, curto VARCHAR(5) DEFAULT 'y')",
        )
        .unwrap();

        let mysql = build_create_table(&schema, Dialect::MySQL);
        assert!(mysql.contains("`nota` TEXT DEFAULT ('x')"));
        assert!(mysql.contains("`quando` TEXT DEFAULT (CURRENT_TIMESTAMP)"));
        assert!(mysql.contains("`vazio` TEXT DEFAULT NULL"));
        assert!(mysql.contains("`curto` VARCHAR(5) DEFAULT 'y'"));

        let pg = build_create_table(&schema, Dialect::PostgreSQL);
        assert!(pg.contains("\"nota\" TEXT DEFAULT 'x'"));
    }

    #[test]
    fn test_autoincrement_only_on_a_single_column_key() {
        let sql = build_create_table(default_schema(), Dialect::SQLite);
        let line = sql.lines().find(|l| l.contains("AUTOINCREMENT")).unwrap();
        assert!(line.contains("INTEGER PRIMARY KEY AUTOINCREMENT"));

        let composite = "CREATE TABLE t (a INTEGER AUTOINCREMENT, b INT, PRIMARY KEY (a, b))";
        assert!(parse(composite).is_err());
    }

    #[test]
    fn test_text_default_is_escaped() {
        let schema =
            parse("CREATE TABLE t (cidade VARCHAR(50) DEFAULT 'Pau d''Alho' UNIQUE)").unwrap();
        assert!(build_create_table(&schema, Dialect::SqlServer)
            .contains("[cidade] VARCHAR(50) DEFAULT N'Pau d''Alho' UNIQUE"));
    }
}
