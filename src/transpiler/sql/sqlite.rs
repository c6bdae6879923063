use crate::transpiler::traits::SqlGenerator;

/// SQLite Generator.
pub struct SqliteGenerator;

impl SqlGenerator for SqliteGenerator {
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn bool_literal(&self, val: bool) -> String {
        if val { "1".to_string() } else { "0".to_string() }
    }

    // No native boolean; keep the 0/1 contract in the schema.
    fn boolean_check(&self, quoted_column: &str) -> Option<String> {
        Some(format!("CHECK ({} IN (0, 1))", quoted_column))
    }

    fn connection_url_template(&self) -> &str {
        "sqlite:///path/to/database.db"
    }
}
