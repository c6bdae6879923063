//! Per-dialect syntax hooks.

/// Syntax that differs between SQL engines.
///
/// Type spellings live in [`crate::typemap`]; this trait covers quoting,
/// literals and statement framing.
pub trait SqlGenerator: Send + Sync {
    /// Quote a table or column name.
    fn quote_identifier(&self, name: &str) -> String;

    /// Quote a string literal, escaping as the engine requires.
    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn bool_literal(&self, val: bool) -> String;

    /// Keyword sequence that starts the CREATE TABLE statement.
    fn create_table_prefix(&self) -> &str {
        "CREATE TABLE IF NOT EXISTS"
    }

    /// Text appended after the closing parenthesis of CREATE TABLE.
    fn table_options(&self) -> &str {
        ""
    }

    /// Default clause body for an unbounded text column.
    fn unbounded_text_default(&self, expr: String) -> String {
        expr
    }

    /// Extra column constraint for booleans stored as integers.
    fn boolean_check(&self, _quoted_column: &str) -> Option<String> {
        None
    }

    /// Upper bound on rows in one `VALUES` list.
    fn max_rows_per_insert(&self) -> Option<usize> {
        None
    }

    /// Statements toggling explicit identity values, as `(on, off)`.
    fn identity_insert(&self, _quoted_table: &str) -> Option<(String, String)> {
        None
    }

    /// Session settings at the top of a script.
    fn preamble(&self) -> &[&str] {
        &[]
    }

    /// Statements at the end of a script.
    fn footer(&self) -> &[&str] {
        &[]
    }

    /// Connection URL shape for this engine.
    fn connection_url_template(&self) -> &str;
}
