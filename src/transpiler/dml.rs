//! INSERT SQL generation.

use super::dialect::Dialect;
use super::traits::SqlGenerator;
use crate::schema::{LogicalType, Schema};
use crate::value::{CleanedRecord, SqlValue, TIMESTAMP_FORMAT};

/// Coerce a cleaned record to typed values in schema order.
///
/// Fails when the row cannot be emitted as is; the message says why.
pub fn prepare_row(schema: &Schema, record: &CleanedRecord) -> Result<Vec<SqlValue>, String> {
    schema
        .columns()
        .iter()
        .enumerate()
        .map(|(position, column)| {
            let cell = record
                .cells()
                .get(position)
                .ok_or_else(|| format!("no value for column '{}'", column.name))?;
            let value = cell
                .coerce(&column.logical_type)
                .map_err(|reason| format!("column '{}': {}", column.name, reason))?;

            match &value {
                SqlValue::Null if !column.nullable && !column.is_auto_increment => {
                    Err(format!("column '{}' does not accept NULL", column.name))
                }
                SqlValue::Text(s)
                    if column
                        .logical_type
                        .max_length()
                        .is_some_and(|max| s.chars().count() > max) =>
                {
                    Err(format!("column '{}': text longer than declared", column.name))
                }
                _ => Ok(value),
            }
        })
        .collect()
}

/// Generate batched INSERT statements for prepared rows, in row order.
///
/// Rows with a Null in the auto-increment column leave that column out so the
/// engine assigns it. Where explicit identity values need a session toggle,
/// the toggle statements are interleaved with the INSERTs.
pub fn build_inserts(
    schema: &Schema,
    rows: &[Vec<SqlValue>],
    dialect: Dialect,
    batch_size: usize,
) -> Vec<String> {
    let generator = dialect.generator();
    let limit = generator
        .max_rows_per_insert()
        .map_or(batch_size, |max| batch_size.min(max))
        .max(1);
    let auto = schema.auto_increment_column().map(|(i, _)| i);
    let table = generator.quote_identifier(schema.table_name());
    let explicit = |row: &Vec<SqlValue>| auto.is_none_or(|i| row[i] != SqlValue::Null);

    let mut statements = Vec::new();
    for run in rows.chunk_by(|a, b| explicit(a) == explicit(b)) {
        let with_identity = run.first().is_some_and(explicit);
        let columns: Vec<usize> = (0..schema.len())
            .filter(|&i| with_identity || Some(i) != auto)
            .collect();
        let toggles = match auto {
            Some(_) if with_identity => generator.identity_insert(&table),
            _ => None,
        };

        if let Some((on, _)) = &toggles {
            statements.push(on.clone());
        }
        for batch in run.chunks(limit) {
            statements.push(insert_statement(schema, &table, &columns, batch, generator.as_ref()));
        }
        if let Some((_, off)) = toggles {
            statements.push(off);
        }
    }
    statements
}

fn insert_statement(
    schema: &Schema,
    table: &str,
    columns: &[usize],
    batch: &[Vec<SqlValue>],
    generator: &dyn SqlGenerator,
) -> String {
    let col_list = columns
        .iter()
        .map(|&i| generator.quote_identifier(&schema.columns()[i].name))
        .collect::<Vec<_>>()
        .join(", ");

    let values = batch
        .iter()
        .map(|row| {
            let literals = columns
                .iter()
                .map(|&i| render_value(&row[i], &schema.columns()[i].logical_type, generator))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", literals)
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!("INSERT INTO {} ({}) VALUES\n{}", table, col_list, values)
}

/// Render one typed value as a SQL literal.
pub fn render_value(value: &SqlValue, ty: &LogicalType, generator: &dyn SqlGenerator) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Decimal(d) => match ty {
            LogicalType::Decimal(Some((_, scale))) => format!("{:.*}", *scale as usize, d),
            _ => d.to_string(),
        },
        SqlValue::Text(s) => generator.string_literal(s),
        SqlValue::Boolean(b) => generator.bool_literal(*b),
        SqlValue::Timestamp(ts) => format!("'{}'", ts.format(TIMESTAMP_FORMAT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::clean;
    use crate::schema::default_schema;
    use crate::value::{CellValue, Record};
    use pretty_assertions::assert_eq;

    fn row(cells: Vec<CellValue>) -> Vec<SqlValue> {
        prepare_row(default_schema(), &clean(&Record::from(cells), default_schema())).unwrap()
    }

    fn ana(id: Option<i64>) -> Vec<SqlValue> {
        row(vec![
            id.into(),
            "Ana".into(),
            "ana@example.com".into(),
            CellValue::Null,
            "Recife".into(),
            true.into(),
            "2024-03-15 10:30:00".into(),
        ])
    }

    #[test]
    fn test_postgres_insert_omits_generated_id() {
        let sql = build_inserts(default_schema(), &[ana(None)], Dialect::PostgreSQL, 100);
        assert_eq!(
            sql,
            vec![
                "INSERT INTO \"cadastro\" (\"nome\", \"email\", \"telefone\", \"cidade\", \"ativo\", \"created_at\") VALUES\n('Ana', 'ana@example.com', NULL, 'Recife', TRUE, '2024-03-15 10:30:00')"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_batches_respect_size() {
        let rows: Vec<_> = (0..5).map(|_| ana(None)).collect();
        let sql = build_inserts(default_schema(), &rows, Dialect::MySQL, 2);
        assert_eq!(sql.len(), 3);
        assert_eq!(sql[2].matches("('Ana'").count(), 1);
    }

    #[test]
    fn test_sqlserver_clamps_batch_and_toggles_identity() {
        let rows: Vec<_> = (1..=1001).map(|i| ana(Some(i))).collect();
        let sql = build_inserts(default_schema(), &rows, Dialect::SqlServer, 5000);
        assert_eq!(sql.len(), 4);
        assert_eq!(sql[0], "SET IDENTITY_INSERT [cadastro] ON");
        assert!(sql[1].starts_with("INSERT INTO [cadastro] ([id], [nome]"));
        assert_eq!(sql[1].matches("\n(").count(), 1000);
        assert_eq!(sql[3], "SET IDENTITY_INSERT [cadastro] OFF");
    }

    #[test]
    fn test_mixed_identity_keeps_order() {
        let rows = vec![ana(Some(7)), ana(None), ana(None)];
        let sql = build_inserts(default_schema(), &rows, Dialect::MySQL, 100);
        assert_eq!(sql.len(), 2);
        assert!(sql[0].starts_with("INSERT INTO `cadastro` (`id`,"));
        assert!(sql[0].contains("(7, 'Ana'"));
        assert!(sql[1].starts_with("INSERT INTO `cadastro` (`nome`,"));
    }

    #[test]
    fn test_decimal_rounds_to_scale() {
        let g = Dialect::MySQL.generator();
        let ty = LogicalType::Decimal(Some((10, 2)));
        assert_eq!(render_value(&SqlValue::Decimal(10.5), &ty, g.as_ref()), "10.50");
        assert_eq!(render_value(&SqlValue::Decimal(1.239), &ty, g.as_ref()), "1.24");
    }

    #[test]
    fn test_prepare_row_rejects_bad_rows() {
        let schema = default_schema();
        let short = clean(&Record::from(vec![CellValue::Null]), schema);
        assert!(prepare_row(schema, &short).is_err());

        let null_name = clean(
            &Record::from(vec![
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
            ]),
            schema,
        );
        let err = prepare_row(schema, &null_name).unwrap_err();
        assert!(err.contains("'nome' does not accept NULL"));
    }
}
