use pretty_assertions::assert_eq;
use sheet2sql::prelude::*;

const PRODUTOS: &str = "CREATE TABLE produtos (id INT PRIMARY KEY AUTO_INCREMENT, nome VARCHAR(255) NOT NULL, preco DECIMAL(10,2));";

fn values_section(insert: &str) -> &str {
    insert.split_once(" VALUES\n").map(|(_, v)| v).unwrap_or("")
}

/// Reduce dialect literal spellings to one form.
fn normalize_literals(values: &str) -> String {
    values
        .replace("N'", "'")
        .replace("TRUE", "1")
        .replace("FALSE", "0")
}

#[test]
fn test_scenario_a_parse_and_generate() {
    let schema = parse(PRODUTOS).expect("Failed to parse produtos");
    assert_eq!(schema.len(), 3);

    let converter = Converter::new(schema, ConvertOptions::default());
    let rows = vec![Record::from_iter([
        CellValue::Null,
        "Caderno".into(),
        "12,90".into(),
    ])];
    let conversion = converter.run(&rows).unwrap();

    let mysql = conversion.output(Dialect::MySQL).unwrap();
    assert!(mysql.create_table.contains("`id` INT PRIMARY KEY AUTO_INCREMENT"));

    let pg = conversion.output(Dialect::PostgreSQL).unwrap();
    assert!(pg.create_table.contains("\"id\" SERIAL PRIMARY KEY"));
    assert_eq!(
        pg.inserts,
        vec![
            "INSERT INTO \"produtos\" (\"nome\", \"preco\") VALUES\n('Caderno', 12.90)"
                .to_string()
        ]
    );
}

#[test]
fn test_scenario_b_clean_then_validate() {
    let schema = Schema::new(
        "pessoas",
        vec![
            Column::new("nome", LogicalType::Text(None)),
            Column::new("telefone", LogicalType::Text(None)),
            Column::new("ativo", LogicalType::Boolean)
                .not_null()
                .with_default(DefaultValue::Number("1".into())),
        ],
    )
    .unwrap();

    let record = Record::from_iter([CellValue::from("Joao Silva"), "11.0".into(), CellValue::Null]);
    let cleaned = clean(&record, &schema);
    assert_eq!(
        cleaned.cells(),
        &[CellValue::from("Joao Silva"), CellValue::from("11"), CellValue::Null]
    );

    let report = validate(&[cleaned], &schema).unwrap();
    assert_eq!(report.issues().len(), 1);
    assert_eq!(report.issues()[0].kind, IssueKind::NullNotAllowed);
    assert_eq!(report.issues()[0].column_name, "ativo");
}

#[test]
fn test_scenario_c_truncation_reported_with_original_length() {
    let schema = parse("CREATE TABLE notas (texto VARCHAR(255))").unwrap();
    let converter = Converter::new(schema, ConvertOptions::default());
    let conversion = converter
        .run(&[Record::from_iter(["a".repeat(300)])])
        .unwrap();

    match &conversion.records[0].cells()[0] {
        CellValue::Text(s) => assert_eq!(s.chars().count(), 255),
        other => panic!("expected text, got {:?}", other),
    }

    let issues = conversion.report.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::LengthExceeded);
    assert_eq!(issues[0].original_length, Some(300));

    // a clipped row is still written
    for generated in conversion.generated() {
        assert_eq!(generated.row_count, 1);
    }
}

#[test]
fn test_scenario_d_four_dialects_same_rows() {
    let converter = Converter::with_default_schema(ConvertOptions::default());
    let rows = vec![
        Record::from_iter([
            CellValue::from(1),
            "Maria D'Ávila".into(),
            "maria@example.com".into(),
            81988887777.0.into(),
            "Olinda".into(),
            "sim".into(),
            "2024-03-15 10:30".into(),
        ]),
        Record::from_iter([
            CellValue::from(2),
            "José".into(),
            CellValue::Null,
            "nan".into(),
            "Recife".into(),
            0.into(),
            CellValue::Null,
        ]),
    ];
    let conversion = converter.run(&rows).unwrap();
    assert!(conversion.report.is_clean());

    let outputs: Vec<&GeneratedSql> = conversion.generated().collect();
    assert_eq!(outputs.len(), 4);

    for (i, a) in outputs.iter().enumerate() {
        for b in &outputs[i + 1..] {
            assert_ne!(a.create_table, b.create_table);
        }
    }

    let row_content: Vec<String> = outputs
        .iter()
        .map(|g| {
            let inserts: Vec<&String> =
                g.inserts.iter().filter(|s| s.starts_with("INSERT")).collect();
            assert_eq!(inserts.len(), 1, "{}", g.dialect);
            normalize_literals(values_section(inserts[0]))
        })
        .collect();

    assert_eq!(
        row_content[0],
        "(1, 'Maria D''Ávila', 'maria@example.com', '81988887777', 'Olinda', 1, '2024-03-15 10:30:00'),\n(2, 'José', NULL, NULL, 'Recife', 0, NULL)"
    );
    for content in &row_content[1..] {
        assert_eq!(content, &row_content[0]);
    }

    let sqlserver = conversion.output(Dialect::SqlServer).unwrap();
    assert_eq!(
        sqlserver.inserts.first().map(String::as_str),
        Some("SET IDENTITY_INSERT [cadastro] ON")
    );
}

#[test]
fn test_excluded_rows_are_enumerable() {
    let converter = Converter::from_ddl(Some(PRODUTOS), ConvertOptions::default()).unwrap();
    let rows = vec![
        Record::from_iter([CellValue::Null, "Lapis".into(), 1.5.into()]),
        Record::from_iter([CellValue::Null, CellValue::Null, 2.into()]),
        Record::from_iter([CellValue::Null, "Borracha".into(), "barato".into()]),
        Record::from_iter([CellValue::Null, "Regua".into()]),
    ];
    let conversion = converter.run(&rows).unwrap();

    let blocked: Vec<usize> = conversion.report.blocked_rows().into_iter().collect();
    assert_eq!(blocked, vec![1, 2, 3]);
    for generated in conversion.generated() {
        assert_eq!(generated.skipped_rows, vec![1, 2, 3]);
        assert_eq!(generated.row_count, 1);
    }

    let kinds: Vec<IssueKind> = conversion.report.issues().iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            IssueKind::NullNotAllowed,
            IssueKind::TypeMismatch,
            IssueKind::MissingColumn,
        ]
    );
}

#[test]
fn test_dialect_subset_and_script() {
    let options = ConvertOptions {
        dialects: vec![Dialect::SQLite],
        batch_size: 1,
        ..ConvertOptions::default()
    };
    let converter = Converter::from_ddl(Some(PRODUTOS), options).unwrap();
    let rows: Vec<Record> = (0..3)
        .map(|i| Record::from_iter([CellValue::Null, format!("Item {}", i).into(), 1.into()]))
        .collect();
    let conversion = converter.run(&rows).unwrap();

    assert_eq!(conversion.outputs.len(), 1);
    let sqlite = conversion.output(Dialect::SQLite).unwrap();
    assert_eq!(sqlite.inserts.len(), 3);

    let script = sqlite.to_script(None);
    assert!(script.contains("-- SQLite script for table produtos"));
    assert_eq!(script.matches("INSERT INTO \"produtos\"").count(), 3);
    assert!(script.contains("\"preco\" NUMERIC(10,2)\n);\n"));
}
