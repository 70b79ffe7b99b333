mod support;

use edgegate::backend::{CellValue, ScopedSession};
use edgegate::backend::Driver;
use edgegate::schema::{
    column_descriptors, describe_table, group_indexes, primary_key_columns, SchemaSettings,
};
use serde_json::json;
use support::{params, row_set, text, MockDriver};

fn index_rows(rows: Vec<(&str, i64, &str, i64, &str)>) -> edgegate::backend::RowSet {
    row_set(
        &["INDEX_NAME", "NON_UNIQUE", "COLUMN_NAME", "ORDINAL_POSITION", "ASC_OR_DESC"],
        rows.into_iter()
            .map(|(name, non_unique, col, pos, dir)| {
                vec![
                    text(name),
                    CellValue::Int(non_unique),
                    text(col),
                    CellValue::Int(pos),
                    text(dir),
                ]
            })
            .collect(),
    )
}

// --- Index grouping ---

#[test]
fn test_two_columns_same_index_grouped() {
    let rows = index_rows(vec![
        ("IX_NOME", 1, "NOMTRN", 1, "A"),
        ("IX_NOME", 1, "CODTRN", 2, "D"),
    ]);
    let indexes = group_indexes(&rows);

    assert_eq!(indexes.len(), 1);
    let idx = &indexes[0];
    assert_eq!(idx.name, "IX_NOME");
    assert!(!idx.unique);
    let cols: Vec<(&str, i64)> = idx
        .columns
        .iter()
        .map(|c| (c.column_name.as_str(), c.ordinal_position))
        .collect();
    assert_eq!(cols, vec![("nomtrn", 1), ("codtrn", 2)]);
    assert_eq!(idx.columns[1].asc_or_desc.as_deref(), Some("D"));
}

#[test]
fn test_indexes_keep_first_seen_order_and_uniqueness() {
    let rows = index_rows(vec![
        ("PK_TRN", 0, "CODTRN", 1, "A"),
        ("IX_NOME", 1, "NOMTRN", 1, "A"),
        // a later row disagreeing on uniqueness does not change the index
        ("PK_TRN", 1, "FILIAL", 2, "A"),
    ]);
    let indexes = group_indexes(&rows);

    let names: Vec<&str> = indexes.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["PK_TRN", "IX_NOME"]);
    assert!(indexes[0].unique);
    assert_eq!(indexes[0].columns.len(), 2);
}

#[test]
fn test_rows_without_index_name_skipped() {
    let mut rows = index_rows(vec![("IX_NOME", 1, "NOMTRN", 1, "A")]);
    rows.rows.push(vec![
        CellValue::Null,
        CellValue::Null,
        CellValue::Null,
        CellValue::Int(0),
        CellValue::Null,
    ]);
    assert_eq!(group_indexes(&rows).len(), 1);
}

// --- Columns and keys ---

#[test]
fn test_column_descriptors_from_catalog() {
    let rows = row_set(
        &["COLUMN_NAME", "TYPE_NAME", "COLUMN_SIZE", "DECIMAL_DIGITS", "NULLABLE", "COLUMN_DEF"],
        vec![
            vec![
                text("CODTRN"),
                text("INTEGER"),
                CellValue::Int(10),
                CellValue::Int(0),
                CellValue::Int(0),
                CellValue::Null,
            ],
            vec![
                text("NOMTRN"),
                text("VARCHAR"),
                CellValue::Int(40),
                CellValue::Null,
                CellValue::Int(1),
                text("''"),
            ],
        ],
    );
    let cols = column_descriptors(&rows);

    assert_eq!(cols.len(), 2);
    assert_eq!(cols[0].name, "codtrn");
    assert_eq!(cols[0].type_name, "INTEGER");
    assert_eq!(cols[0].size, 10);
    assert!(!cols[0].nullable);
    assert_eq!(cols[0].default_value, None);
    assert_eq!(cols[1].decimal_digits, 0);
    assert!(cols[1].nullable);
    assert_eq!(cols[1].default_value.as_deref(), Some("''"));
}

#[test]
fn test_primary_keys_from_catalog() {
    let rows = row_set(
        &["column_name", "key_seq", "pk_name"],
        vec![vec![text("CODTRN"), CellValue::Int(1), text("PK_TRANSPORTE")]],
    );
    let pks = primary_key_columns(&rows);
    assert_eq!(pks.len(), 1);
    assert_eq!(pks[0].column_name, "codtrn");
    assert_eq!(pks[0].key_seq, 1);
    assert_eq!(pks[0].pk_name.as_deref(), Some("PK_TRANSPORTE"));
}

// --- Full descriptor ---

fn populated_driver() -> MockDriver {
    MockDriver::new(|s| {
        s.columns = row_set(
            &["COLUMN_NAME", "TYPE_NAME", "COLUMN_SIZE", "DECIMAL_DIGITS", "NULLABLE"],
            vec![vec![
                text("CODTRN"),
                text("INTEGER"),
                CellValue::Int(10),
                CellValue::Int(0),
                CellValue::Int(0),
            ]],
        );
        s.indexes = index_rows(vec![("IX_COD", 0, "CODTRN", 1, "A")]);
        s.rows = row_set(
            &["CODTRN", "OBS"],
            vec![
                vec![CellValue::Int(1), text(&"o".repeat(150))],
                vec![CellValue::Int(2), text(&"p".repeat(100))],
                vec![CellValue::Int(3), CellValue::Null],
                vec![CellValue::Int(4), text("extra")],
            ],
        );
    })
}

#[test]
fn test_describe_table_counts_and_sample() {
    let driver = populated_driver();
    let mut session = driver.open(&params()).unwrap();
    let schema = describe_table(&mut session, &SchemaSettings::default(), "Transporte").unwrap();

    assert_eq!(schema.table_name, "transporte");
    assert_eq!(schema.column_count, 1);
    assert_eq!(schema.primary_key_count, 0);
    assert_eq!(schema.index_count, 1);
    assert_eq!(schema.sample_data.len(), 3, "sample is capped at 3 rows");
    assert_eq!(
        schema.sample_data[0],
        json!({ "codtrn": 1, "obs": format!("{}...", "o".repeat(100)) })
    );
    assert_eq!(schema.sample_data[1]["obs"], json!("p".repeat(100)));
    assert_eq!(schema.sample_data[2]["obs"], json!(null));

    let queries = driver.state.borrow().queries.clone();
    assert_eq!(queries, vec!["SELECT TOP 3 * FROM PUB.Transporte".to_string()]);
}

#[test]
fn test_catalog_calls_use_namespace_and_uppercased_table() {
    let driver = populated_driver();
    let mut session = driver.open(&params()).unwrap();
    let schema = describe_table(&mut session, &SchemaSettings::default(), "TransPorte").unwrap();

    assert_eq!(schema.table_name, "transporte");
    let calls = driver.state.borrow().catalog_calls.clone();
    let expected: Vec<(String, String, String)> = ["columns", "primary_keys", "index_info"]
        .iter()
        .map(|call| (call.to_string(), "PUB".to_string(), "TRANSPORTE".to_string()))
        .collect();
    assert_eq!(calls, expected);
}

#[test]
fn test_catalog_calls_follow_configured_namespace() {
    let driver = populated_driver();
    let mut session = driver.open(&params()).unwrap();
    let settings = SchemaSettings {
        namespace: "ERP".to_string(),
        ..SchemaSettings::default()
    };
    describe_table(&mut session, &settings, "veiculo").unwrap();

    let state = driver.state.borrow();
    assert!(state.catalog_calls.iter().all(|(_, ns, table)| ns == "ERP" && table == "VEICULO"));
    assert_eq!(state.queries, vec!["SELECT TOP 3 * FROM ERP.veiculo".to_string()]);
}

#[test]
fn test_oversized_sample_setting_is_capped() {
    let driver = populated_driver();
    let mut session = driver.open(&params()).unwrap();
    let settings = SchemaSettings {
        sample_rows: 10,
        ..SchemaSettings::default()
    };
    let schema = describe_table(&mut session, &settings, "transporte").unwrap();

    assert_eq!(schema.sample_data.len(), 3);
    assert_eq!(
        driver.state.borrow().queries,
        vec!["SELECT TOP 3 * FROM PUB.transporte".to_string()]
    );
}

#[test]
fn test_sampling_failure_yields_empty_sample() {
    let driver = populated_driver();
    driver.state.borrow_mut().fail_queries_containing = Some("SELECT TOP 3".to_string());
    let mut session = driver.open(&params()).unwrap();

    let schema = describe_table(&mut session, &SchemaSettings::default(), "transporte")
        .expect("sampling failure must not fail the schema request");
    assert!(schema.sample_data.is_empty());
    assert_eq!(schema.column_count, 1);
}

#[test]
fn test_metadata_failure_propagates_and_session_closes() {
    let driver = populated_driver();
    driver.state.borrow_mut().metadata_error = true;
    {
        let mut session = ScopedSession::new(driver.open(&params()).unwrap());
        let result = describe_table(&mut *session, &SchemaSettings::default(), "transporte");
        assert!(result.is_err());
    }
    assert_eq!(driver.closes(), 1);
}
