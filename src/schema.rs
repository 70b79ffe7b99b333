use crate::backend::{CellValue, RowSet, Session};
use crate::convert;
use crate::error::GatewayError;
use crate::output;
use serde::Serialize;
use serde_json::Value;

/// Upper bound on sampled rows, whatever the configuration asks for.
pub const MAX_SAMPLE_ROWS: usize = 3;

/// Where and how much to sample when describing a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSettings {
    pub namespace: String,
    pub sample_rows: usize,
    pub sample_max_chars: usize,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            namespace: "PUB".to_string(),
            sample_rows: MAX_SAMPLE_ROWS,
            sample_max_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub size: i64,
    pub decimal_digits: i64,
    pub nullable: bool,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PrimaryKeyColumn {
    pub column_name: String,
    pub key_seq: i64,
    pub pk_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexColumn {
    pub column_name: String,
    pub ordinal_position: i64,
    pub asc_or_desc: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexDescriptor {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<IndexColumn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescriptor {
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_keys: Vec<PrimaryKeyColumn>,
    pub indexes: Vec<IndexDescriptor>,
    pub sample_data: Vec<Value>,
    pub column_count: usize,
    pub primary_key_count: usize,
    pub index_count: usize,
}

/// Describe `table` from catalog metadata plus a few sample rows.
///
/// Metadata failures abort; a failing sample query only costs the sample.
pub fn describe_table<S: Session>(
    session: &mut S,
    settings: &SchemaSettings,
    table: &str,
) -> Result<SchemaDescriptor, GatewayError> {
    let catalog_table = table.to_uppercase();

    let columns = column_descriptors(&session.columns(&settings.namespace, &catalog_table)?);
    let primary_keys =
        primary_key_columns(&session.primary_keys(&settings.namespace, &catalog_table)?);
    let indexes = group_indexes(&session.index_info(&settings.namespace, &catalog_table)?);

    let sample_rows = settings.sample_rows.min(MAX_SAMPLE_ROWS);
    let sample_sql = format!(
        "SELECT TOP {} * FROM {}.{}",
        sample_rows, settings.namespace, table
    );
    let sample_data = match session.query(&sample_sql, Some(sample_rows)) {
        Ok(rows) => convert::rows_to_json(&rows, Some(settings.sample_max_chars)),
        Err(e) => {
            output::print_warning(&format!("could not fetch sample data: {}", e));
            Vec::new()
        }
    };

    Ok(SchemaDescriptor {
        table_name: table.to_lowercase(),
        column_count: columns.len(),
        primary_key_count: primary_keys.len(),
        index_count: indexes.len(),
        columns,
        primary_keys,
        indexes,
        sample_data,
    })
}

static NULL_CELL: CellValue = CellValue::Null;

/// Reads catalog rows by column name, tolerating absent columns.
struct CatalogRow<'a> {
    rows: &'a RowSet,
    row: &'a [CellValue],
}

impl<'a> CatalogRow<'a> {
    fn cell(&self, name: &str) -> &'a CellValue {
        self.rows
            .column_index(name)
            .and_then(|i| self.row.get(i))
            .unwrap_or(&NULL_CELL)
    }

    fn text(&self, name: &str) -> Option<String> {
        match self.cell(name) {
            CellValue::Null => None,
            CellValue::Text(s) | CellValue::Other(s) | CellValue::Decimal(s) => Some(s.clone()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }

    fn int(&self, name: &str) -> i64 {
        match self.cell(name) {
            CellValue::Int(i) => *i,
            CellValue::Float(f) => *f as i64,
            CellValue::Bool(b) => i64::from(*b),
            CellValue::Text(s) | CellValue::Other(s) | CellValue::Decimal(s) => {
                s.trim().parse().unwrap_or(0)
            }
            CellValue::Null => 0,
        }
    }

    fn flag(&self, name: &str) -> bool {
        match self.cell(name) {
            CellValue::Bool(b) => *b,
            CellValue::Null => false,
            _ => self.int(name) != 0,
        }
    }
}

fn catalog_rows(rows: &RowSet) -> impl Iterator<Item = CatalogRow<'_>> {
    rows.rows.iter().map(move |row| CatalogRow { rows, row })
}

/// Column descriptors from an ODBC `SQLColumns`-shaped result.
pub fn column_descriptors(rows: &RowSet) -> Vec<ColumnDescriptor> {
    catalog_rows(rows)
        .filter_map(|r| {
            let name = r.text("COLUMN_NAME")?;
            Some(ColumnDescriptor {
                name: name.to_lowercase(),
                type_name: r.text("TYPE_NAME").unwrap_or_default(),
                size: r.int("COLUMN_SIZE"),
                decimal_digits: r.int("DECIMAL_DIGITS"),
                // SQL_NULLABLE = 1
                nullable: r.flag("NULLABLE"),
                default_value: r.text("COLUMN_DEF"),
            })
        })
        .collect()
}

pub fn primary_key_columns(rows: &RowSet) -> Vec<PrimaryKeyColumn> {
    catalog_rows(rows)
        .filter_map(|r| {
            let name = r.text("COLUMN_NAME")?;
            Some(PrimaryKeyColumn {
                column_name: name.to_lowercase(),
                key_seq: r.int("KEY_SEQ"),
                pk_name: r.text("PK_NAME"),
            })
        })
        .collect()
}

/// Fold one-row-per-(index, column) metadata into one descriptor per index.
///
/// Indexes keep the order they were first seen in, and so do their columns.
/// Uniqueness comes from an index's first row. Rows without an index name
/// (table statistics) are skipped.
pub fn group_indexes(rows: &RowSet) -> Vec<IndexDescriptor> {
    let mut indexes: Vec<IndexDescriptor> = Vec::new();

    for r in catalog_rows(rows) {
        let Some(index_name) = r.text("INDEX_NAME") else {
            continue;
        };
        let column = IndexColumn {
            column_name: r.text("COLUMN_NAME").unwrap_or_default().to_lowercase(),
            ordinal_position: r.int("ORDINAL_POSITION"),
            asc_or_desc: r.text("ASC_OR_DESC"),
        };

        match indexes.iter_mut().find(|idx| idx.name == index_name) {
            Some(idx) => idx.columns.push(column),
            None => indexes.push(IndexDescriptor {
                name: index_name,
                unique: !r.flag("NON_UNIQUE"),
                columns: vec![column],
            }),
        }
    }

    indexes
}
