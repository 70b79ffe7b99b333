use crate::backend::{CellValue, ColumnMeta, ConnectionParams, Driver, RowSet, Session};
use crate::endpoint::{self, EndpointKind};
use crate::error::GatewayError;
use odbc_api::buffers::{BufferDesc, ColumnarAnyBuffer};
use odbc_api::{ColumnDescription, Connection, ConnectionOptions, Cursor, DataType, Environment};
use secrecy::ExposeSecret;
use std::sync::OnceLock;

const BATCH_SIZE: usize = 256;
const MAX_TEXT_LEN: usize = 16 * 1024;

/// Driver factory for ODBC data sources.
pub struct OdbcDriver {
    driver_name: String,
}

impl OdbcDriver {
    pub fn new(driver_name: String) -> Self {
        Self { driver_name }
    }

    /// Build the ODBC connection string for the given endpoint.
    pub fn connection_string(&self, params: &ConnectionParams) -> String {
        let mut parts = match endpoint::classify(&params.endpoint) {
            EndpointKind::Url {
                host,
                port,
                properties,
            } => {
                let mut parts = vec![
                    format!("Driver={{{}}}", self.driver_name),
                    format!("HostName={}", host),
                ];
                if let Some(port) = port {
                    parts.push(format!("PortNumber={}", port));
                }
                for (key, value) in properties {
                    if key.eq_ignore_ascii_case("databaseName") {
                        parts.push(format!("DatabaseName={}", value));
                    } else {
                        parts.push(format!("{}={}", key, value));
                    }
                }
                parts
            }
            EndpointKind::ConnectionString => params
                .endpoint
                .split(';')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.to_string())
                .collect(),
            EndpointKind::Dsn => vec![format!("DSN={}", params.endpoint)],
        };

        parts.push(format!("UID={}", params.username));
        parts.push(format!(
            "PWD={}",
            odbc_api::escape_attribute_value(params.password.expose_secret())
        ));

        parts.join(";") + ";"
    }
}

fn environment() -> Result<&'static Environment, GatewayError> {
    static ENV: OnceLock<Environment> = OnceLock::new();
    if let Some(env) = ENV.get() {
        return Ok(env);
    }
    let env = Environment::new().map_err(|e| GatewayError::DriverUnavailable {
        message: format!("ODBC driver manager unavailable: {}", e),
    })?;
    Ok(ENV.get_or_init(|| env))
}

/// Map a connect failure, telling a missing driver apart from a refused login.
fn connect_error(e: odbc_api::Error) -> GatewayError {
    if let odbc_api::Error::Diagnostics { record, .. } = &e {
        // IM002: data source not found, IM003: driver could not be loaded
        if matches!(record.state.as_str(), "IM002" | "IM003") {
            return GatewayError::DriverUnavailable {
                message: format!("ODBC driver not found: {}", e),
            };
        }
    }
    GatewayError::Connection {
        message: format!("connection failed: {}", e),
    }
}

impl Driver for OdbcDriver {
    type Session = OdbcSession;

    fn open(&self, params: &ConnectionParams) -> Result<OdbcSession, GatewayError> {
        let env = environment()?;
        let conn = env
            .connect_with_connection_string(
                &self.connection_string(params),
                ConnectionOptions::default(),
            )
            .map_err(connect_error)?;
        Ok(OdbcSession { conn: Some(conn) })
    }
}

pub struct OdbcSession {
    conn: Option<Connection<'static>>,
}

impl OdbcSession {
    fn conn(&self) -> Result<&Connection<'static>, GatewayError> {
        self.conn.as_ref().ok_or_else(|| GatewayError::Connection {
            message: "connection already closed".to_string(),
        })
    }
}

impl Session for OdbcSession {
    fn query(&mut self, sql: &str, limit: Option<usize>) -> Result<RowSet, GatewayError> {
        let cursor = self
            .conn()?
            .execute(sql, (), None)
            .map_err(|e| GatewayError::Query {
                message: format!("query execution failed: {}", e),
            })?;

        match cursor {
            Some(cursor) => read_rows(cursor, limit),
            None => Ok(RowSet::default()),
        }
    }

    fn execute(&mut self, sql: &str) -> Result<usize, GatewayError> {
        let mut stmt = self
            .conn()?
            .preallocate()
            .map_err(|e| GatewayError::Query {
                message: format!("failed to allocate statement: {}", e),
            })?;
        stmt.execute(sql, ()).map_err(|e| GatewayError::Query {
            message: format!("statement execution failed: {}", e),
        })?;
        let affected = stmt.row_count().map_err(|e| GatewayError::Query {
            message: format!("failed to read affected row count: {}", e),
        })?;
        Ok(affected.unwrap_or(0))
    }

    fn columns(&mut self, schema: &str, table: &str) -> Result<RowSet, GatewayError> {
        let cursor = self
            .conn()?
            .columns("", schema, table, "%")
            .map_err(|e| GatewayError::Query {
                message: format!("failed to read column metadata: {}", e),
            })?;
        read_rows(cursor, None)
    }

    fn primary_keys(&mut self, schema: &str, table: &str) -> Result<RowSet, GatewayError> {
        let sql = format!(
            "SELECT k.COLNAME AS COLUMN_NAME, k.KEYSEQ AS KEY_SEQ, k.CNSTRNAME AS PK_NAME \
             FROM SYSPROGRESS.SYS_KEYCOL_USAGE k, SYSPROGRESS.SYS_TBL_CONSTRS c \
             WHERE c.CNSTRNAME = k.CNSTRNAME AND c.OWNER = k.OWNER AND c.CNSTRTYPE = 'P' \
             AND k.OWNER = '{}' AND UPPER(k.TBLNAME) = '{}' ORDER BY k.KEYSEQ",
            quote_literal(schema),
            quote_literal(table)
        );
        self.query(&sql, None)
    }

    fn index_info(&mut self, schema: &str, table: &str) -> Result<RowSet, GatewayError> {
        let sql = format!(
            "SELECT IDXNAME AS INDEX_NAME, \
             CASE WHEN IDXTYPE = 'U' THEN 0 ELSE 1 END AS NON_UNIQUE, \
             COLNAME AS COLUMN_NAME, IDXSEQ AS ORDINAL_POSITION, IDXORDER AS ASC_OR_DESC \
             FROM SYSPROGRESS.SYSINDEXES \
             WHERE IDXOWNER = '{}' AND UPPER(TBL) = '{}' ORDER BY IDXNAME, IDXSEQ",
            quote_literal(schema),
            quote_literal(table)
        );
        self.query(&sql, None)
    }

    fn close(&mut self) -> Result<(), GatewayError> {
        // odbc-api disconnects on drop
        drop(self.conn.take());
        Ok(())
    }
}

fn quote_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Bound text buffer length for a column, or `None` when its values can be
/// longer than a bound buffer may hold and must be read one row at a time.
pub fn text_buffer_len(data_type: &DataType) -> Option<usize> {
    // up to 4 bytes per character in UTF-8
    data_type
        .display_size()
        .map(|n| n.get().saturating_mul(4))
        .filter(|&len| len <= MAX_TEXT_LEN)
}

/// Fetch rows from a cursor. Every column is read as text and typed back
/// from the column's declared SQL type.
///
/// Result sets whose columns all fit a bound buffer are fetched in blocks.
/// Any long column (LONGVARCHAR, CLOB, unsized VARCHAR) switches the whole
/// result to row-by-row reads, which have no size limit.
fn read_rows(mut cursor: impl Cursor, limit: Option<usize>) -> Result<RowSet, GatewayError> {
    let num_cols = cursor.num_result_cols().map_err(|e| GatewayError::Query {
        message: format!("failed to get column count: {}", e),
    })? as usize;

    let mut columns = Vec::with_capacity(num_cols);
    let mut data_types = Vec::with_capacity(num_cols);

    for i in 1..=num_cols as u16 {
        let mut col_desc = ColumnDescription::default();
        cursor
            .describe_col(i, &mut col_desc)
            .map_err(|e| GatewayError::Query {
                message: format!("failed to describe column {}: {}", i, e),
            })?;

        let name = col_desc.name_to_string().map_err(|e| GatewayError::Query {
            message: format!("failed to decode column name {}: {}", i, e),
        })?;

        columns.push(ColumnMeta {
            name,
            type_name: format!("{:?}", col_desc.data_type),
        });
        data_types.push(col_desc.data_type);
    }

    let buffer_lens: Option<Vec<usize>> = data_types.iter().map(text_buffer_len).collect();
    let rows = match buffer_lens {
        Some(lens) => read_blocks(cursor, &data_types, lens, limit)?,
        None => read_row_by_row(cursor, &data_types, limit)?,
    };

    Ok(RowSet { columns, rows })
}

fn read_blocks(
    cursor: impl Cursor,
    data_types: &[DataType],
    buffer_lens: Vec<usize>,
    limit: Option<usize>,
) -> Result<Vec<Vec<CellValue>>, GatewayError> {
    let buffer_descs = buffer_lens
        .into_iter()
        .map(|len| BufferDesc::Text {
            max_str_len: len.max(1),
        });

    let buffer = ColumnarAnyBuffer::try_from_descs(BATCH_SIZE, buffer_descs).map_err(|e| {
        GatewayError::Query {
            message: format!("failed to create buffer: {}", e),
        }
    })?;

    let mut row_set_cursor = cursor.bind_buffer(buffer).map_err(|e| GatewayError::Query {
        message: format!("failed to bind buffer: {}", e),
    })?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut limit_reached = false;

    // a value longer than its buffer is an error, never a silent cut
    while let Some(batch) = row_set_cursor
        .fetch_with_truncation_check(true)
        .map_err(|e| GatewayError::Query {
            message: format!("fetch error: {}", e),
        })?
    {
        for row_idx in 0..batch.num_rows() {
            if let Some(lim) = limit
                && rows.len() >= lim
            {
                limit_reached = true;
                break;
            }

            let mut row = Vec::with_capacity(data_types.len());
            for (col_idx, data_type) in data_types.iter().enumerate() {
                let cell = batch
                    .column(col_idx)
                    .as_text_view()
                    .and_then(|view| view.get(row_idx))
                    .map(|bytes| {
                        cell_from_text(data_type, String::from_utf8_lossy(bytes).into_owned())
                    })
                    .unwrap_or(CellValue::Null);
                row.push(cell);
            }
            rows.push(row);
        }

        if limit_reached {
            break;
        }
    }

    Ok(rows)
}

fn read_row_by_row(
    mut cursor: impl Cursor,
    data_types: &[DataType],
    limit: Option<usize>,
) -> Result<Vec<Vec<CellValue>>, GatewayError> {
    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut buf = Vec::new();

    while limit.is_none_or(|lim| rows.len() < lim) {
        let Some(mut cursor_row) = cursor.next_row().map_err(|e| GatewayError::Query {
            message: format!("fetch error: {}", e),
        })?
        else {
            break;
        };

        let mut row = Vec::with_capacity(data_types.len());
        for (col_idx, data_type) in data_types.iter().enumerate() {
            buf.clear();
            let col = col_idx as u16 + 1;
            let present = cursor_row
                .get_text(col, &mut buf)
                .map_err(|e| GatewayError::Query {
                    message: format!("failed to read column {}: {}", col, e),
                })?;
            row.push(if present {
                cell_from_text(data_type, String::from_utf8_lossy(&buf).into_owned())
            } else {
                CellValue::Null
            });
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Type a text-bound value back using the column's declared SQL type.
pub fn cell_from_text(data_type: &DataType, text: String) -> CellValue {
    match data_type {
        DataType::TinyInt
        | DataType::SmallInt
        | DataType::Integer
        | DataType::BigInt
        | DataType::Real
        | DataType::Float { .. }
        | DataType::Double => parse_number(text),
        DataType::Decimal { .. } | DataType::Numeric { .. } => parse_decimal(text),
        DataType::Bit => match text.trim() {
            "1" => CellValue::Bool(true),
            "0" => CellValue::Bool(false),
            t if t.eq_ignore_ascii_case("true") => CellValue::Bool(true),
            t if t.eq_ignore_ascii_case("false") => CellValue::Bool(false),
            _ => CellValue::Other(text),
        },
        DataType::Char { .. }
        | DataType::WChar { .. }
        | DataType::Varchar { .. }
        | DataType::WVarchar { .. }
        | DataType::LongVarchar { .. }
        | DataType::WLongVarchar { .. } => CellValue::Text(text),
        _ => CellValue::Other(text),
    }
}

fn parse_number(text: String) -> CellValue {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return CellValue::Int(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) => CellValue::Float(f),
        Err(_) => CellValue::Other(text),
    }
}

/// Whole values fitting an i64 become integers; everything else keeps the
/// driver's exact decimal text.
fn parse_decimal(text: String) -> CellValue {
    let trimmed = text.trim();
    match trimmed.parse::<i64>() {
        Ok(i) => CellValue::Int(i),
        Err(_) if trimmed.is_empty() => CellValue::Other(text),
        Err(_) => CellValue::Decimal(trimmed.to_string()),
    }
}
