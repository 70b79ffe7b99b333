pub mod odbc;

use crate::error::GatewayError;
use crate::output;
use secrecy::SecretString;
use std::ops::{Deref, DerefMut};

/// Metadata for a single result column.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub type_name: String,
}

/// A single cell value from a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    /// DECIMAL/NUMERIC text as the driver reported it. Kept exact.
    Decimal(String),
    Bool(bool),
    /// Dates, times, binary and anything else without a JSON scalar of its own.
    Other(String),
}

/// Rows fetched from one statement or catalog call.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RowSet {
    /// Position of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Credentials and target for a single connection.
#[derive(Debug)]
pub struct ConnectionParams {
    pub endpoint: String,
    pub username: String,
    pub password: SecretString,
}

/// An open database connection.
///
/// Catalog methods return the ODBC catalog column names (`COLUMN_NAME`,
/// `KEY_SEQ`, `INDEX_NAME`, ...) so callers stay independent of how a driver
/// obtains them.
pub trait Session {
    /// Run a row-returning statement, stopping after `limit` rows.
    fn query(&mut self, sql: &str, limit: Option<usize>) -> Result<RowSet, GatewayError>;

    /// Run a mutation and report the affected row count.
    fn execute(&mut self, sql: &str) -> Result<usize, GatewayError>;

    fn columns(&mut self, schema: &str, table: &str) -> Result<RowSet, GatewayError>;

    fn primary_keys(&mut self, schema: &str, table: &str) -> Result<RowSet, GatewayError>;

    fn index_info(&mut self, schema: &str, table: &str) -> Result<RowSet, GatewayError>;

    fn close(&mut self) -> Result<(), GatewayError>;
}

/// Opens sessions. Resolved once at startup.
pub trait Driver {
    type Session: Session;

    fn open(&self, params: &ConnectionParams) -> Result<Self::Session, GatewayError>;
}

/// Closes the wrapped session when dropped. Close failures are reported as
/// warnings and never replace the operation's own result.
pub struct ScopedSession<S: Session> {
    inner: S,
}

impl<S: Session> ScopedSession<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Session> Deref for ScopedSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: Session> DerefMut for ScopedSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Session> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            output::print_warning(&format!("failed to close connection: {}", e));
        }
    }
}
