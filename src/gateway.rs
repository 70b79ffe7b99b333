//! Per-invocation operations: validate, connect, run one statement, shape
//! the result, close.

use crate::backend::{ConnectionParams, Driver, ScopedSession, Session};
use crate::config::AppConfig;
use crate::convert;
use crate::endpoint;
use crate::error::GatewayError;
use crate::masking;
use crate::output::Envelope;
use crate::paging;
use crate::schema::{self, SchemaDescriptor};
use crate::validation::{self, StatementClass, ValidationResult};
use crate::verbose::{self, Timer};
use serde::Serialize;
use serde_json::Value;

/// One requested operation with its parameters resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Test,
    Listing {
        where_clause: Option<String>,
        limit: usize,
    },
    Page {
        where_clause: Option<String>,
        limit: usize,
        offset: usize,
    },
    Query {
        sql: String,
    },
    Update {
        sql: String,
    },
    Schema {
        table: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ConnectionInfo {
    pub host: String,
    pub database: String,
    pub timestamp: String,
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
pub struct Listing {
    pub transportes: Vec<Value>,
    pub total: usize,
    pub sql_executed: String,
}

#[derive(Debug, Serialize)]
pub struct Page {
    pub results: Vec<Value>,
    pub count: usize,
    pub sql_executed: String,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub results: Vec<Value>,
    pub total: usize,
    pub sql: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateOutput {
    pub affected_rows: usize,
    pub sql: String,
}

pub struct Gateway<D: Driver> {
    driver: D,
    config: AppConfig,
}

impl<D: Driver> Gateway<D> {
    pub fn new(driver: D, config: AppConfig) -> Self {
        Self { driver, config }
    }

    /// Run an action and wrap the outcome in an envelope.
    pub fn run(&self, params: &ConnectionParams, action: &Action) -> Envelope {
        let result = match action {
            Action::Test => self
                .test_connection(params)
                .map(|d| Envelope::ok("connection established", d)),
            Action::Listing {
                where_clause,
                limit,
            } => self
                .list(params, where_clause.as_deref(), *limit)
                .map(|d| Envelope::ok("listing retrieved", d)),
            Action::Page {
                where_clause,
                limit,
                offset,
            } => self
                .list_page(params, where_clause.as_deref(), *limit, *offset)
                .map(|d| Envelope::ok("page retrieved", d)),
            Action::Query { sql } => self
                .query(params, sql)
                .map(|d| Envelope::ok("query executed", d)),
            Action::Update { sql } => self
                .update(params, sql)
                .map(|d| Envelope::ok("statement executed", d)),
            Action::Schema { table } => self
                .schema(params, table)
                .map(|d| Envelope::ok("table schema retrieved", d)),
        };

        result.unwrap_or_else(|e| {
            verbose::emit(self.config.verbose, &format!("failed: {}", e));
            Envelope::failure(&e)
        })
    }

    fn connect(&self, params: &ConnectionParams) -> Result<ScopedSession<D::Session>, GatewayError> {
        verbose::emit(
            self.config.verbose,
            &format!(
                "connecting to {} as {} (password {})...",
                masking::redact_connection_string(&params.endpoint, self.config.show_secrets),
                params.username,
                masking::format_secret(&params.password, self.config.show_secrets)
            ),
        );
        let timer = Timer::start();
        let session = self.driver.open(params)?;
        timer.finish(self.config.verbose, "connected", None);
        Ok(ScopedSession::new(session))
    }

    fn fetch(
        &self,
        session: &mut impl Session,
        sql: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, GatewayError> {
        verbose::emit(self.config.verbose, &format!("executing: {}", sql));
        let timer = Timer::start();
        let rows = session.query(sql, limit)?;
        timer.finish(
            self.config.verbose,
            "query complete",
            Some(&format!("{} rows", rows.rows.len())),
        );
        Ok(convert::rows_to_json(&rows, None))
    }

    fn check(&self, sql: &str, class: StatementClass) -> Result<(), GatewayError> {
        match validation::validate(sql, class) {
            ValidationResult::Allowed => Ok(()),
            ValidationResult::Denied { reason } => Err(GatewayError::Validation { reason }),
        }
    }

    pub fn test_connection(&self, params: &ConnectionParams) -> Result<ConnectionInfo, GatewayError> {
        let _session = self.connect(params)?;
        Ok(ConnectionInfo {
            host: endpoint::extract_host(&params.endpoint),
            database: endpoint::extract_database(&params.endpoint),
            timestamp: chrono::Local::now().to_rfc3339(),
            endpoint: masking::redact_connection_string(&params.endpoint, false),
        })
    }

    pub fn list(
        &self,
        params: &ConnectionParams,
        where_clause: Option<&str>,
        limit: usize,
    ) -> Result<Listing, GatewayError> {
        let sql = paging::listing_sql(&self.config.listing, where_clause);
        let mut session = self.connect(params)?;
        let rows = self.fetch(&mut *session, &sql, Some(limit))?;
        Ok(Listing {
            total: rows.len(),
            transportes: rows,
            sql_executed: sql,
        })
    }

    pub fn list_page(
        &self,
        params: &ConnectionParams,
        where_clause: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Page, GatewayError> {
        let sql = paging::paginated_sql(&self.config.listing, where_clause, limit, offset);
        let mut session = self.connect(params)?;
        let rows = self.fetch(&mut *session, &sql, None)?;
        Ok(Page {
            count: rows.len(),
            results: rows,
            sql_executed: sql,
            limit,
            offset,
        })
    }

    /// Run a caller-supplied SELECT. Anything else is rejected before connecting.
    pub fn query(&self, params: &ConnectionParams, sql: &str) -> Result<QueryOutput, GatewayError> {
        self.check(sql, StatementClass::Query)?;
        let mut session = self.connect(params)?;
        let rows = self.fetch(&mut *session, sql, None)?;
        Ok(QueryOutput {
            total: rows.len(),
            results: rows,
            sql: sql.to_string(),
        })
    }

    /// Run a caller-supplied UPDATE, INSERT or DELETE.
    pub fn update(&self, params: &ConnectionParams, sql: &str) -> Result<UpdateOutput, GatewayError> {
        self.check(sql, StatementClass::Mutation)?;
        let mut session = self.connect(params)?;
        verbose::emit(self.config.verbose, &format!("executing: {}", sql));
        let timer = Timer::start();
        let affected_rows = session.execute(sql)?;
        timer.finish(
            self.config.verbose,
            "statement complete",
            Some(&format!("{} rows affected", affected_rows)),
        );
        Ok(UpdateOutput {
            affected_rows,
            sql: sql.to_string(),
        })
    }

    pub fn schema(&self, params: &ConnectionParams, table: &str) -> Result<SchemaDescriptor, GatewayError> {
        let mut session = self.connect(params)?;
        verbose::emit(
            self.config.verbose,
            &format!("reading metadata for {}.{}...", self.config.schema.namespace, table),
        );
        schema::describe_table(&mut *session, &self.config.schema, table)
    }
}
