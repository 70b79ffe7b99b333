use crate::backend::ConnectionParams;
use crate::config::AppConfig;
use crate::error::GatewayError;
use crate::gateway::Action;
use crate::output::Envelope;
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "edgegate",
    version,
    about = "Progress OpenEdge query gateway with JSON output"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short = 'c', long, global = true, env = "EDGEGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit diagnostics to stderr
    #[arg(short = 'v', long, global = true, env = "EDGEGATE_VERBOSE")]
    pub verbose: bool,

    /// Disable credential masking in diagnostics
    #[arg(long, global = true, env = "EDGEGATE_SHOW_SECRETS")]
    pub show_secrets: bool,

    /// ODBC driver name used for URL endpoints
    #[arg(long, global = true, env = "EDGEGATE_DRIVER")]
    pub driver: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a connection and report where it went
    Test(ConnectionArgs),

    /// List rows of the configured table
    Transportes(ListingArgs),

    /// List one page of the configured table
    #[command(name = "query-paginated")]
    QueryPaginated(PageArgs),

    /// Run a SELECT statement
    Query(StatementArgs),

    /// Run an UPDATE, INSERT or DELETE statement
    Update(StatementArgs),

    /// Describe a table's columns, keys and indexes
    Schema(SchemaArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// JDBC-style URL, ODBC connection string or DSN
    pub endpoint: String,

    pub username: String,

    #[arg(allow_hyphen_values = true)]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct ListingArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Raw WHERE fragment, inserted verbatim
    #[arg(allow_hyphen_values = true)]
    pub where_clause: Option<String>,

    /// Max rows to return (default: 100)
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Raw WHERE fragment, inserted verbatim
    #[arg(allow_hyphen_values = true)]
    pub where_clause: Option<String>,

    /// Page size (default: 10)
    pub limit: Option<usize>,

    /// Rows to skip (default: 0)
    pub offset: Option<usize>,
}

#[derive(Args, Debug)]
pub struct StatementArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// SQL statement text
    pub sql: Option<String>,

    /// Read SQL from file
    #[arg(short = 'f', long = "file", conflicts_with = "sql")]
    pub sql_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Table name without schema prefix
    #[arg(default_value = "transporte")]
    pub table: String,
}

impl Command {
    pub fn connection(&self) -> &ConnectionArgs {
        match self {
            Command::Test(c) => c,
            Command::Transportes(a) => &a.connection,
            Command::QueryPaginated(a) => &a.connection,
            Command::Query(a) | Command::Update(a) => &a.connection,
            Command::Schema(a) => &a.connection,
        }
    }
}

pub const INSUFFICIENT_ARGUMENTS: &str =
    "insufficient arguments. usage: edgegate <action> <endpoint> <username> <password> [params...]";
pub const INVALID_ACTION: &str =
    "invalid action. use: test, transportes, query-paginated, query, update, or schema";

/// Failure envelope for arguments clap rejected.
///
/// Missing arguments and unknown actions get fixed messages; anything else
/// carries clap's own first line.
pub fn usage_envelope(err: &clap::Error) -> Envelope {
    match err.kind() {
        ErrorKind::MissingRequiredArgument
        | ErrorKind::MissingSubcommand
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            Envelope::error_text(INSUFFICIENT_ARGUMENTS)
        }
        ErrorKind::InvalidSubcommand => Envelope::error_text(INVALID_ACTION),
        _ => {
            let rendered = err.to_string();
            let first_line = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string();
            Envelope::failure(&GatewayError::Usage {
                message: first_line,
            })
        }
    }
}

impl Command {
    /// Resolve the command into connection parameters and an action, filling
    /// defaults from config and reading `--file` input.
    pub fn request(&self, config: &AppConfig) -> Result<(ConnectionParams, Action), GatewayError> {
        let action = match self {
            Command::Test(_) => Action::Test,
            Command::Transportes(a) => Action::Listing {
                where_clause: a.where_clause.clone(),
                limit: a.limit.unwrap_or(config.listing_limit),
            },
            Command::QueryPaginated(a) => Action::Page {
                where_clause: a.where_clause.clone(),
                limit: a.limit.unwrap_or(config.page_limit),
                offset: a.offset.unwrap_or(0),
            },
            Command::Query(a) => Action::Query {
                sql: resolve_sql(a)?,
            },
            Command::Update(a) => Action::Update {
                sql: resolve_sql(a)?,
            },
            Command::Schema(a) => Action::Schema {
                table: a.table.clone(),
            },
        };

        let conn = self.connection();
        let params = ConnectionParams {
            endpoint: conn.endpoint.clone(),
            username: conn.username.clone(),
            password: SecretString::from(conn.password.clone()),
        };
        Ok((params, action))
    }
}

/// Statement text from the positional argument or `--file`. Absent text is
/// passed on as empty and fails the allow-list.
fn resolve_sql(args: &StatementArgs) -> Result<String, GatewayError> {
    if let Some(ref sql) = args.sql {
        return Ok(sql.clone());
    }
    if let Some(ref path) = args.sql_file {
        return std::fs::read_to_string(path).map_err(|e| GatewayError::Config {
            message: format!("cannot read SQL file {}: {}", path.display(), e),
        });
    }
    Ok(String::new())
}
