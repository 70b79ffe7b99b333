//! Endpoint parsing.
//!
//! Accepts the JDBC-style URLs the OpenEdge tooling hands out
//! (`jdbc:datadirect:openedge://host:2500;databaseName=sports`), raw ODBC
//! connection strings and bare DSN names.

/// Which form the endpoint was given in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointKind {
    /// `scheme://host[:port][;key=value...]`
    Url {
        host: String,
        port: Option<String>,
        properties: Vec<(String, String)>,
    },
    /// `key=value;key=value`
    ConnectionString,
    /// Anything else is taken as a data source name.
    Dsn,
}

/// Classify an endpoint string.
pub fn classify(endpoint: &str) -> EndpointKind {
    if let Some((_, rest)) = endpoint.split_once("://") {
        let mut segments = rest.split(';');
        let authority = segments.next().unwrap_or_default();
        let authority = authority.split('/').next().unwrap_or_default();
        let (host, port) = match authority.split_once(':') {
            Some((h, p)) => (h.to_string(), Some(p.to_string()).filter(|p| !p.is_empty())),
            None => (authority.to_string(), None),
        };
        let properties = segments.filter_map(split_pair).collect();
        return EndpointKind::Url {
            host,
            port,
            properties,
        };
    }
    if endpoint.contains('=') {
        EndpointKind::ConnectionString
    } else {
        EndpointKind::Dsn
    }
}

fn split_pair(segment: &str) -> Option<(String, String)> {
    let (k, v) = segment.split_once('=')?;
    let k = k.trim();
    if k.is_empty() {
        return None;
    }
    Some((k.to_string(), v.trim().to_string()))
}

/// Look up a `key=value` property in a `;`-separated string, ignoring key case.
pub fn property(endpoint: &str, key: &str) -> Option<String> {
    endpoint
        .split(';')
        .filter_map(split_pair)
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Host name for diagnostics, `unknown` when it cannot be found.
pub fn extract_host(endpoint: &str) -> String {
    let found = match classify(endpoint) {
        EndpointKind::Url { host, .. } => Some(host),
        _ => property(endpoint, "HostName").or_else(|| property(endpoint, "Host")),
    };
    found
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Database name for diagnostics, `unknown` when it cannot be found.
pub fn extract_database(endpoint: &str) -> String {
    property(endpoint, "databaseName")
        .or_else(|| property(endpoint, "Database"))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
