use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("driver: {message}")]
    DriverUnavailable { message: String },

    #[error("connection: {message}")]
    Connection { message: String },

    #[error("query: {message}")]
    Query { message: String },

    #[error("validation: {reason}")]
    Validation { reason: String },

    #[error("config: {message}")]
    Config { message: String },

    #[error("usage: {message}")]
    Usage { message: String },

    #[error("internal: {message}")]
    Internal { message: String },
}
