use crate::error::GatewayError;
use serde::Serialize;
use serde_json::Value;

/// Printed when the envelope itself cannot be serialized.
const FALLBACK_FAILURE: &str =
    r#"{"success":false,"error":"internal: failed to serialize response"}"#;

/// The single JSON object written per invocation.
///
/// A successful envelope carries `message` and `data`; a failed one carries
/// only `error`.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Success envelope. A `data` value that fails to serialize turns the
    /// envelope into a failure.
    pub fn ok(message: &str, data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                success: true,
                message: Some(message.to_string()),
                error: None,
                data: Some(data),
            },
            Err(e) => Self::failure(&GatewayError::Internal {
                message: format!("failed to serialize response data: {}", e),
            }),
        }
    }

    pub fn failure(err: &GatewayError) -> Self {
        Self::error_text(err.to_string())
    }

    /// Failure envelope with a fixed message, used for argument errors.
    pub fn error_text(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            data: None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| FALLBACK_FAILURE.to_string())
    }
}

/// Print the envelope to stdout.
pub fn print_envelope(envelope: &Envelope) {
    println!("{}", envelope.to_json());
}

/// Print a non-fatal warning to stderr. Format: "warning: {message}"
pub fn print_warning(message: &str) {
    eprintln!("warning: {}", message);
}
