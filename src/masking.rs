use secrecy::{ExposeSecret, SecretString};

const REDACTED: &str = "[REDACTED]";

/// Format a secret value, respecting the show_secrets flag.
pub fn format_secret(secret: &SecretString, show_secrets: bool) -> String {
    if show_secrets {
        secret.expose_secret().to_string()
    } else {
        REDACTED.to_string()
    }
}

/// Mask password attributes (`PWD=`, `password=`) in a `;`-separated
/// connection string or endpoint. Brace-quoted values may contain `;`.
pub fn redact_connection_string(conn_str: &str, show_secrets: bool) -> String {
    if show_secrets {
        return conn_str.to_string();
    }
    split_attributes(conn_str)
        .into_iter()
        .map(|part| match part.split_once('=') {
            Some((key, _))
                if key.trim().eq_ignore_ascii_case("pwd")
                    || key.trim().eq_ignore_ascii_case("password") =>
            {
                format!("{}={}", key, REDACTED)
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn split_attributes(conn_str: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_braces = false;
    for (i, c) in conn_str.char_indices() {
        match c {
            '{' => in_braces = true,
            '}' => in_braces = false,
            ';' if !in_braces => {
                parts.push(&conn_str[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&conn_str[start..]);
    parts
}
