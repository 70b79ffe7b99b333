//! Statement allow-list.
//!
//! This is a prefix check on the trimmed, upper-cased statement text and
//! nothing more. It does not parse SQL: a permitted prefix followed by a
//! second statement, a comment trick or an injected subquery all pass.

/// Which entry point a statement is headed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementClass {
    /// Row-returning statements: `SELECT`.
    Query,
    /// Mutations: `UPDATE`, `INSERT`, `DELETE`.
    Mutation,
}

impl StatementClass {
    pub fn allowed_prefixes(self) -> &'static [&'static str] {
        match self {
            StatementClass::Query => &["SELECT"],
            StatementClass::Mutation => &["UPDATE", "INSERT", "DELETE"],
        }
    }

    fn denial(self) -> &'static str {
        match self {
            StatementClass::Query => "only SELECT statements are allowed",
            StatementClass::Mutation => "only UPDATE, INSERT and DELETE statements are allowed",
        }
    }
}

/// Outcome of the allow-list check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Allowed,
    Denied { reason: String },
}

/// Check `sql` against the prefixes permitted for `class`.
pub fn validate(sql: &str, class: StatementClass) -> ValidationResult {
    let normalized = sql.trim().to_uppercase();
    if class
        .allowed_prefixes()
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
    {
        ValidationResult::Allowed
    } else {
        ValidationResult::Denied {
            reason: class.denial().to_string(),
        }
    }
}
