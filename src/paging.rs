//! SQL for the fixed listing target.
//!
//! OpenEdge SQL has `TOP` but no `OFFSET`, so pages past the first are
//! selected with a correlated condition on the key column:
//!
//! ```text
//! SELECT TOP 10 codtrn, nomtrn FROM PUB.transporte
//!  WHERE codtrn > (SELECT MAX(codtrn) FROM
//!                   (SELECT TOP 20 codtrn FROM PUB.transporte ORDER BY codtrn) sub)
//!  ORDER BY codtrn
//! ```
//!
//! Each page scans `offset` keys, so deep pages get slower linearly. The key
//! must be unique and ascending for pages to neither overlap nor skip rows.
//!
//! WHERE fragments are inserted verbatim, without parentheses. A fragment
//! with a top-level `OR` therefore binds looser than the appended
//! `AND key > ...`, and pages past the first return wrong rows; callers
//! must parenthesize such fragments themselves.

/// Table, columns and ordering key used by the listing actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTarget {
    pub table: String,
    pub columns: Vec<String>,
    pub key: String,
}

impl Default for ListingTarget {
    fn default() -> Self {
        Self {
            table: "PUB.transporte".to_string(),
            columns: vec!["nomtrn".to_string(), "codtrn".to_string()],
            key: "codtrn".to_string(),
        }
    }
}

impl ListingTarget {
    /// Column list for paged queries: the key first, then the remaining columns.
    fn paged_columns(&self) -> String {
        std::iter::once(self.key.as_str())
            .chain(
                self.columns
                    .iter()
                    .map(String::as_str)
                    .filter(|c| !c.eq_ignore_ascii_case(&self.key)),
            )
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Treat blank fragments as absent.
fn fragment(where_clause: Option<&str>) -> Option<&str> {
    where_clause.map(str::trim).filter(|w| !w.is_empty())
}

/// `SELECT <columns> FROM <table> [WHERE <fragment>]`. The fragment is
/// inserted verbatim.
pub fn listing_sql(target: &ListingTarget, where_clause: Option<&str>) -> String {
    let mut sql = format!("SELECT {} FROM {}", target.columns.join(", "), target.table);
    if let Some(w) = fragment(where_clause) {
        sql.push_str(" WHERE ");
        sql.push_str(w);
    }
    sql
}

/// One page of the listing, `limit` rows after skipping `offset` keys.
pub fn paginated_sql(
    target: &ListingTarget,
    where_clause: Option<&str>,
    limit: usize,
    offset: usize,
) -> String {
    let where_clause = fragment(where_clause);
    let key = &target.key;

    let mut sql = format!(
        "SELECT TOP {} {} FROM {}",
        limit,
        target.paged_columns(),
        target.table
    );
    if let Some(w) = where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(w);
    }

    if offset > 0 {
        // WHERE only when nothing above opened the clause
        sql.push_str(if where_clause.is_some() { " AND " } else { " WHERE " });
        sql.push_str(&format!(
            "{key} > (SELECT MAX({key}) FROM (SELECT TOP {offset} {key} FROM {}",
            target.table
        ));
        if let Some(w) = where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(w);
        }
        sql.push_str(&format!(" ORDER BY {key}) sub)"));
    }

    sql.push_str(&format!(" ORDER BY {key}"));
    sql
}
