use crate::backend::{CellValue, ColumnMeta, RowSet};
use serde_json::{Map, Number, Value};

/// Marker appended to values cut by [`truncate_chars`].
pub const ELLIPSIS: &str = "...";

/// Convert every row of a result set to a JSON object.
///
/// `max_chars` caps string-like values (used when sampling table data); pass
/// `None` to keep values intact.
pub fn rows_to_json(rows: &RowSet, max_chars: Option<usize>) -> Vec<Value> {
    rows.rows
        .iter()
        .map(|row| Value::Object(row_to_json(&rows.columns, row, max_chars)))
        .collect()
}

/// Convert one row, keyed by lower-cased column name in metadata order.
pub fn row_to_json(
    columns: &[ColumnMeta],
    row: &[CellValue],
    max_chars: Option<usize>,
) -> Map<String, Value> {
    let mut map = Map::new();
    for (i, col) in columns.iter().enumerate() {
        let value = row.get(i).unwrap_or(&CellValue::Null);
        map.insert(col.name.to_lowercase(), cell_to_json(value, max_chars));
    }
    map
}

pub fn cell_to_json(value: &CellValue, max_chars: Option<usize>) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Int(i) => Value::Number(Number::from(*i)),
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Float(f) => match Number::from_f64(*f) {
            Some(n) => Value::Number(n),
            // NaN and infinities have no JSON number form
            None => Value::String(clip(&f.to_string(), max_chars)),
        },
        CellValue::Decimal(s) => match decimal_number(s) {
            Some(n) => Value::Number(n),
            None => Value::String(clip(s, max_chars)),
        },
        CellValue::Text(s) | CellValue::Other(s) => Value::String(clip(s, max_chars)),
    }
}

/// Parse decimal text into an exact JSON number. Drivers may omit the
/// leading zero (`.5`, `-.5`) or send a `+` sign, neither of which is JSON.
pub fn decimal_number(text: &str) -> Option<Number> {
    let t = text.trim();
    let t = t.strip_prefix('+').unwrap_or(t);
    let normalized = if let Some(rest) = t.strip_prefix("-.") {
        format!("-0.{}", rest)
    } else if let Some(rest) = t.strip_prefix('.') {
        format!("0.{}", rest)
    } else {
        t.to_string()
    };
    serde_json::from_str(&normalized).ok()
}

fn clip(s: &str, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(max) => truncate_chars(s, max),
        None => s.to_string(),
    }
}

/// Cut `s` to `max` characters followed by [`ELLIPSIS`]. Strings of at most
/// `max` characters are returned unchanged.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], ELLIPSIS),
        None => s.to_string(),
    }
}
