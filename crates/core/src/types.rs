//! Row-level model types shared by the store and the router.

use serde::{Deserialize, Serialize};

use crate::layout::{
    COL_EVENT_TIME, COL_FIELDS_JSON, COL_PROCESSED_AT, COL_SOURCE, COL_SOURCE_KEY,
};

/// 1-based row position in a table. Row 1 is the header.
pub type RowIndex = u32;

/// First data row of every table.
pub const FIRST_DATA_ROW: RowIndex = 2;

// ---------------------------------------------------------------------------
// SourceRow
// ---------------------------------------------------------------------------

/// One data row of a table, keyed by the (trimmed) header names.
///
/// Field order follows the header. Identity is `(table, row)`; positions
/// are not stable across manual row deletion in the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub row: RowIndex,
    pub fields: Vec<(String, String)>,
}

impl SourceRow {
    /// Zip a header with a raw row, padding short rows with empty cells.
    /// Cells beyond the header are dropped.
    pub fn from_cells(row: RowIndex, header: &[String], cells: &[String]) -> Self {
        let fields = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), cells.get(i).cloned().unwrap_or_default()))
            .collect();
        Self { row, fields }
    }

    /// Raw value of `name`. With duplicate header names the rightmost wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `name` if present and not blank.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    /// First non-blank value among `names`, in priority order.
    pub fn first_non_empty(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.non_empty(name))
    }

    /// Compact JSON object of all fields in header order.
    pub fn fields_json(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(map).to_string()
    }
}

// ---------------------------------------------------------------------------
// RoutedEntry
// ---------------------------------------------------------------------------

/// One line appended to a person's destination log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedEntry {
    /// Source log name with the `Log` suffix removed (e.g. `Mesai`).
    pub source: String,
    /// Deterministic correlation key used downstream for de-duplication.
    pub source_key: String,
    /// Best-effort event timestamp copied from the source row.
    pub event_time: String,
    /// Serialized copy of all source fields.
    pub fields_json: String,
    pub processed_at: String,
}

impl RoutedEntry {
    /// Value for a destination column, or `None` for columns this entry
    /// does not know about.
    pub fn column(&self, name: &str) -> Option<&str> {
        match name {
            COL_SOURCE => Some(&self.source),
            COL_SOURCE_KEY => Some(&self.source_key),
            COL_EVENT_TIME => Some(&self.event_time),
            COL_FIELDS_JSON => Some(&self.fields_json),
            COL_PROCESSED_AT => Some(&self.processed_at),
            _ => None,
        }
    }

    /// Lay the entry out against an arbitrary destination header. Unknown
    /// columns stay blank.
    pub fn to_row(&self, header: &[String]) -> Vec<String> {
        header
            .iter()
            .map(|name| self.column(name).unwrap_or_default().to_string())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

/// Highest row observed for one source log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub log_name: String,
    pub last_row: RowIndex,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_rows_are_padded() {
        let row = SourceRow::from_cells(5, &header(&["A", "B", "C"]), &["1".into()]);
        assert_eq!(row.get("A"), Some("1"));
        assert_eq!(row.get("C"), Some(""));
        assert_eq!(row.non_empty("C"), None);
        assert_eq!(row.get("D"), None);
    }

    #[test]
    fn first_non_empty_respects_priority() {
        let row = SourceRow::from_cells(
            2,
            &header(&["MsgID", "ID"]),
            &["  ".into(), "42".into()],
        );
        assert_eq!(row.first_non_empty(&["MsgID", "ID"]), Some("42"));
        assert_eq!(row.first_non_empty(&["Nope"]), None);
    }

    #[test]
    fn fields_json_keeps_header_order_and_unicode() {
        let row = SourceRow::from_cells(
            10,
            &header(&["Kisi", "LogTs", "MsgID"]),
            &["Ayşe Yılmaz".into(), "2024-01-01 09:00".into(), "abc123".into()],
        );
        assert_eq!(
            row.fields_json(),
            r#"{"Kisi":"Ayşe Yılmaz","LogTs":"2024-01-01 09:00","MsgID":"abc123"}"#
        );
    }

    #[test]
    fn entry_maps_columns_by_name() {
        let entry = RoutedEntry {
            source: "Mesai".into(),
            source_key: "MesaiLog:abc".into(),
            event_time: "t".into(),
            fields_json: "{}".into(),
            processed_at: "p".into(),
        };
        let dest = header(&["Not", "SourceKey", "Kaynak", "ProcessedAt"]);
        assert_eq!(entry.to_row(&dest), vec!["", "MesaiLog:abc", "Mesai", "p"]);
    }
}
