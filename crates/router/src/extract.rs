//! Field extraction rules for source rows.
//!
//! Each rule is a priority list of column names; the first non-blank value
//! wins.

use ares_core::layout::SOURCE_SUFFIX;
use ares_core::types::SourceRow;

/// Attendance logs name the person directly in this column.
pub const ATTENDANCE_NAME_FIELD: &str = "Kisi";

/// Actor columns in `Full Name | handle` or `Full Name / team` form.
pub const ACTOR_FIELDS: &[&str] = &["ClosedByFull", "FirstByFull"];

/// Plain name columns, used when no actor column is filled.
pub const PLAIN_NAME_FIELDS: &[&str] = &["AdSoyad", "Ad", "UserName"];

/// Separators after which an actor column carries non-name detail.
const ACTOR_DELIMITERS: &[char] = &['|', '/'];

/// Correlation-id columns, in priority order.
pub const SOURCE_KEY_FIELDS: &[&str] = &["MsgID", "OrigMsgID", "CloseMsgID", "FirstMsgID", "ID"];

/// Timestamp columns, in priority order.
pub const EVENT_TIME_FIELDS: &[&str] = &[
    "LogTs",
    "TalepTs",
    "CloseTs",
    "BildirimTarih",
    "FirstTs",
    "Ts",
    "Zaman",
];

/// Which name rule a source log follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Checks `Kisi` before the actor and plain name columns.
    Attendance,
    Other,
}

impl SourceKind {
    pub fn for_table(table: &str, attendance_tables: &[String]) -> Self {
        if attendance_tables.iter().any(|t| t == table) {
            Self::Attendance
        } else {
            Self::Other
        }
    }
}

/// Name portion of an actor value: text before the first `|`, then before
/// the first `/`, trimmed.
fn actor_name(value: &str) -> &str {
    let mut name = value;
    for delim in ACTOR_DELIMITERS {
        name = name.split(*delim).next().unwrap_or_default();
    }
    name.trim()
}

/// Person display name for a row, or `None` if the row names nobody.
pub fn extract_name(kind: SourceKind, row: &SourceRow) -> Option<String> {
    if kind == SourceKind::Attendance {
        if let Some(name) = row.non_empty(ATTENDANCE_NAME_FIELD) {
            return Some(name.trim().to_string());
        }
    }

    let actor = ACTOR_FIELDS
        .iter()
        .filter_map(|field| row.non_empty(field))
        .map(actor_name)
        .find(|name| !name.is_empty());
    if let Some(name) = actor {
        return Some(name.to_string());
    }

    row.first_non_empty(PLAIN_NAME_FIELDS)
        .map(|name| name.trim().to_string())
}

/// Deterministic correlation key: `<source>:<id>` from the first filled id
/// column, else `<source>:row<N>`.
pub fn make_source_key(source: &str, row: &SourceRow) -> String {
    match row.first_non_empty(SOURCE_KEY_FIELDS) {
        Some(id) => format!("{source}:{id}"),
        None => format!("{source}:row{}", row.row),
    }
}

/// Best-effort event timestamp; empty when no timestamp column is filled.
pub fn pick_event_time(row: &SourceRow) -> String {
    row.first_non_empty(EVENT_TIME_FIELDS)
        .unwrap_or_default()
        .to_string()
}

/// `Kaynak` label: the source name without its `Log` suffix.
pub fn source_label(source: &str) -> &str {
    source.strip_suffix(SOURCE_SUFFIX).unwrap_or(source)
}
