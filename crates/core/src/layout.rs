//! Persisted table names, headers, and sentinels.
//!
//! These are the column names the destination workbook and the source logs
//! carry. Columns are always addressed by name, never by position, so
//! operators may reorder or add columns by hand.

// ---------------------------------------------------------------------------
// Source logs
// ---------------------------------------------------------------------------

/// Source logs routed by default.
pub const DEFAULT_SOURCE_TABLES: &[&str] = &["MesaiLog", "BonusLog", "FinansLog"];

/// Source log that uses the attendance-style name extraction rule.
pub const ATTENDANCE_TABLE: &str = "MesaiLog";

/// Suffix stripped from a source log name to form the `Kaynak` label.
pub const SOURCE_SUFFIX: &str = "Log";

/// Routing-control column: timestamp the row was handled, empty until then.
pub const COL_PROCESSED_AT: &str = "ProcessedAt";

/// Routing-control column: destination person id or [`ROUTED_INACTIVE`].
pub const COL_ROUTED_TO: &str = "RoutedTo";

/// `RoutedTo` value for rows whose person is inactive.
pub const ROUTED_INACTIVE: &str = "PASIF";

/// Trailing rows scanned per source per pass.
pub const DEFAULT_WINDOW: u32 = 200;

// ---------------------------------------------------------------------------
// Person index
// ---------------------------------------------------------------------------

pub const PERSON_LIST_TABLE: &str = "PersonelListesi";
pub const PERSON_LIST_ROWS: u32 = 1000;
pub const PERSON_LIST_COLS: u32 = 12;

pub const COL_PERSON_ID: &str = "PersonelID";
pub const COL_DISPLAY_NAME: &str = "AdSoyad";
pub const COL_NORM_NAME: &str = "NormName";
pub const COL_STATUS: &str = "Durum";
pub const COL_STARTED_AT: &str = "BaslamaTarihi";
pub const COL_LEFT_AT: &str = "CikisTarihi";
pub const COL_CREATED_AT: &str = "Olusturuldu";
pub const COL_UPDATED_AT: &str = "Guncellendi";

pub const PERSON_LIST_HEADERS: &[&str] = &[
    COL_PERSON_ID,
    COL_DISPLAY_NAME,
    COL_NORM_NAME,
    COL_STATUS,
    COL_STARTED_AT,
    COL_LEFT_AT,
    COL_CREATED_AT,
    COL_UPDATED_AT,
];

/// Status written for newly created persons and assumed when `Durum` is empty.
pub const STATUS_ACTIVE: &str = "Aktif";

/// Default prefix that marks a person as inactive.
pub const DEFAULT_INACTIVE_MARKER: &str = "Pasif";

// ---------------------------------------------------------------------------
// Per-person destination logs
// ---------------------------------------------------------------------------

pub const PERSON_PAGE_ROWS: u32 = 1000;
pub const PERSON_PAGE_COLS: u32 = 10;

pub const COL_SOURCE: &str = "Kaynak";
pub const COL_SOURCE_KEY: &str = "SourceKey";
pub const COL_EVENT_TIME: &str = "Zaman";
pub const COL_FIELDS_JSON: &str = "AlanlarJSON";

pub const PERSON_PAGE_HEADERS: &[&str] = &[
    COL_SOURCE,
    COL_SOURCE_KEY,
    COL_EVENT_TIME,
    COL_FIELDS_JSON,
    COL_PROCESSED_AT,
];

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

pub const STATE_TABLE: &str = "_State";
pub const STATE_ROWS: u32 = 50;
pub const STATE_COLS: u32 = 5;

pub const COL_LOG_NAME: &str = "LogName";
pub const COL_LAST_ROW: &str = "LastRow";

pub const STATE_HEADERS: &[&str] = &[COL_LOG_NAME, COL_LAST_ROW];

/// Watermark assumed for a source with no (or an unreadable) checkpoint.
pub const INITIAL_LAST_ROW: u32 = 1;
