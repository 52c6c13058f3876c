//! Tabular store access for the personnel router.
//!
//! - [`TableStore`]: the remote row-store contract (named tables, 1-based
//!   rows and columns, row 1 is the header).
//! - [`RateLimitedStore`]: wraps any store so quota errors are retried with
//!   exponential backoff and jitter.
//! - [`Workbook`]: header and column primitives (`ensure_column`,
//!   `ensure_header`, `get_or_create_table`) serialized per table.
//! - [`memory::MemoryStore`]: in-process store with fault injection.
//! - [`google::GoogleSheetsStore`]: Google Sheets REST v4 backend.

pub mod error;
pub mod google;
pub mod memory;
pub mod retry;
pub mod store;
pub mod workbook;

pub use error::{Result, StoreError};
pub use retry::{RateLimitedStore, RetryPolicy};
pub use store::TableStore;
pub use workbook::Workbook;
