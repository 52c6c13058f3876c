//! Header and column primitives over a rate-limited [`TableStore`].
//!
//! A [`Workbook`] is one spreadsheet: a set of named tables behind a single
//! store. Header mutations (`ensure_column`, `ensure_header`) and table
//! creation are read-then-write sequences, so they run under a per-table
//! async mutex. That keeps concurrent callers in one process from creating
//! duplicate columns or tables.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use ares_core::types::{RowIndex, SourceRow, FIRST_DATA_ROW};

use crate::error::Result;
use crate::retry::{RateLimitedStore, RetryPolicy};
use crate::store::TableStore;

/// Per-table critical sections for header and table-shape mutations.
#[derive(Default)]
struct TableLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TableLocks {
    async fn lock_for(&self, table: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(table.to_string()).or_default().clone()
    }
}

/// A spreadsheet whose every store call is retried on quota errors.
#[derive(Clone)]
pub struct Workbook {
    store: Arc<dyn TableStore>,
    locks: Arc<TableLocks>,
}

impl Workbook {
    /// Wrap `store` in a [`RateLimitedStore`] with the given policy.
    pub fn new<S: TableStore + 'static>(store: S, policy: RetryPolicy) -> Self {
        Self {
            store: Arc::new(RateLimitedStore::new(store, policy)),
            locks: Arc::new(TableLocks::default()),
        }
    }

    // ---- table lifecycle ----

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        self.store.table_exists(table).await
    }

    /// Create `table` with the given grid size unless it already exists.
    ///
    /// Returns `true` when the table was created by this call.
    pub async fn get_or_create_table(&self, table: &str, rows: u32, cols: u32) -> Result<bool> {
        let lock = self.locks.lock_for(table).await;
        let _guard = lock.lock().await;

        if self.store.table_exists(table).await? {
            return Ok(false);
        }
        self.store.create_table(table, rows, cols).await?;
        tracing::info!(table, rows, cols, "Created table");
        Ok(true)
    }

    // ---- header management ----

    /// Trimmed header row; empty for a blank table.
    pub async fn read_header(&self, table: &str) -> Result<Vec<String>> {
        let rows = self.store.read_range(table, 1, Some(1)).await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.into_iter().map(|h| h.trim().to_string()).collect())
            .unwrap_or_default())
    }

    /// 1-based position of `column`, appending it to the header if missing.
    pub async fn ensure_column(&self, table: &str, column: &str) -> Result<u32> {
        let lock = self.locks.lock_for(table).await;
        let _guard = lock.lock().await;

        let mut header = self.read_header(table).await?;
        if let Some(pos) = position(&header, column) {
            return Ok(pos);
        }
        header.push(column.to_string());
        self.store.write_range(table, 1, 1, &[header.clone()]).await?;
        tracing::info!(table, column, position = header.len(), "Added column");
        Ok(header.len() as u32)
    }

    /// Merge `required` into the existing header without reordering or
    /// removing columns. Writes only when the merged header differs.
    ///
    /// Returns the header as it now stands.
    pub async fn ensure_header(&self, table: &str, required: &[&str]) -> Result<Vec<String>> {
        let lock = self.locks.lock_for(table).await;
        let _guard = lock.lock().await;

        let current = self.read_header(table).await?;
        let merged = merge_header(&current, required);
        if merged != current {
            self.store.write_range(table, 1, 1, &[merged.clone()]).await?;
            tracing::debug!(table, columns = merged.len(), "Header updated");
        }
        Ok(merged)
    }

    // ---- rows ----

    /// Index of the last non-empty row.
    pub async fn row_count(&self, table: &str) -> Result<RowIndex> {
        self.store.row_count(table).await
    }

    /// Data rows `first..=last` keyed by `header`.
    pub async fn read_rows(
        &self,
        table: &str,
        header: &[String],
        first: RowIndex,
        last: Option<RowIndex>,
    ) -> Result<Vec<SourceRow>> {
        let first = first.max(FIRST_DATA_ROW);
        let raw = self.store.read_range(table, first, last).await?;
        Ok(raw
            .iter()
            .zip(first..)
            .map(|(cells, row)| SourceRow::from_cells(row, header, cells))
            .collect())
    }

    /// Header plus every data row of `table`.
    pub async fn read_all(&self, table: &str) -> Result<(Vec<String>, Vec<SourceRow>)> {
        let mut raw = self.store.read_range(table, 1, None).await?.into_iter();
        let header: Vec<String> = match raw.next() {
            Some(row) => row.into_iter().map(|h| h.trim().to_string()).collect(),
            None => return Ok((Vec::new(), Vec::new())),
        };
        let rows = raw
            .zip(FIRST_DATA_ROW..)
            .map(|(cells, row)| SourceRow::from_cells(row, &header, &cells))
            .collect();
        Ok((header, rows))
    }

    pub async fn write_range(
        &self,
        table: &str,
        row: RowIndex,
        col: u32,
        values: &[Vec<String>],
    ) -> Result<()> {
        self.store.write_range(table, row, col, values).await
    }

    pub async fn update_cell(&self, table: &str, row: RowIndex, col: u32, value: &str) -> Result<()> {
        self.store.update_cell(table, row, col, value).await
    }

    pub async fn append_row(&self, table: &str, values: &[String]) -> Result<RowIndex> {
        self.store.append_row(table, values).await
    }
}

/// 1-based position of `column` in `header`.
pub fn position(header: &[String], column: &str) -> Option<u32> {
    header
        .iter()
        .position(|h| h == column)
        .map(|i| i as u32 + 1)
}

/// `current` followed by every `required` name it lacks, in `required` order.
pub fn merge_header(current: &[String], required: &[&str]) -> Vec<String> {
    let mut merged = current.to_vec();
    for name in required {
        if !merged.iter().any(|h| h == name) {
            merged.push(name.to_string());
        }
    }
    merged
}
