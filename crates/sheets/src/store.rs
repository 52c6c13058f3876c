//! The remote row-store contract.

use async_trait::async_trait;

use ares_core::types::RowIndex;

use crate::error::Result;

/// A named-table store addressed by 1-based row and column positions.
///
/// Row 1 of every table is its header. Reads omit trailing empty rows and
/// may return rows shorter than the header; callers pad.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn TableStore>`.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Whether a table with this exact name exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Create an empty table with the given initial grid size.
    ///
    /// Fails if the table already exists.
    async fn create_table(&self, table: &str, rows: u32, cols: u32) -> Result<()>;

    /// Read rows `first..=last`. `None` reads through the last non-empty row.
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if the
    /// table does not exist.
    async fn read_range(
        &self,
        table: &str,
        first: RowIndex,
        last: Option<RowIndex>,
    ) -> Result<Vec<Vec<String>>>;

    /// Write a rectangular block whose top-left cell is `(row, col)`.
    async fn write_range(
        &self,
        table: &str,
        row: RowIndex,
        col: u32,
        values: &[Vec<String>],
    ) -> Result<()>;

    /// Overwrite a single cell.
    async fn update_cell(&self, table: &str, row: RowIndex, col: u32, value: &str) -> Result<()> {
        self.write_range(table, row, col, &[vec![value.to_string()]])
            .await
    }

    /// Write a row into the first blank row after the table that starts at
    /// row 1. Existing rows never move. Returns the row written.
    async fn append_row(&self, table: &str, values: &[String]) -> Result<RowIndex>;

    /// Index of the last non-empty row (1 when only the header exists,
    /// 0 for a blank table).
    async fn row_count(&self, table: &str) -> Result<RowIndex> {
        let rows = self.read_range(table, 1, None).await?;
        Ok(rows.len() as RowIndex)
    }
}
