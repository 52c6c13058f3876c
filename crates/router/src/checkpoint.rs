//! Per-source watermarks in the `_State` table.
//!
//! One row per source log: `LogName`, `LastRow`. A missing row or an
//! unreadable value means [`INITIAL_LAST_ROW`]. Watermarks only move
//! forward; a lower value is ignored.

use ares_core::layout::{
    COL_LAST_ROW, COL_LOG_NAME, INITIAL_LAST_ROW, STATE_COLS, STATE_HEADERS, STATE_ROWS,
    STATE_TABLE,
};
use ares_core::types::{Checkpoint, RowIndex, SourceRow};
use ares_sheets::workbook::position;
use ares_sheets::Workbook;

use crate::error::Result;

pub struct CheckpointStore {
    workbook: Workbook,
}

impl CheckpointStore {
    pub fn new(workbook: Workbook) -> Self {
        Self { workbook }
    }

    /// Create `_State` with its header if missing. Returns the header.
    pub async fn ensure_table(&self) -> Result<Vec<String>> {
        self.workbook
            .get_or_create_table(STATE_TABLE, STATE_ROWS, STATE_COLS)
            .await?;
        Ok(self.workbook.ensure_header(STATE_TABLE, STATE_HEADERS).await?)
    }

    /// All stored checkpoints, unreadable values reported as the initial
    /// watermark.
    pub async fn list(&self) -> Result<Vec<Checkpoint>> {
        self.ensure_table().await?;
        let (_, rows) = self.workbook.read_all(STATE_TABLE).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let log_name = row.non_empty(COL_LOG_NAME)?.trim().to_string();
                Some(Checkpoint {
                    log_name,
                    last_row: parse_last_row(row),
                })
            })
            .collect())
    }

    /// Highest row already observed for `log_name`.
    pub async fn get_last_row(&self, log_name: &str) -> Result<RowIndex> {
        self.ensure_table().await?;
        let (_, rows) = self.workbook.read_all(STATE_TABLE).await?;
        Ok(find(&rows, log_name).map_or(INITIAL_LAST_ROW, parse_last_row))
    }

    /// Record `last_row` for `log_name` unless the stored value is already
    /// at or above it. Returns whether anything was written.
    pub async fn set_last_row(&self, log_name: &str, last_row: RowIndex) -> Result<bool> {
        let header = self.ensure_table().await?;
        let (_, rows) = self.workbook.read_all(STATE_TABLE).await?;

        match find(&rows, log_name) {
            Some(existing) => {
                let current = parse_last_row(existing);
                if last_row <= current {
                    return Ok(false);
                }
                let col = position(&header, COL_LAST_ROW).unwrap_or(2);
                self.workbook
                    .update_cell(STATE_TABLE, existing.row, col, &last_row.to_string())
                    .await?;
                tracing::debug!(log = log_name, from = current, to = last_row, "Checkpoint advanced");
            }
            None => {
                if last_row <= INITIAL_LAST_ROW {
                    return Ok(false);
                }
                let checkpoint = Checkpoint {
                    log_name: log_name.to_string(),
                    last_row,
                };
                self.workbook
                    .append_row(STATE_TABLE, &checkpoint_row(&header, &checkpoint))
                    .await?;
                tracing::debug!(log = log_name, to = last_row, "Checkpoint created");
            }
        }
        Ok(true)
    }
}

fn find<'a>(rows: &'a [SourceRow], log_name: &str) -> Option<&'a SourceRow> {
    rows.iter()
        .find(|row| row.get(COL_LOG_NAME).map(str::trim) == Some(log_name))
}

fn parse_last_row(row: &SourceRow) -> RowIndex {
    row.get(COL_LAST_ROW)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(INITIAL_LAST_ROW)
}

fn checkpoint_row(header: &[String], checkpoint: &Checkpoint) -> Vec<String> {
    header
        .iter()
        .map(|name| match name.as_str() {
            COL_LOG_NAME => checkpoint.log_name.clone(),
            COL_LAST_ROW => checkpoint.last_row.to_string(),
            _ => String::new(),
        })
        .collect()
}
