//! In-process [`TableStore`] with fault injection.
//!
//! Behaves like the remote store as far as the router can observe: reads
//! omit trailing empty rows, appends fill the first blank row below the
//! header block without shifting anything, writes grow the table as needed. Errors can be queued per operation to
//! exercise retry and failure paths, and every call is counted.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use ares_core::types::RowIndex;

use crate::error::{Result, StoreError};
use crate::store::TableStore;

/// Store operations, for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    TableExists,
    CreateTable,
    ReadRange,
    WriteRange,
    AppendRow,
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Number of rows up to and including the last non-empty one.
    fn extent(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1)
    }

    /// Zero-based index of the first blank row within the extent, or the
    /// extent itself when the table has no gaps.
    fn first_gap(&self) -> usize {
        let extent = self.extent();
        self.rows[..extent]
            .iter()
            .position(|row| row.iter().all(String::is_empty))
            .unwrap_or(extent)
    }

    fn set(&mut self, row: usize, col: usize, value: String) {
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value;
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<String, Table>,
    faults: HashMap<Op, VecDeque<StoreError>>,
    table_faults: HashMap<(Op, String), VecDeque<StoreError>>,
    calls: HashMap<Op, usize>,
}

impl Inner {
    /// Count the call and pop a queued fault, table-specific ones first.
    fn enter(&mut self, op: Op, table: &str) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;
        let targeted = self
            .table_faults
            .get_mut(&(op, table.to_string()))
            .and_then(VecDeque::pop_front);
        match targeted.or_else(|| self.faults.get_mut(&op).and_then(VecDeque::pop_front)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(format!("table '{name}'")))
    }
}

/// Shared in-memory store. Clones see the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert (or replace) a table with the given rows, header first.
    pub fn insert_table<R, C>(&self, name: &str, rows: R)
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        self.lock().tables.insert(name.to_string(), Table { rows });
    }

    /// Builder form of [`insert_table`](Self::insert_table).
    pub fn with_table<R, C>(self, name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        self.insert_table(name, rows);
        self
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.lock().tables.contains_key(name)
    }

    /// All rows of `name` up to the last non-empty one.
    pub fn rows(&self, name: &str) -> Option<Vec<Vec<String>>> {
        let inner = self.lock();
        let table = inner.tables.get(name)?;
        Some(table.rows[..table.extent()].to_vec())
    }

    /// Value at `(row, col)`, empty for cells never written.
    pub fn cell(&self, name: &str, row: RowIndex, col: u32) -> Option<String> {
        let inner = self.lock();
        let table = inner.tables.get(name)?;
        Some(
            table
                .rows
                .get((row as usize).checked_sub(1)?)
                .and_then(|cells| cells.get((col as usize).checked_sub(1)?))
                .cloned()
                .unwrap_or_default(),
        )
    }

    /// Value of the cell in `row` under header `column`.
    pub fn cell_by_name(&self, name: &str, row: RowIndex, column: &str) -> Option<String> {
        let col = {
            let inner = self.lock();
            let header = inner.tables.get(name)?.rows.first()?.clone();
            header.iter().position(|h| h.trim() == column)? as u32 + 1
        };
        self.cell(name, row, col)
    }

    /// Queue `err` to be returned by the next call of `op`.
    pub fn fail_next(&self, op: Op, err: StoreError) {
        self.lock().faults.entry(op).or_default().push_back(err);
    }

    /// Queue `err` for the next call of `op` that targets `table`.
    pub fn fail_next_on(&self, op: Op, table: &str, err: StoreError) {
        self.lock()
            .table_faults
            .entry((op, table.to_string()))
            .or_default()
            .push_back(err);
    }

    /// Number of calls of `op` so far, failed ones included.
    pub fn calls(&self, op: Op) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let mut inner = self.lock();
        inner.enter(Op::TableExists, table)?;
        Ok(inner.tables.contains_key(table))
    }

    async fn create_table(&self, table: &str, _rows: u32, _cols: u32) -> Result<()> {
        let mut inner = self.lock();
        inner.enter(Op::CreateTable, table)?;
        if inner.tables.contains_key(table) {
            return Err(StoreError::Api {
                status: 400,
                body: format!("A sheet with the name \"{table}\" already exists."),
            });
        }
        inner.tables.insert(table.to_string(), Table::default());
        Ok(())
    }

    async fn read_range(
        &self,
        table: &str,
        first: RowIndex,
        last: Option<RowIndex>,
    ) -> Result<Vec<Vec<String>>> {
        let mut inner = self.lock();
        inner.enter(Op::ReadRange, table)?;
        let t = inner.table_mut(table)?;
        let extent = t.extent();
        let start = (first.max(1) as usize - 1).min(extent);
        let end = last.map_or(extent, |l| (l as usize).min(extent)).max(start);
        Ok(t.rows[start..end].to_vec())
    }

    async fn write_range(
        &self,
        table: &str,
        row: RowIndex,
        col: u32,
        values: &[Vec<String>],
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.enter(Op::WriteRange, table)?;
        let t = inner.table_mut(table)?;
        for (r, cells) in values.iter().enumerate() {
            for (c, value) in cells.iter().enumerate() {
                t.set(row as usize + r, col as usize + c, value.clone());
            }
        }
        Ok(())
    }

    async fn append_row(&self, table: &str, values: &[String]) -> Result<RowIndex> {
        let mut inner = self.lock();
        inner.enter(Op::AppendRow, table)?;
        let t = inner.table_mut(table)?;
        let extent = t.extent();
        let gap = t.first_gap();
        if gap < extent {
            t.rows[gap] = values.to_vec();
        } else {
            t.rows.truncate(extent);
            t.rows.push(values.to_vec());
        }
        Ok(gap as RowIndex + 1)
    }
}
