//! Identity resolution against the `PersonelListesi` index.
//!
//! The index is read once per routing pass and kept in memory; writes made
//! during the pass (refreshes, new persons) update the cached copy, so no
//! entry is read twice. [`IdentityResolver::begin_pass`] drops the cache.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use ares_core::clock::Clock;
use ares_core::error::CoreError;
use ares_core::layout::{
    COL_DISPLAY_NAME, COL_NORM_NAME, COL_PERSON_ID, COL_STATUS, COL_UPDATED_AT, PERSON_LIST_COLS,
    PERSON_LIST_HEADERS, PERSON_LIST_ROWS, PERSON_LIST_TABLE, PERSON_PAGE_COLS,
    PERSON_PAGE_HEADERS, PERSON_PAGE_ROWS,
};
use ares_core::naming::normalize_name;
use ares_core::person::{next_person_id, PersonId, PersonRecord, PersonStatus};
use ares_core::types::{RowIndex, SourceRow};
use ares_sheets::workbook::position;
use ares_sheets::Workbook;

use crate::error::Result;

/// Outcome of [`IdentityResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Person id as stored in the index; also the destination table name.
    pub id: String,
    pub status: PersonStatus,
    /// `true` when this call created the person.
    pub created: bool,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    id: String,
    row: RowIndex,
    status_label: String,
}

/// In-memory copy of the person index for one pass.
#[derive(Debug, Default)]
struct PersonIndex {
    header: Vec<String>,
    by_name: HashMap<String, IndexEntry>,
    /// Every non-empty id, for sequence allocation.
    ids: Vec<String>,
}

impl PersonIndex {
    fn from_rows(header: Vec<String>, rows: &[SourceRow]) -> Self {
        let mut index = Self {
            header,
            ..Self::default()
        };
        for row in rows {
            let Some(id) = row.non_empty(COL_PERSON_ID).map(str::trim) else {
                continue;
            };
            index.ids.push(id.to_string());
            if PersonId::parse(id).is_err() {
                tracing::debug!(person_id = id, row = row.row, "Person id outside the RD sequence");
            }

            let key = row
                .non_empty(COL_NORM_NAME)
                .or_else(|| row.non_empty(COL_DISPLAY_NAME))
                .map(normalize_name)
                .unwrap_or_default();
            if key.is_empty() {
                continue;
            }

            match index.by_name.entry(key) {
                Entry::Occupied(kept) => {
                    tracing::warn!(
                        norm_name = %kept.key(),
                        kept = %kept.get().id,
                        ignored = id,
                        row = row.row,
                        "Normalized name collision in person index, first entry wins",
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(IndexEntry {
                        id: id.to_string(),
                        row: row.row,
                        status_label: row.get(COL_STATUS).unwrap_or_default().to_string(),
                    });
                }
            }
        }
        index
    }
}

/// Maps display names to stable person ids, creating persons on demand.
pub struct IdentityResolver {
    workbook: Workbook,
    clock: Clock,
    inactive_marker: String,
    index: Option<PersonIndex>,
    /// Person table headers already ensured this pass.
    pages: HashMap<String, Vec<String>>,
}

impl IdentityResolver {
    pub fn new(workbook: Workbook, clock: Clock, inactive_marker: impl Into<String>) -> Self {
        Self {
            workbook,
            clock,
            inactive_marker: inactive_marker.into(),
            index: None,
            pages: HashMap::new(),
        }
    }

    /// Drop everything cached by a previous pass.
    pub fn begin_pass(&mut self) {
        self.index = None;
        self.pages.clear();
    }

    /// Create the person index with its header if missing.
    pub async fn ensure_person_list(&self) -> Result<Vec<String>> {
        self.workbook
            .get_or_create_table(PERSON_LIST_TABLE, PERSON_LIST_ROWS, PERSON_LIST_COLS)
            .await?;
        Ok(self
            .workbook
            .ensure_header(PERSON_LIST_TABLE, PERSON_LIST_HEADERS)
            .await?)
    }

    /// Load the index unless this pass already did.
    pub async fn load_index(&mut self) -> Result<()> {
        if self.index.is_some() {
            return Ok(());
        }
        self.ensure_person_list().await?;
        let (header, rows) = self.workbook.read_all(PERSON_LIST_TABLE).await?;
        let index = PersonIndex::from_rows(header, &rows);
        tracing::debug!(persons = index.by_name.len(), "Person index loaded");
        self.index = Some(index);
        Ok(())
    }

    /// Resolve `display_name` to a person, creating one if no index entry
    /// carries the same normalized name.
    pub async fn resolve(&mut self, display_name: &str) -> Result<Resolution> {
        let display_name = display_name.trim();
        let key = normalize_name(display_name);
        if key.is_empty() {
            return Err(CoreError::Validation(format!(
                "Name '{display_name}' has no identity key"
            ))
            .into());
        }

        self.load_index().await?;
        let Some(index) = self.index.as_mut() else {
            return Err(CoreError::Internal("Person index not loaded".to_string()).into());
        };
        let now = self.clock.now_str();

        if let Some(entry) = index.by_name.get(&key) {
            refresh_entry(&self.workbook, &index.header, entry, display_name, &key, &now).await?;
            return Ok(Resolution {
                id: entry.id.clone(),
                status: PersonStatus::from_label(&entry.status_label, &self.inactive_marker),
                created: false,
            });
        }

        let id = next_person_id(&index.ids);
        let record = PersonRecord::new(id.clone(), display_name, key.clone(), &now);
        let row = self
            .workbook
            .append_row(PERSON_LIST_TABLE, &record.to_row(&index.header))
            .await?;
        index.ids.push(id.to_string());
        index.by_name.insert(
            key,
            IndexEntry {
                id: id.to_string(),
                row,
                status_label: record.status_label.clone(),
            },
        );
        tracing::info!(person_id = %id, name = display_name, row, "Created person");

        self.ensure_person_page(id.as_str()).await?;
        Ok(Resolution {
            id: id.to_string(),
            status: record.status(&self.inactive_marker),
            created: true,
        })
    }

    /// Create the destination table for `person_id` if missing and merge its
    /// header. Returns the header, cached for the rest of the pass.
    pub async fn ensure_person_page(&mut self, person_id: &str) -> Result<Vec<String>> {
        if let Some(header) = self.pages.get(person_id) {
            return Ok(header.clone());
        }
        self.workbook
            .get_or_create_table(person_id, PERSON_PAGE_ROWS, PERSON_PAGE_COLS)
            .await?;
        let header = self
            .workbook
            .ensure_header(person_id, PERSON_PAGE_HEADERS)
            .await?;
        self.pages.insert(person_id.to_string(), header.clone());
        Ok(header)
    }
}

/// Rewrite name columns (and `Durum` unchanged) of an existing index row,
/// then stamp `Guncellendi`.
async fn refresh_entry(
    workbook: &Workbook,
    header: &[String],
    entry: &IndexEntry,
    display_name: &str,
    key: &str,
    now: &str,
) -> Result<()> {
    let cells = [
        (COL_DISPLAY_NAME, display_name),
        (COL_NORM_NAME, key),
        (COL_STATUS, entry.status_label.as_str()),
    ];
    let positions: Vec<Option<u32>> = cells.iter().map(|(name, _)| position(header, name)).collect();

    match contiguous_start(&positions) {
        Some(first) => {
            let values: Vec<Vec<String>> =
                vec![cells.iter().map(|(_, v)| v.to_string()).collect()];
            workbook
                .write_range(PERSON_LIST_TABLE, entry.row, first, &values)
                .await?;
        }
        None => {
            for ((_, value), col) in cells.iter().zip(&positions) {
                if let Some(col) = col {
                    workbook
                        .update_cell(PERSON_LIST_TABLE, entry.row, *col, value)
                        .await?;
                }
            }
        }
    }

    if let Some(col) = position(header, COL_UPDATED_AT) {
        workbook
            .update_cell(PERSON_LIST_TABLE, entry.row, col, now)
            .await?;
    }
    Ok(())
}

/// First column when every position is present and consecutive.
fn contiguous_start(positions: &[Option<u32>]) -> Option<u32> {
    let first = (*positions.first()?)?;
    positions
        .iter()
        .zip(first..)
        .all(|(pos, expected)| *pos == Some(expected))
        .then_some(first)
}
