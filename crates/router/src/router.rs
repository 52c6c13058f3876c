//! One incremental routing pass over every configured source log.

use std::fmt;
use std::ops::RangeInclusive;

use ares_core::clock::Clock;
use ares_core::layout::{
    ATTENDANCE_TABLE, COL_PROCESSED_AT, COL_ROUTED_TO, DEFAULT_INACTIVE_MARKER,
    DEFAULT_SOURCE_TABLES, DEFAULT_WINDOW, ROUTED_INACTIVE,
};
use ares_core::naming::normalize_name;
use ares_core::types::{RoutedEntry, RowIndex, SourceRow, FIRST_DATA_ROW};
use ares_sheets::Workbook;

use crate::checkpoint::CheckpointStore;
use crate::error::Result;
use crate::extract::{extract_name, make_source_key, pick_event_time, source_label, SourceKind};
use crate::persons::IdentityResolver;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Source logs, routed in this order.
    pub source_tables: Vec<String>,
    /// Sources that name the person in `Kisi`.
    pub attendance_tables: Vec<String>,
    /// Trailing rows scanned per source per pass.
    pub window: u32,
    /// `Durum` prefix that marks a person inactive.
    pub inactive_marker: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            source_tables: DEFAULT_SOURCE_TABLES.iter().map(|s| s.to_string()).collect(),
            attendance_tables: vec![ATTENDANCE_TABLE.to_string()],
            window: DEFAULT_WINDOW,
            inactive_marker: DEFAULT_INACTIVE_MARKER.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// PassSummary
// ---------------------------------------------------------------------------

/// Rows processed per source in one pass, in routing order. Rows routed to
/// `PASIF` count as processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    counts: Vec<(String, usize)>,
}

impl PassSummary {
    pub fn record(&mut self, source: &str, processed: usize) {
        self.counts.push((source.to_string(), processed));
    }

    pub fn get(&self, source: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, n)| *n)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(name, n)| (name.as_str(), *n))
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, n)) in self.counts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}:{n}")?;
        }
        Ok(())
    }
}

/// Rows to scan: from `start_row`, but never before the trailing `window`
/// rows ending at `last_row`. `None` when nothing is left to scan.
///
/// ```
/// use ares_router::router::scan_window;
///
/// // 500 data rows occupy rows 2..=501; from a fresh checkpoint only the
/// // last 200 are scanned.
/// assert_eq!(scan_window(501, 2, 200), Some(302..=501));
/// assert_eq!(scan_window(501, 450, 200), Some(450..=501));
/// assert_eq!(scan_window(501, 502, 200), None);
/// ```
pub fn scan_window(
    last_row: RowIndex,
    start_row: RowIndex,
    window: u32,
) -> Option<RangeInclusive<RowIndex>> {
    let trailing = last_row.saturating_sub(window.max(1)) + 1;
    let start = FIRST_DATA_ROW.max(trailing).max(start_row);
    (start <= last_row).then_some(start..=last_row)
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Routes source rows into per-person destination logs.
///
/// `source` holds the logs; `destination` holds the person index, the
/// person tables and `_State`. Both may be the same workbook.
pub struct Router {
    source: Workbook,
    destination: Workbook,
    checkpoints: CheckpointStore,
    resolver: IdentityResolver,
    clock: Clock,
    config: RouterConfig,
}

impl Router {
    pub fn new(source: Workbook, destination: Workbook, clock: Clock, config: RouterConfig) -> Self {
        Self {
            checkpoints: CheckpointStore::new(destination.clone()),
            resolver: IdentityResolver::new(destination.clone(), clock, &config.inactive_marker),
            source,
            destination,
            clock,
            config,
        }
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Route every configured source once.
    ///
    /// A store error abandons the pass. Sources routed before the failure
    /// keep their advanced checkpoint; later ones are untouched.
    pub async fn route_once(&mut self) -> Result<PassSummary> {
        self.resolver.begin_pass();
        let result = self.route_sources().await;
        self.resolver.begin_pass();
        result
    }

    async fn route_sources(&mut self) -> Result<PassSummary> {
        let mut summary = PassSummary::default();
        let sources = self.config.source_tables.clone();
        for source in &sources {
            let processed = self.route_source(source).await?;
            summary.record(source, processed);
        }
        Ok(summary)
    }

    /// Route the unprocessed rows of one source log and advance its
    /// checkpoint. Returns the number of rows processed.
    pub async fn route_source(&mut self, source: &str) -> Result<usize> {
        if !self.source.table_exists(source).await? {
            tracing::info!(source, "Source table missing, skipping");
            return Ok(0);
        }

        let processed_col = self.source.ensure_column(source, COL_PROCESSED_AT).await?;
        let routed_col = self.source.ensure_column(source, COL_ROUTED_TO).await?;
        let last_done = self.checkpoints.get_last_row(source).await?;

        let header = self.source.read_header(source).await?;
        let last_row = self.source.row_count(source).await?;
        let Some(window) =
            scan_window(last_row, last_done.saturating_add(1), self.config.window)
        else {
            tracing::debug!(source, last_done, last_row, "Nothing new to scan");
            return Ok(0);
        };
        let rows = self
            .source
            .read_rows(source, &header, *window.start(), Some(*window.end()))
            .await?;

        let kind = SourceKind::for_table(source, &self.config.attendance_tables);
        let marks = ControlColumns {
            processed_at: processed_col,
            routed_to: routed_col,
        };
        let mut max_seen = last_done;
        let mut processed = 0usize;

        for row in &rows {
            max_seen = max_seen.max(row.row);
            if self.route_row(source, kind, marks, row).await? {
                processed += 1;
            }
        }

        if max_seen > last_done {
            self.checkpoints.set_last_row(source, max_seen).await?;
        }
        tracing::info!(
            source,
            processed,
            first = *window.start(),
            last = *window.end(),
            "Source routed",
        );
        Ok(processed)
    }

    /// Handle one row. Returns whether the row was marked processed.
    async fn route_row(
        &mut self,
        source: &str,
        kind: SourceKind,
        marks: ControlColumns,
        row: &SourceRow,
    ) -> Result<bool> {
        if row.non_empty(COL_PROCESSED_AT).is_some() {
            return Ok(false);
        }
        let Some(name) = extract_name(kind, row).filter(|n| !normalize_name(n).is_empty()) else {
            tracing::debug!(source, row = row.row, "No person name, leaving row unprocessed");
            return Ok(false);
        };

        let person = self.resolver.resolve(&name).await?;
        let now = self.clock.now_str();

        if person.status.is_inactive() {
            self.mark(source, row.row, marks, &now, ROUTED_INACTIVE).await?;
            tracing::debug!(source, row = row.row, person_id = %person.id, "Person inactive");
            return Ok(true);
        }

        let entry = RoutedEntry {
            source: source_label(source).to_string(),
            source_key: make_source_key(source, row),
            event_time: pick_event_time(row),
            fields_json: row.fields_json(),
            processed_at: now.clone(),
        };
        let page_header = self.resolver.ensure_person_page(&person.id).await?;
        self.destination
            .append_row(&person.id, &entry.to_row(&page_header))
            .await?;
        self.mark(source, row.row, marks, &now, &person.id).await?;

        tracing::debug!(
            source,
            row = row.row,
            person_id = %person.id,
            new_person = person.created,
            source_key = %entry.source_key,
            "Row routed",
        );
        Ok(true)
    }

    /// Write `ProcessedAt` and `RoutedTo`, in one call when adjacent.
    async fn mark(
        &self,
        source: &str,
        row: RowIndex,
        marks: ControlColumns,
        now: &str,
        routed_to: &str,
    ) -> Result<()> {
        if marks.routed_to == marks.processed_at + 1 {
            let values = vec![vec![now.to_string(), routed_to.to_string()]];
            self.source
                .write_range(source, row, marks.processed_at, &values)
                .await?;
        } else {
            self.source
                .update_cell(source, row, marks.processed_at, now)
                .await?;
            self.source
                .update_cell(source, row, marks.routed_to, routed_to)
                .await?;
        }
        Ok(())
    }
}

/// 1-based positions of the routing-control columns in a source log.
#[derive(Debug, Clone, Copy)]
struct ControlColumns {
    processed_at: u32,
    routed_to: u32,
}
