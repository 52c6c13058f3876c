//! Person identities, status, and the `RD-NNN` id sequence.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::naming::fold_case;
use crate::layout::{
    COL_CREATED_AT, COL_DISPLAY_NAME, COL_NORM_NAME, COL_PERSON_ID, COL_STATUS, COL_UPDATED_AT,
    STATUS_ACTIVE,
};

/// Prefix of every person id.
pub const PERSON_ID_PREFIX: &str = "RD-";

/// `RD-` followed by at least three digits. Ids past `RD-999` grow a digit
/// and must still count toward the sequence maximum.
static PERSON_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^RD-(\d{3,})$").expect("valid regex"));

// ---------------------------------------------------------------------------
// PersonId
// ---------------------------------------------------------------------------

/// Stable person identifier, e.g. `RD-007`. Also the name of the person's
/// destination log table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    /// Build the id for sequence number `n` (zero-padded to three digits).
    pub fn from_number(n: u32) -> Self {
        Self(format!("{PERSON_ID_PREFIX}{n:03}"))
    }

    /// Parse a well-formed id. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if PERSON_ID_RE.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(CoreError::Validation(format!(
                "Person id '{raw}' does not match {PERSON_ID_PREFIX}NNN"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequence number of a raw id string, or `None` for ids entered by hand in
/// another format.
pub fn sequence_number(raw: &str) -> Option<u32> {
    PERSON_ID_RE
        .captures(raw.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// Next id in the sequence: highest existing suffix plus one.
///
/// Never derived from the count of ids, so gaps left by manual edits cannot
/// cause collisions. Ids outside the format are ignored.
///
/// ```
/// use ares_core::person::next_person_id;
///
/// assert_eq!(next_person_id(["RD-001", "RD-003"]).as_str(), "RD-004");
/// assert_eq!(next_person_id(Vec::<&str>::new()).as_str(), "RD-001");
/// ```
pub fn next_person_id<I, S>(existing: I) -> PersonId
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let max = existing
        .into_iter()
        .filter_map(|id| sequence_number(id.as_ref()))
        .max()
        .unwrap_or(0);
    PersonId::from_number(max.saturating_add(1))
}

// ---------------------------------------------------------------------------
// PersonStatus
// ---------------------------------------------------------------------------

/// Routing-relevant status of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PersonStatus {
    #[default]
    Active,
    Inactive,
}

impl PersonStatus {
    /// Classify a raw `Durum` label. A label is inactive when it starts with
    /// `inactive_marker`, compared case-insensitively with Turkish letters
    /// folded (`PASİF` matches `Pasif`). Empty labels are active.
    pub fn from_label(label: &str, inactive_marker: &str) -> Self {
        let label = fold_case(label.trim());
        let marker = fold_case(inactive_marker.trim());
        if !marker.is_empty() && label.starts_with(&marker) {
            Self::Inactive
        } else {
            Self::Active
        }
    }

    pub fn is_inactive(self) -> bool {
        self == Self::Inactive
    }
}

// ---------------------------------------------------------------------------
// PersonRecord
// ---------------------------------------------------------------------------

/// One row of the person index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub id: PersonId,
    /// Last-seen raw spelling.
    pub display_name: String,
    /// Identity key, see [`crate::naming::normalize_name`].
    pub normalized_name: String,
    /// Raw `Durum` label as stored (e.g. `Aktif`, `Pasif - izinli`).
    pub status_label: String,
    pub created_at: String,
    pub updated_at: String,
}

impl PersonRecord {
    /// A freshly created, active person.
    pub fn new(id: PersonId, display_name: &str, normalized_name: String, now: &str) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            normalized_name,
            status_label: STATUS_ACTIVE.to_string(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn status(&self, inactive_marker: &str) -> PersonStatus {
        PersonStatus::from_label(&self.status_label, inactive_marker)
    }

    /// Value for a person-index column, or `None` for columns this record
    /// does not carry.
    pub fn column(&self, name: &str) -> Option<&str> {
        match name {
            COL_PERSON_ID => Some(self.id.as_str()),
            COL_DISPLAY_NAME => Some(&self.display_name),
            COL_NORM_NAME => Some(&self.normalized_name),
            COL_STATUS => Some(&self.status_label),
            COL_CREATED_AT => Some(&self.created_at),
            COL_UPDATED_AT => Some(&self.updated_at),
            _ => None,
        }
    }

    /// Lay the record out against the person-index header. Start/leave
    /// dates and unknown columns stay blank.
    pub fn to_row(&self, header: &[String]) -> Vec<String> {
        header
            .iter()
            .map(|name| self.column(name).unwrap_or_default().to_string())
            .collect()
    }
}
