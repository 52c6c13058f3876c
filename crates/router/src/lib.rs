//! Incremental routing of source-log rows into per-person destination logs.
//!
//! - [`checkpoint::CheckpointStore`]: per-source watermark in `_State`.
//! - [`persons::IdentityResolver`]: display name to stable `RD-NNN` id,
//!   backed by a person index cached for the duration of one pass.
//! - [`extract`]: per-source field extraction rules (name, correlation
//!   key, event time).
//! - [`router::Router`]: one routing pass over every configured source.
//!
//! Delivery is at-least-once: the destination entry is written before the
//! source row is marked, so a crash in between duplicates rather than loses
//! an event. Consumers de-duplicate on `SourceKey`.

pub mod checkpoint;
pub mod error;
pub mod extract;
pub mod persons;
pub mod router;

pub use error::{Result, RouterError};
pub use router::{PassSummary, Router, RouterConfig};
