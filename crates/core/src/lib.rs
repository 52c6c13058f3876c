//! Domain building blocks for the personnel log router.
//!
//! Everything in this crate is pure: name normalization, the person-id
//! sequence, persisted table layouts, and the timezone-aware clock used
//! for every timestamp the router writes. Store access lives in
//! `ares-sheets`; the routing engine lives in `ares-router`.

pub mod clock;
pub mod error;
pub mod layout;
pub mod naming;
pub mod person;
pub mod types;
