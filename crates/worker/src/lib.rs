//! `ares-worker` -- polling shell around the personnel router.
//!
//! Loads configuration from the environment, builds the Google Sheets
//! backed [`Router`](ares_router::Router) and invokes one routing pass per
//! tick until shut down.

pub mod config;
pub mod logging;
pub mod scheduler;
