use ares_core::error::CoreError;
use ares_sheets::StoreError;

/// Errors that abandon a routing pass.
///
/// Data problems (unextractable names, malformed index rows) never surface
/// here; they are handled row by row.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, RouterError>;
