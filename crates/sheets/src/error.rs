//! Store error taxonomy.
//!
//! Callers branch on three classes: not-found (non-fatal, triggers creation
//! or a skip), rate-limited (retried inside [`RateLimitedStore`]), and
//! everything else (fatal for the current pass).
//!
//! [`RateLimitedStore`]: crate::retry::RateLimitedStore

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The table or range does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Quota or rate limit hit; safe to retry after a delay.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Credentials rejected or token exchange failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The store returned a non-success status that is not retryable.
    #[error("Store API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with something we could not interpret.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl StoreError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StoreError>;
