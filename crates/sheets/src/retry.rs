//! Exponential-backoff retry for quota-limited store calls.
//!
//! Every operation of a wrapped store goes through [`with_backoff`]. A
//! [`StoreError::RateLimited`] result is retried after
//! `base_delay * 2^attempt` plus a random jitter in `[0, max_jitter]`, up to
//! [`RetryPolicy::max_attempts`] calls in total. After the last attempt the
//! error is returned unchanged. Any other error is returned immediately.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use ares_core::types::RowIndex;

use crate::error::Result;
use crate::store::TableStore;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total calls per operation, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each failure.
    pub base_delay: Duration,
    /// Upper bound of the random jitter added to every delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping. Intended for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Deterministic part of the delay after the failed `attempt`
    /// (zero-based): `base_delay * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    /// Full delay after the failed `attempt`, jitter included.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        self.backoff(attempt) + jitter
    }
}

/// Run `call` until it succeeds, fails with a non-quota error, or the
/// policy's attempts are exhausted.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, op: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                tracing::warn!(
                    op,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Store quota hit, backing off",
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_rate_limited() {
                    tracing::error!(op, attempts = attempt + 1, "Store quota retries exhausted");
                }
                return Err(e);
            }
        }
    }
}

/// A [`TableStore`] whose every operation is wrapped in [`with_backoff`].
pub struct RateLimitedStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: TableStore> RateLimitedStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: TableStore> TableStore for RateLimitedStore<S> {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        with_backoff(&self.policy, "table_exists", || self.inner.table_exists(table)).await
    }

    async fn create_table(&self, table: &str, rows: u32, cols: u32) -> Result<()> {
        with_backoff(&self.policy, "create_table", || {
            self.inner.create_table(table, rows, cols)
        })
        .await
    }

    async fn read_range(
        &self,
        table: &str,
        first: RowIndex,
        last: Option<RowIndex>,
    ) -> Result<Vec<Vec<String>>> {
        with_backoff(&self.policy, "read_range", || {
            self.inner.read_range(table, first, last)
        })
        .await
    }

    async fn write_range(
        &self,
        table: &str,
        row: RowIndex,
        col: u32,
        values: &[Vec<String>],
    ) -> Result<()> {
        with_backoff(&self.policy, "write_range", || {
            self.inner.write_range(table, row, col, values)
        })
        .await
    }

    async fn update_cell(&self, table: &str, row: RowIndex, col: u32, value: &str) -> Result<()> {
        with_backoff(&self.policy, "update_cell", || {
            self.inner.update_cell(table, row, col, value)
        })
        .await
    }

    async fn append_row(&self, table: &str, values: &[String]) -> Result<RowIndex> {
        with_backoff(&self.policy, "append_row", || {
            self.inner.append_row(table, values)
        })
        .await
    }

    async fn row_count(&self, table: &str) -> Result<RowIndex> {
        with_backoff(&self.policy, "row_count", || self.inner.row_count(table)).await
    }
}
