//! Poll loop invoking one routing pass per tick.
//!
//! Passes never overlap: the next delay starts only after the previous pass
//! (and its checkpoint writes) finished. Cancellation is honored between
//! passes; a pass in flight always runs to completion.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use ares_router::{PassSummary, Router, RouterError};

/// Cadence of the poll loop. None of these affect routing correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Delay between the end of one pass and the start of the next.
    pub interval: Duration,
    /// Delay before the first pass.
    pub startup_delay: Duration,
    /// Upper bound of the random extra delay added to every interval.
    pub jitter: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            startup_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }
}

impl Schedule {
    /// Interval plus a random jitter in `[0, jitter]`.
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.interval;
        }
        self.interval + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

/// Something that can run one routing pass.
#[async_trait]
pub trait RoutingPass: Send {
    async fn run_pass(&mut self) -> Result<PassSummary, RouterError>;
}

#[async_trait]
impl RoutingPass for Router {
    async fn run_pass(&mut self) -> Result<PassSummary, RouterError> {
        self.route_once().await
    }
}

/// Run one pass and log its outcome. Returns `true` on success.
pub async fn run_logged<P: RoutingPass + ?Sized>(pass: &mut P) -> bool {
    let started = Instant::now();
    let result = pass.run_pass().await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(summary) => {
            tracing::info!(
                summary = %summary,
                processed = summary.total(),
                elapsed_ms,
                "Routing pass complete",
            );
            true
        }
        Err(e) => {
            tracing::error!(error = %e, elapsed_ms, "Routing pass failed");
            false
        }
    }
}

/// Invoke `pass` on `schedule` until `cancel` fires. Failed passes are
/// logged and retried on the next tick.
///
/// Returns the number of passes run.
pub async fn run<P: RoutingPass + ?Sized>(
    pass: &mut P,
    schedule: &Schedule,
    cancel: &CancellationToken,
) -> u64 {
    tracing::info!(
        interval_secs = schedule.interval.as_secs(),
        startup_delay_secs = schedule.startup_delay.as_secs(),
        jitter_secs = schedule.jitter.as_secs(),
        "Router scheduler started",
    );

    let mut passes = 0u64;

    if !schedule.startup_delay.is_zero() {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(passes, "Router scheduler stopping");
                return passes;
            }
            _ = tokio::time::sleep(schedule.startup_delay) => {}
        }
    }

    while !cancel.is_cancelled() {
        run_logged(pass).await;
        passes += 1;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(schedule.next_delay()) => {}
        }
    }

    tracing::info!(passes, "Router scheduler stopping");
    passes
}
