//! Propagation waits
//!
//! Creates on the control plane return before the resource is visible to
//! subsequent calls. After such a create the sequencer either sleeps for a
//! fixed interval or polls a readiness probe with exponential backoff.

use crate::error::{CloudError, Result};
use crate::provider::{ControlPlane, Probe, RetryConfig};
use seedflow_core::{WaitMode, WaitSettings};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq)]
pub enum WaitStrategy {
    /// Poll until every probe reports ready
    Poll(RetryConfig),
    /// Sleep for a fixed duration without checking anything
    Fixed(Duration),
    /// Do not wait
    Disabled,
}

/// What a wait actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready { attempts: u32 },
    Slept(Duration),
    Skipped,
}

impl WaitStrategy {
    pub fn from_settings(settings: &WaitSettings) -> Self {
        match settings.mode {
            WaitMode::Poll => WaitStrategy::Poll(RetryConfig {
                max_attempts: settings.max_retries.max(1),
                initial_delay: Duration::from_millis(settings.initial_delay_ms),
                max_delay: Duration::from_millis(settings.max_delay_ms),
                backoff_multiplier: settings.multiplier,
            }),
            WaitMode::Fixed => WaitStrategy::Fixed(Duration::from_secs(settings.fixed_secs)),
            WaitMode::Disabled => WaitStrategy::Disabled,
        }
    }

    /// Wait until every probe is ready (or the fixed interval elapses)
    pub async fn wait_for<C>(&self, plane: &C, probes: &[Probe]) -> Result<WaitOutcome>
    where
        C: ControlPlane + ?Sized,
    {
        match self {
            WaitStrategy::Disabled => Ok(WaitOutcome::Skipped),
            WaitStrategy::Fixed(duration) => {
                tracing::debug!("Sleeping {:?} for propagation", duration);
                sleep(*duration).await;
                Ok(WaitOutcome::Slept(*duration))
            }
            WaitStrategy::Poll(retry) => {
                let mut total = 0;
                for probe in probes {
                    // 各プローブが個別に max_attempts を持つ
                    let attempts = poll(plane, probe, retry).await?;
                    tracing::debug!("{} ready after {} attempt(s)", probe, attempts);
                    total += attempts;
                }
                Ok(WaitOutcome::Ready { attempts: total })
            }
        }
    }
}

async fn poll<C>(plane: &C, probe: &Probe, retry: &RetryConfig) -> Result<u32>
where
    C: ControlPlane + ?Sized,
{
    for attempt in 0..retry.max_attempts {
        match plane.is_ready(probe).await {
            Ok(true) => return Ok(attempt + 1),
            Ok(false) => {
                // まだ見えていない
            }
            Err(e) => {
                tracing::debug!("Probe for {} failed: {}", probe, e);
            }
        }

        // 最後の試行でなければ待機
        if attempt + 1 < retry.max_attempts {
            sleep(retry.delay_for_attempt(attempt)).await;
        }
    }

    Err(CloudError::Timeout {
        what: probe.to_string(),
        attempts: retry.max_attempts,
    })
}

/// Retry a call with backoff until it is accepted or attempts run out.
/// Returns the last error on exhaustion.
pub async fn retry_call<F, Fut>(retry: &RetryConfig, what: &str, call: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt + 1 < retry.max_attempts => {
                tracing::debug!("{} rejected (attempt {}): {}", what, attempt + 1, e);
                sleep(retry.delay_for_attempt(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
