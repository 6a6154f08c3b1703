//! Enrichment job queue
//!
//! A fixed pool of workers claims jobs from the durable `JobStore`, runs each
//! through a `JobHandler`, and acknowledges the outcome:
//! - success removes the job
//! - a transient failure with attempts left is retried after exponential backoff
//! - anything else fails the job terminally and marks the lead failed

mod worker;

pub use crate::storage::EnrichmentJob;
pub use worker::{EnrichmentQueue, JobHandler, JobOutcome, QueueReport};

use std::time::Duration;

/// Delay before retrying a job whose `attempt`-th run failed
///
/// Doubles per attempt starting from `base`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent)
}
