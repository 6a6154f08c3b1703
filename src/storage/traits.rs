//! Storage traits and error types
//!
//! `LeadStore` is the lead persistence contract the pipeline depends on;
//! `JobStore` is the broker contract behind the enrichment queue.

use crate::state::{EnrichmentStatus, JobStatus};
use crate::storage::{EnrichmentJob, Lead, NewLead};
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Lead not found: {0}")]
    LeadNotFound(i64),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence of lead records
pub trait LeadStore {
    /// Inserts a new lead and returns its id
    ///
    /// Fails with a constraint error if the place id is already stored.
    fn insert_lead(&mut self, lead: &NewLead) -> StorageResult<i64>;

    /// Gets a lead by id
    fn find_by_key(&self, id: i64) -> StorageResult<Option<Lead>>;

    /// Gets a lead by its external place identifier
    fn find_by_place_id(&self, place_id: &str) -> StorageResult<Option<Lead>>;

    /// Gets the first lead stored for a normalized website domain
    fn find_by_domain(&self, domain: &str) -> StorageResult<Option<Lead>>;

    /// Writes every mutable field of `lead` back to the store
    fn save(&mut self, lead: &Lead) -> StorageResult<()>;

    /// Updates only the status and error of a lead
    fn set_enrichment_status(
        &mut self,
        id: i64,
        status: EnrichmentStatus,
        error: Option<&str>,
    ) -> StorageResult<()>;

    /// Counts leads in the given status
    fn count_by_status(&self, status: EnrichmentStatus) -> StorageResult<u64>;
}

/// Durable job queue operations
///
/// Every acknowledgement requires the job to be `running`; terminal
/// states are never left.
pub trait JobStore {
    /// Adds a queued job for `lead_id`, claimable immediately
    fn enqueue(&mut self, lead_id: i64, url: &str, max_attempts: u32) -> StorageResult<i64>;

    /// Atomically claims the oldest available job and marks it running
    ///
    /// Jobs whose lead already has a running job are skipped, so at most
    /// one job per lead is ever in flight. The attempt counter is
    /// incremented on claim.
    fn claim_next(&mut self) -> StorageResult<Option<EnrichmentJob>>;

    /// Removes a succeeded job from the queue
    fn ack_success(&mut self, job_id: i64) -> StorageResult<()>;

    /// Requeues a job after a transient failure, claimable after `delay`
    fn ack_retry(&mut self, job_id: i64, delay: Duration, error: &str) -> StorageResult<()>;

    /// Marks a job as permanently failed
    fn ack_terminal(&mut self, job_id: i64, error: &str) -> StorageResult<()>;

    /// Gets a job by id; succeeded jobs are no longer stored
    fn get_job(&self, job_id: i64) -> StorageResult<Option<EnrichmentJob>>;

    /// Counts jobs that are queued or running
    fn count_active(&self) -> StorageResult<u64>;

    /// Counts jobs in the given status
    fn count_jobs_by_status(&self, status: JobStatus) -> StorageResult<u64>;

    /// Returns true if the lead has a queued or running job
    fn has_active_job(&self, lead_id: i64) -> StorageResult<bool>;

    /// Earliest `available_at` among queued jobs
    fn next_available_at(&self) -> StorageResult<Option<DateTime<Utc>>>;

    /// Returns jobs left running by a crashed process to the queue
    ///
    /// The attempt counter is preserved. Returns the number of recovered jobs.
    fn recover_interrupted(&mut self) -> StorageResult<u64>;
}
