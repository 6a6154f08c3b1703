//! Shared handle to the SQLite store for async callers
//!
//! Workers, the controller, and the orchestrator all hold clones of one
//! `SharedStorage`. Each call locks the connection for the duration of a
//! single statement group and never across an `.await`.

use crate::state::{EnrichmentStatus, JobStatus};
use crate::storage::traits::{JobStore, LeadStore, StorageError, StorageResult};
use crate::storage::{EnrichmentJob, Lead, NewLead, SqliteStorage};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Cloneable, thread-safe handle to a `SqliteStorage`
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<Mutex<SqliteStorage>>,
}

impl SharedStorage {
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
        }
    }

    /// Runs `f` with exclusive access to the underlying store
    pub fn with<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut SqliteStorage) -> StorageResult<T>,
    {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        f(&mut guard)
    }
}

impl LeadStore for SharedStorage {
    fn insert_lead(&mut self, lead: &NewLead) -> StorageResult<i64> {
        self.with(|s| s.insert_lead(lead))
    }

    fn find_by_key(&self, id: i64) -> StorageResult<Option<Lead>> {
        self.with(|s| s.find_by_key(id))
    }

    fn find_by_place_id(&self, place_id: &str) -> StorageResult<Option<Lead>> {
        self.with(|s| s.find_by_place_id(place_id))
    }

    fn find_by_domain(&self, domain: &str) -> StorageResult<Option<Lead>> {
        self.with(|s| s.find_by_domain(domain))
    }

    fn save(&mut self, lead: &Lead) -> StorageResult<()> {
        self.with(|s| s.save(lead))
    }

    fn set_enrichment_status(
        &mut self,
        id: i64,
        status: EnrichmentStatus,
        error: Option<&str>,
    ) -> StorageResult<()> {
        self.with(|s| s.set_enrichment_status(id, status, error))
    }

    fn count_by_status(&self, status: EnrichmentStatus) -> StorageResult<u64> {
        self.with(|s| s.count_by_status(status))
    }
}

impl JobStore for SharedStorage {
    fn enqueue(&mut self, lead_id: i64, url: &str, max_attempts: u32) -> StorageResult<i64> {
        self.with(|s| s.enqueue(lead_id, url, max_attempts))
    }

    fn claim_next(&mut self) -> StorageResult<Option<EnrichmentJob>> {
        self.with(|s| s.claim_next())
    }

    fn ack_success(&mut self, job_id: i64) -> StorageResult<()> {
        self.with(|s| s.ack_success(job_id))
    }

    fn ack_retry(&mut self, job_id: i64, delay: Duration, error: &str) -> StorageResult<()> {
        self.with(|s| s.ack_retry(job_id, delay, error))
    }

    fn ack_terminal(&mut self, job_id: i64, error: &str) -> StorageResult<()> {
        self.with(|s| s.ack_terminal(job_id, error))
    }

    fn get_job(&self, job_id: i64) -> StorageResult<Option<EnrichmentJob>> {
        self.with(|s| s.get_job(job_id))
    }

    fn count_active(&self) -> StorageResult<u64> {
        self.with(|s| s.count_active())
    }

    fn count_jobs_by_status(&self, status: JobStatus) -> StorageResult<u64> {
        self.with(|s| s.count_jobs_by_status(status))
    }

    fn has_active_job(&self, lead_id: i64) -> StorageResult<bool> {
        self.with(|s| s.has_active_job(lead_id))
    }

    fn next_available_at(&self) -> StorageResult<Option<DateTime<Utc>>> {
        self.with(|s| s.next_available_at())
    }

    fn recover_interrupted(&mut self) -> StorageResult<u64> {
        self.with(|s| s.recover_interrupted())
    }
}
