use crate::classifier::{classify, FailureClass};
use crate::config::QueueConfig;
use crate::enrichment::{EnrichmentError, PhaseOrchestrator};
use crate::queue::{backoff_delay, EnrichmentJob};
use crate::state::EnrichmentStatus;
use crate::storage::{JobStore, LeadStore, SharedStorage, StorageError, StorageResult};
use crate::ProspectError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Executes one claimed job
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &EnrichmentJob) -> Result<(), EnrichmentError>;
}

#[async_trait]
impl JobHandler for PhaseOrchestrator {
    async fn handle(&self, job: &EnrichmentJob) -> Result<(), EnrichmentError> {
        self.enrich(job).await.map(|_| ())
    }
}

/// What happened to a job after one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Retried,
    Failed,
}

/// Outcome counts for a drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub succeeded: u64,
    pub retried: u64,
    pub failed: u64,
    /// Jobs returned to the queue after an interrupted run
    pub recovered: u64,
}

impl QueueReport {
    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => self.succeeded += 1,
            JobOutcome::Retried => self.retried += 1,
            JobOutcome::Failed => self.failed += 1,
        }
    }
}

impl AddAssign for QueueReport {
    fn add_assign(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.retried += other.retried;
        self.failed += other.failed;
        self.recovered += other.recovered;
    }
}

/// Durable, bounded-concurrency enrichment queue
#[derive(Clone)]
pub struct EnrichmentQueue {
    storage: SharedStorage,
    handler: Arc<dyn JobHandler>,
    config: QueueConfig,
}

impl EnrichmentQueue {
    pub fn new(storage: SharedStorage, handler: Arc<dyn JobHandler>, config: QueueConfig) -> Self {
        Self {
            storage,
            handler,
            config,
        }
    }

    /// Queues an enrichment job for a lead and marks the lead pending
    pub fn enqueue(&self, lead_id: i64, url: &str) -> StorageResult<i64> {
        let max_attempts = self.config.max_attempts;
        self.storage.with(|s| {
            let job_id = s.enqueue(lead_id, url, max_attempts)?;
            s.set_enrichment_status(lead_id, EnrichmentStatus::Pending, None)?;
            Ok(job_id)
        })
    }

    /// Returns jobs left running by an interrupted process to the queue
    pub fn recover(&self) -> StorageResult<u64> {
        let recovered = self.storage.with(|s| s.recover_interrupted())?;
        if recovered > 0 {
            info!("Recovered {} interrupted jobs", recovered);
        }
        Ok(recovered)
    }

    /// Runs workers until no queued or running job remains
    ///
    /// Jobs waiting out a retry delay keep the pool alive; idle workers sleep
    /// until the next job becomes available, polling at most every
    /// `poll-interval-ms`.
    pub async fn drain(&self) -> Result<QueueReport, ProspectError> {
        let mut report = QueueReport {
            recovered: self.recover()?,
            ..QueueReport::default()
        };

        let workers = self.config.workers.max(1);
        info!("Starting {} enrichment workers", workers);

        let mut handles = Vec::with_capacity(workers as usize);
        for id in 0..workers {
            let queue = self.clone();
            handles.push(tokio::spawn(async move { queue.work(id).await }));
        }

        // Every worker is joined before the first error is returned
        let mut first_error: Option<ProspectError> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(worker_report)) => report += worker_report,
                Ok(Err(e)) => {
                    error!("Worker stopped on storage error: {}", e);
                    first_error.get_or_insert(e.into());
                }
                Err(e) => {
                    error!("Worker task failed: {}", e);
                    first_error.get_or_insert(e.into());
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            "Queue drained: {} succeeded, {} retried, {} failed",
            report.succeeded, report.retried, report.failed
        );
        Ok(report)
    }

    /// Claims and runs a single job, if one is available now
    pub async fn process_next(&self) -> StorageResult<Option<JobOutcome>> {
        match self.storage.with(|s| s.claim_next())? {
            Some(job) => self.execute(job).await.map(Some),
            None => Ok(None),
        }
    }

    async fn work(&self, id: u32) -> StorageResult<QueueReport> {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let mut report = QueueReport::default();

        loop {
            if let Some(outcome) = self.process_next().await? {
                report.record(outcome);
                continue;
            }

            if self.storage.count_active()? == 0 {
                debug!("Worker {} found the queue empty", id);
                return Ok(report);
            }

            let next = self.storage.next_available_at()?;
            tokio::time::sleep(idle_wait(next, Utc::now(), poll)).await;
        }
    }

    async fn execute(&self, job: EnrichmentJob) -> StorageResult<JobOutcome> {
        debug!(
            "Running job {} for lead {} (attempt {}/{})",
            job.id, job.lead_id, job.attempt, job.max_attempts
        );

        let err = match self.run_handler(&job).await {
            Ok(()) => {
                self.storage.with(|s| s.ack_success(job.id))?;
                return Ok(JobOutcome::Succeeded);
            }
            Err(err) => err,
        };

        let message = err.to_string();
        let class = classify(&err);

        if class == FailureClass::Transient && job.has_attempts_left() {
            let base = Duration::from_millis(self.config.backoff_base_ms);
            let delay = backoff_delay(base, job.attempt);
            warn!(
                "Job {} attempt {}/{} failed ({}), retrying in {:?}: {}",
                job.id, job.attempt, job.max_attempts, class, delay, message
            );
            self.storage.with(|s| s.ack_retry(job.id, delay, &message))?;
            return Ok(JobOutcome::Retried);
        }

        error!(
            "Job {} for lead {} failed permanently ({}, attempt {}/{}): {}",
            job.id, job.lead_id, class, job.attempt, job.max_attempts, message
        );
        self.storage.with(|s| {
            s.ack_terminal(job.id, &message)?;
            match s.set_enrichment_status(job.lead_id, EnrichmentStatus::Failed, Some(&message)) {
                Err(StorageError::LeadNotFound(_)) => Ok(()),
                other => other,
            }
        })?;

        Ok(JobOutcome::Failed)
    }

    /// Runs the handler on its own task so a panic fails the attempt
    /// instead of the worker holding the claim
    async fn run_handler(&self, job: &EnrichmentJob) -> Result<(), EnrichmentError> {
        let handler = Arc::clone(&self.handler);
        let claimed = job.clone();

        match tokio::spawn(async move { handler.handle(&claimed).await }).await {
            Ok(result) => result,
            Err(e) => Err(EnrichmentError::Aborted(e.to_string())),
        }
    }
}

/// How long an idle worker sleeps before polling again
///
/// A job that is already available but was not claimed belongs to a lead
/// with a running job, so the worker falls back to the poll interval.
fn idle_wait(next: Option<DateTime<Utc>>, now: DateTime<Utc>, poll: Duration) -> Duration {
    next.and_then(|at| (at - now).to_std().ok())
        .filter(|until| !until.is_zero())
        .map(|until| until.min(poll))
        .unwrap_or(poll)
}
