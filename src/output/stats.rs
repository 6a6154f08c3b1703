//! Statistics generation from the lead database
//!
//! This module provides functionality for extracting and displaying
//! lead and job statistics from the storage layer.

use crate::pipeline::PipelineReport;
use crate::state::{EnrichmentStatus, JobStatus};
use crate::storage::{JobStore, LeadStore, StorageResult};
use std::collections::HashMap;

/// Lead and queue statistics summary
#[derive(Debug, Clone)]
pub struct ProspectStatistics {
    /// Total number of stored leads
    pub total_leads: u64,

    /// Count of leads by enrichment status
    pub leads_by_status: HashMap<EnrichmentStatus, u64>,

    /// Count of jobs by status; succeeded jobs are removed and never counted
    pub jobs_by_status: HashMap<JobStatus, u64>,
}

impl ProspectStatistics {
    pub fn leads_in(&self, status: EnrichmentStatus) -> u64 {
        self.leads_by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn jobs_in(&self, status: JobStatus) -> u64 {
        self.jobs_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The store to query
///
/// # Returns
///
/// * `Ok(ProspectStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics<S: LeadStore + JobStore>(storage: &S) -> StorageResult<ProspectStatistics> {
    let mut leads_by_status = HashMap::new();
    let mut total_leads = 0;

    for status in EnrichmentStatus::all_statuses() {
        let count = storage.count_by_status(status)?;
        total_leads += count;
        if count > 0 {
            leads_by_status.insert(status, count);
        }
    }

    let mut jobs_by_status = HashMap::new();
    for status in JobStatus::all_statuses() {
        let count = storage.count_jobs_by_status(status)?;
        if count > 0 {
            jobs_by_status.insert(status, count);
        }
    }

    Ok(ProspectStatistics {
        total_leads,
        leads_by_status,
        jobs_by_status,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ProspectStatistics) {
    println!("=== Lead Statistics ===\n");

    println!("Overview:");
    println!("  Total leads: {}", stats.total_leads);
    println!();

    println!("Leads by Status:");
    let mut status_counts: Vec<_> = stats.leads_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (status, count) in status_counts {
        let percentage = if stats.total_leads > 0 {
            (*count as f64 / stats.total_leads as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.jobs_by_status.is_empty() {
        println!("Jobs by Status:");
        let mut job_counts: Vec<_> = stats.jobs_by_status.iter().collect();
        job_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (status, count) in job_counts {
            println!("  {}: {}", status, count);
        }
        println!();
    }

    let completed = stats.leads_in(EnrichmentStatus::Completed);
    let attempted = completed + stats.leads_in(EnrichmentStatus::Failed);
    let success_rate = if attempted > 0 {
        (completed as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Enrichment Success Rate: {:.1}% ({} / {} finished leads)",
        success_rate, completed, attempted
    );
}

/// Prints the outcome of a pipeline run
pub fn print_pipeline_report(report: &PipelineReport) {
    println!("=== Campaign Report ===\n");

    println!("Discovery:");
    println!("  Candidates: {}", report.discovered);
    println!("  Pages fetched: {}", report.discovery.pages_fetched);
    println!("  Filtered as irrelevant: {}", report.discovery.filtered);
    println!("  Duplicate results: {}", report.discovery.duplicates);
    println!("  Stopped: {}", report.discovery.stop_reason);
    if report.discovery.below_minimum {
        println!("  Warning: fewer candidates than the requested minimum");
    }
    println!();

    println!("Ingestion:");
    println!("  Enqueued: {}", report.ingest.enqueued);
    println!("  Re-enqueued: {}", report.ingest.requeued);
    println!("  Already known: {}", report.ingest.skipped_existing);
    println!("  Duplicate domains: {}", report.ingest.duplicate_domains);
    println!("  Without website: {}", report.ingest.without_website);
    if report.ingest.details_failed > 0 {
        println!("  Details lookup failed: {}", report.ingest.details_failed);
    }

    if let Some(queue) = &report.queue {
        println!();
        println!("Enrichment:");
        println!("  Succeeded: {}", queue.succeeded);
        println!("  Retried: {}", queue.retried);
        println!("  Failed: {}", queue.failed);
        if queue.recovered > 0 {
            println!("  Recovered after interruption: {}", queue.recovered);
        }
    }
}
