//! Storage module for persisting leads and enrichment jobs
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Lead records and their enrichment fields
//! - The durable enrichment job queue
//! - Crash recovery for jobs left running by a previous process

mod schema;
mod shared;
mod sqlite;
mod traits;

pub use shared::SharedStorage;
pub use sqlite::SqliteStorage;
pub use traits::{JobStore, LeadStore, StorageError, StorageResult};

use crate::state::{EnrichmentStatus, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opens (or creates) a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Listing fields for a lead that has not been stored yet
#[derive(Debug, Clone)]
pub struct NewLead {
    pub place_id: String,
    pub name: String,
    pub types: Vec<String>,
    pub sponsored: bool,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub domain: Option<String>,
    pub status: EnrichmentStatus,
}

/// A lead as stored in the database
#[derive(Debug, Clone)]
pub struct Lead {
    pub id: i64,
    pub place_id: String,
    pub name: String,
    pub types: Vec<String>,
    pub sponsored: bool,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub domain: Option<String>,
    pub status: EnrichmentStatus,
    /// Cause of the last permanent failure; always set when `status` is `Failed`
    pub error: Option<String>,
    pub technologies: Vec<String>,
    pub performance: Option<PerformanceMetrics>,
    pub audit: Option<SiteAudit>,
    pub content_markdown: Option<String>,
    pub extraction_tier: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub enriched_at: Option<String>,
}

/// Speed measurements for a lead's website
///
/// Every field is optional: the audit API may fail or omit metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Time for the fast tier to receive the document
    pub response_time_ms: Option<u64>,
    /// Lighthouse performance score scaled to 0..=100
    pub performance_score: Option<f64>,
    pub largest_contentful_paint_ms: Option<f64>,
    pub time_to_first_byte_ms: Option<f64>,
}

/// Structural and SEO audit of a lead's home page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteAudit {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub heading_count: usize,
    pub h1_count: usize,
    pub word_count: usize,
    pub has_viewport: bool,
}

/// A job in the durable enrichment queue
#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub id: i64,
    pub lead_id: i64,
    pub url: String,
    /// Number of times the job has been claimed, including the current run
    pub attempt: u32,
    pub max_attempts: u32,
    pub status: JobStatus,
    pub last_error: Option<String>,
    /// Earliest time a worker may claim the job
    pub available_at: DateTime<Utc>,
    pub created_at: String,
    pub updated_at: String,
}

impl EnrichmentJob {
    /// Returns true if a transient failure of the current attempt may be retried
    pub fn has_attempts_left(&self) -> bool {
        self.attempt < self.max_attempts
    }
}
