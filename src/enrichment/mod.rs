//! Enrichment module for Lead Prospector
//!
//! This module turns one lead's website into enrichment fields:
//! - `audit`: structural/SEO audit and markdown content synthesis
//! - `profiling`: technology signature matching
//! - `pagespeed`: third-party performance audit client
//! - `indexing`: fire-and-forget hand-off of consolidated leads
//! - `orchestrator`: the ordered extract → audit → profile → consolidate phases

mod audit;
mod indexing;
mod orchestrator;
mod pagespeed;
mod profiling;

pub use audit::{audit_document, synthesize_markdown};
pub use indexing::{
    indexer_from_config, HttpIndexer, IndexDocument, Indexer, IndexingError, IndexingFailure,
    IndexingRunner, LogIndexer,
};
pub use orchestrator::PhaseOrchestrator;
pub use pagespeed::{AuditReport, PageSpeedClient, PerformanceAudit};
pub use profiling::TechnologyProfiler;

use crate::extraction::ExtractionError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that abort an enrichment attempt
///
/// This is the value the failure classifier inspects.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    #[error("Content synthesis failed: {0}")]
    Audit(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Lead {0} not found")]
    LeadNotFound(i64),

    /// The enrichment task panicked or was cancelled
    #[error("Enrichment task aborted: {0}")]
    Aborted(String),
}
