//! Pipeline controller
//!
//! Runs discovery, deduplicates candidates against the lead store by place id
//! and website domain, enqueues enrichment jobs, and optionally drains the queue.

mod controller;

pub use controller::{IngestReport, PipelineController, PipelineReport};
