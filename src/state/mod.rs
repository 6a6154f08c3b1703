//! State module for tracking discovery and enrichment progress
//!
//! # Components
//!
//! - `TokenState` / `AcquisitionToken`: the continuation-cursor state machine of one discovery run
//! - `JobStatus`: lifecycle of a queued enrichment job
//! - `EnrichmentStatus`: the user-visible enrichment status of a lead

mod enrichment_status;
mod job_status;
mod token_state;

// Re-export main types
pub use enrichment_status::EnrichmentStatus;
pub use job_status::JobStatus;
pub use token_state::{AcquisitionToken, TokenState};
