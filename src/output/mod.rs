//! Output module for run reports and store statistics
//!
//! This module handles:
//! - Summarizing lead and job counts from the store (`--stats`)
//! - Printing the report of a pipeline run

pub mod stats;

pub use stats::{load_statistics, print_pipeline_report, print_statistics, ProspectStatistics};
