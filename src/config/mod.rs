//! Configuration module for Lead Prospector
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every component receives the section it needs through its constructor.
//!
//! # Example
//!
//! ```no_run
//! use lead_prospector::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("prospector.toml")).unwrap();
//! println!("Enrichment workers: {}", config.queue.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_relevance_rules, default_technologies, Config, DiscoveryConfig, ExtractionConfig,
    IndexingConfig, ProfilingConfig, QueueConfig, RelevanceRule, StorageConfig,
    TechnologySignature,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, PAGESPEED_KEY_ENV, PLACES_KEY_ENV,
};
pub use validation::validate;
