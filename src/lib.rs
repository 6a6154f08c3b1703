//! Lead Prospector: a prospect discovery and enrichment engine
//!
//! This crate harvests business candidates from a paginated directory search API
//! and runs each one through a multi-phase enrichment pipeline (content
//! extraction, structural audit, technology and performance profiling,
//! consolidation) on a bounded pool of workers backed by a durable job queue.

pub mod classifier;
pub mod config;
pub mod discovery;
pub mod enrichment;
pub mod extraction;
pub mod output;
pub mod pipeline;
pub mod queue;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Lead Prospector operations
#[derive(Debug, Error)]
pub enum ProspectError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] discovery::DiscoveryError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] extraction::ExtractionError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] enrichment::EnrichmentError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Lead Prospector operations
pub type Result<T> = std::result::Result<T, ProspectError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use classifier::{classify, FailureClass};
pub use config::Config;
pub use discovery::{Candidate, DiscoveryEngine, DiscoveryRequest};
pub use extraction::{ExtractionResult, ExtractionTier, TieredExtractor};
pub use pipeline::PipelineController;
pub use queue::{EnrichmentJob, EnrichmentQueue};
pub use state::{EnrichmentStatus, JobStatus, TokenState};
pub use url::{normalize_domain, normalize_website};
