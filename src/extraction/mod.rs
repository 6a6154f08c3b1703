//! Two-tier content extraction
//!
//! Tier 1 is a plain HTTP fetch with browser-like headers. When it is blocked,
//! challenged, or fails outright, the URL escalates to tier 2, a headless
//! Chromium session that renders the page with heavy resources blocked.

mod browser;
mod challenge;
mod engine;
mod fetcher;

pub use browser::{ChromiumRenderer, RenderTier, RenderedPage};
pub use challenge::{ChallengeDetector, ChallengeVerdict, ContentSignature};
pub use engine::TieredExtractor;
pub use fetcher::{FastFetcher, FastResponse};

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Tier that produced an extraction result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionTier {
    Fast,
    Fallback,
}

impl ExtractionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ExtractionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw document produced by the tiered extractor
///
/// Never persisted on its own; the orchestrator derives lead fields from it.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub body: String,
    pub tier: ExtractionTier,
    pub signature: ContentSignature,
    /// Time for the fast tier to receive a response, when it got one
    pub response_time_ms: Option<u64>,
}

/// Why the fast tier did not produce a usable document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// DNS resolution failed or the connection was refused
    Unreachable(String),
    Timeout,
    /// Non-success status that is not a known blocking status
    Status(u16),
    /// Blocking status or challenge page
    Challenged(ChallengeVerdict),
    /// Any other transport failure
    Network(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(cause) => write!(f, "unreachable: {}", cause),
            Self::Timeout => write!(f, "timed out"),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Challenged(verdict) => write!(f, "challenged: {}", verdict),
            Self::Network(cause) => write!(f, "network error: {}", cause),
        }
    }
}

/// Errors produced by the extraction tiers
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Browser navigation timed out after {0:?}")]
    BrowserTimeout(Duration),

    #[error("Challenge page not cleared by the browser: {0}")]
    ChallengeNotCleared(ChallengeVerdict),

    /// Both tiers failed; `cause` is the fallback tier's error
    #[error("Extraction failed (fast tier {fast}; fallback: {cause})")]
    Exhausted { fast: FetchFailure, cause: String },
}
