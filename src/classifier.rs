//! Transient/terminal failure classification
//!
//! A pure decision over an `EnrichmentError`. Only an unreachable host is
//! terminal: retrying a DNS failure or a refused connection cannot succeed.
//! Timeouts, challenge pages that survive rendering, rate limiting, and
//! server errors may clear on a later attempt.

use crate::enrichment::EnrichmentError;
use crate::extraction::{ExtractionError, FetchFailure};
use std::fmt;

/// Retry decision for a failed enrichment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Terminal,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

/// Browser and resolver messages that mean the host cannot be reached
const UNREACHABLE_PATTERNS: &[&str] = &[
    "err_name_not_resolved",
    "err_connection_refused",
    "err_address_unreachable",
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "connection refused",
];

/// Classifies an enrichment failure
pub fn classify(error: &EnrichmentError) -> FailureClass {
    match error {
        EnrichmentError::Extraction(err) => classify_extraction(err),
        EnrichmentError::LeadNotFound(_) => FailureClass::Terminal,
        EnrichmentError::Audit(_) | EnrichmentError::Storage(_) | EnrichmentError::Aborted(_) => {
            FailureClass::Transient
        }
    }
}

fn classify_extraction(error: &ExtractionError) -> FailureClass {
    match error {
        ExtractionError::Exhausted {
            fast: FetchFailure::Unreachable(_),
            ..
        } => FailureClass::Terminal,
        ExtractionError::Exhausted { cause, .. } if mentions_unreachable(cause) => {
            FailureClass::Terminal
        }
        _ => FailureClass::Transient,
    }
}

fn mentions_unreachable(cause: &str) -> bool {
    let cause = cause.to_lowercase();
    UNREACHABLE_PATTERNS.iter().any(|p| cause.contains(p))
}
