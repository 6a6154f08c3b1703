/// User-visible enrichment status of a lead
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichmentStatus {
    /// Stored but never queued
    Unprocessed,

    /// A job is queued or running for this lead
    Pending,

    /// Enrichment finished and the lead fields are populated
    Completed,

    /// Enrichment failed permanently; the lead carries the error cause
    Failed,

    /// The listing has no website to enrich
    NotFound,
}

impl EnrichmentStatus {
    /// Returns true if a new job may be queued for a lead in this status
    pub fn is_enqueueable(&self) -> bool {
        matches!(self, Self::Unprocessed | Self::Failed)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Unprocessed => "unprocessed",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::NotFound => "not_found",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "unprocessed" => Some(Self::Unprocessed),
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "not_found" => Some(Self::NotFound),
            _ => None,
        }
    }

    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Unprocessed,
            Self::Pending,
            Self::Completed,
            Self::Failed,
            Self::NotFound,
        ]
    }
}

impl fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
