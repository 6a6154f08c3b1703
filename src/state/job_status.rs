/// Enrichment job status definitions
use std::fmt;

/// Lifecycle of an enrichment job in the durable queue
///
/// ```text
/// Queued -> Running -> Succeeded
///                   -> FailedTransient -> Queued (retry with backoff)
///                   -> FailedTerminal
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Waiting for a worker (possibly until a backoff deadline)
    Queued,

    /// Claimed by a worker
    Running,

    /// All phases completed
    Succeeded,

    /// Failed with a retryable error; about to be requeued
    FailedTransient,

    /// Failed permanently; never picked up again
    FailedTerminal,
}

impl JobStatus {
    /// Returns true if the job will never run again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedTerminal)
    }

    /// Returns true if the job still occupies its lead
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Running | Self::FailedTransient)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::FailedTransient)
                | (Self::Running, Self::FailedTerminal)
                | (Self::Running, Self::Queued)
                | (Self::FailedTransient, Self::Queued)
                | (Self::FailedTransient, Self::FailedTerminal)
        )
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::FailedTransient => "failed_transient",
            Self::FailedTerminal => "failed_terminal",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed_transient" => Some(Self::FailedTransient),
            "failed_terminal" => Some(Self::FailedTerminal),
            _ => None,
        }
    }

    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Running,
            Self::Succeeded,
            Self::FailedTransient,
            Self::FailedTerminal,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
