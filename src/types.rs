use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Answer from a single status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeOutcome {
    Success,
    /// The service asks to be polled again later.
    RetryAfter,
    Failure,
}

impl ProbeOutcome {
    pub const ALL: [ProbeOutcome; 3] = [
        ProbeOutcome::Success,
        ProbeOutcome::RetryAfter,
        ProbeOutcome::Failure,
    ];
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Success => write!(f, "Success"),
            ProbeOutcome::RetryAfter => write!(f, "RetryAfter"),
            ProbeOutcome::Failure => write!(f, "Failure"),
        }
    }
}

/// Terminal classification of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Success,
    Failure,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Success => write!(f, "Success"),
            ApplicationStatus::Failure => write!(f, "Failure"),
        }
    }
}

/// Why a run stopped. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Both probes answered `Success` in the same round.
    AllSucceeded,
    /// A round had no `RetryAfter` and was not unanimous success.
    ServiceFailed,
    /// The deadline passed before a definitive round.
    TimedOut,
}

impl TerminationReason {
    pub fn status(&self) -> ApplicationStatus {
        match self {
            TerminationReason::AllSucceeded => ApplicationStatus::Success,
            TerminationReason::ServiceFailed | TerminationReason::TimedOut => {
                ApplicationStatus::Failure
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TerminationReason::AllSucceeded => "Both services succeeded",
            TerminationReason::ServiceFailed => "Both or one services failed",
            TerminationReason::TimedOut => "Operation timed out",
        }
    }
}

/// Final result of a run, built once when the engine terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub identifier: String,
    pub status: ApplicationStatus,
    pub reason: TerminationReason,
    pub description: String,
    pub completed_at: DateTime<Utc>,
    pub retry_count: u32,
}

impl OperationResult {
    pub fn new(
        identifier: &str,
        reason: TerminationReason,
        completed_at: DateTime<Utc>,
        retry_count: u32,
    ) -> Self {
        Self {
            identifier: identifier.to_string(),
            status: reason.status(),
            reason,
            description: reason.description().to_string(),
            completed_at,
            retry_count,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for OperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ({}) at {}, retries: {}",
            self.identifier,
            self.status,
            self.description,
            self.completed_at.to_rfc3339(),
            self.retry_count
        )
    }
}
