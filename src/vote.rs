//! Two-way vote over the outcomes of one round.

use crate::types::ProbeOutcome;

/// What the engine does after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    TerminateSuccess,
    Retry,
    TerminateFailure,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::TerminateSuccess => write!(f, "terminate-success"),
            Verdict::Retry => write!(f, "retry"),
            Verdict::TerminateFailure => write!(f, "terminate-failure"),
        }
    }
}

/// Apply the decision rule; first match wins:
///
/// 1. every outcome is `Success` -> [`Verdict::TerminateSuccess`]
/// 2. any outcome is `RetryAfter` -> [`Verdict::Retry`]
/// 3. otherwise -> [`Verdict::TerminateFailure`]
///
/// `RetryAfter` outranks `Failure`, so a transient answer from either
/// service defers judgment.
pub fn decide(outcomes: [ProbeOutcome; 2]) -> Verdict {
    if outcomes.iter().all(|o| *o == ProbeOutcome::Success) {
        Verdict::TerminateSuccess
    } else if outcomes.iter().any(|o| *o == ProbeOutcome::RetryAfter) {
        Verdict::Retry
    } else {
        Verdict::TerminateFailure
    }
}
