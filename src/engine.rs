use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::EngineConfig;
use crate::probe::StatusProbe;
use crate::types::{OperationResult, ProbeOutcome, TerminationReason};
use crate::vote::{decide, Verdict};

/// Polls two probes per round, votes on the pair, and retries until a
/// definitive answer or the deadline.
pub struct PollEngine {
    probes: [Arc<dyn StatusProbe>; 2],
    config: EngineConfig,
}

impl PollEngine {
    pub fn new(
        probe_a: Arc<dyn StatusProbe>,
        probe_b: Arc<dyn StatusProbe>,
        config: EngineConfig,
    ) -> Self {
        Self {
            probes: [probe_a, probe_b],
            config,
        }
    }

    /// Run rounds for `identifier` until a terminal verdict or timeout.
    ///
    /// The deadline is checked before each round. By default a round that
    /// is already in flight when the deadline passes is allowed to finish
    /// and its outcomes are still voted on; with `hard_deadline` the round
    /// is aborted instead. Never fails: every path ends in a result.
    pub async fn perform_operation(&self, identifier: &str) -> OperationResult {
        let started = Instant::now();
        let deadline = started + self.config.deadline();

        // Worker pool for this run only. Dropping it on any return path
        // aborts whatever probe tasks are still running.
        let mut pool: JoinSet<(usize, ProbeOutcome)> = JoinSet::new();

        let mut retry_count = 0u32;
        let mut round = 0u32;
        let mut last_observed: Option<DateTime<Utc>> = None;

        tracing::info!(
            identifier,
            deadline_ms = self.config.deadline_ms,
            hard_deadline = self.config.hard_deadline,
            "Starting operation"
        );

        loop {
            if Instant::now() >= deadline {
                return self.timed_out(identifier, last_observed, retry_count, round);
            }

            round += 1;

            let outcomes = if self.config.hard_deadline {
                match tokio::time::timeout_at(deadline, self.run_round(&mut pool, identifier)).await
                {
                    Ok(outcomes) => outcomes,
                    Err(_) => {
                        pool.abort_all();
                        tracing::debug!(round, "Deadline reached mid-round, probes aborted");
                        return self.timed_out(identifier, last_observed, retry_count, round);
                    }
                }
            } else {
                self.run_round(&mut pool, identifier).await
            };

            let observed_at = Utc::now();
            last_observed = Some(observed_at);

            let verdict = decide(outcomes);
            tracing::debug!(
                round,
                probe_a = %outcomes[0],
                probe_b = %outcomes[1],
                %verdict,
                "Round complete"
            );

            match verdict {
                Verdict::TerminateSuccess => {
                    return self.finish(
                        identifier,
                        TerminationReason::AllSucceeded,
                        observed_at,
                        retry_count,
                        round,
                    );
                }
                Verdict::TerminateFailure => {
                    return self.finish(
                        identifier,
                        TerminationReason::ServiceFailed,
                        observed_at,
                        retry_count,
                        round,
                    );
                }
                Verdict::Retry => {
                    retry_count += 1;
                    tracing::debug!(
                        round,
                        retry_count,
                        pause_ms = self.config.retry_pause_ms,
                        "Retrying after pause"
                    );

                    let resume_at = Instant::now() + self.config.retry_pause();
                    if self.config.hard_deadline {
                        tokio::time::sleep_until(resume_at.min(deadline)).await;
                    } else {
                        tokio::time::sleep_until(resume_at).await;
                    }
                }
            }
        }
    }

    /// Dispatch both probes onto the pool and wait for both answers.
    ///
    /// A probe task that panics or is cancelled leaves its slot as `Failure`.
    async fn run_round(
        &self,
        pool: &mut JoinSet<(usize, ProbeOutcome)>,
        identifier: &str,
    ) -> [ProbeOutcome; 2] {
        for (slot, probe) in self.probes.iter().enumerate() {
            let probe = Arc::clone(probe);
            let identifier = identifier.to_string();
            pool.spawn(async move {
                let outcome = probe.check(&identifier).await;
                tracing::debug!(probe = %probe.name(), %outcome, "Probe answered");
                (slot, outcome)
            });
        }

        let mut outcomes = [ProbeOutcome::Failure; 2];
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok((slot, outcome)) => outcomes[slot] = outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Probe task did not return an outcome");
                }
            }
        }
        outcomes
    }

    fn timed_out(
        &self,
        identifier: &str,
        last_observed: Option<DateTime<Utc>>,
        retry_count: u32,
        rounds: u32,
    ) -> OperationResult {
        tracing::warn!(
            identifier,
            retry_count,
            deadline_ms = self.config.deadline_ms,
            "Operation timed out"
        );
        self.finish(
            identifier,
            TerminationReason::TimedOut,
            last_observed.unwrap_or_else(Utc::now),
            retry_count,
            rounds,
        )
    }

    fn finish(
        &self,
        identifier: &str,
        reason: TerminationReason,
        completed_at: DateTime<Utc>,
        retry_count: u32,
        rounds: u32,
    ) -> OperationResult {
        let result = OperationResult::new(identifier, reason, completed_at, retry_count);
        tracing::info!(
            identifier,
            status = %result.status,
            reason = ?reason,
            retry_count,
            rounds,
            "Operation finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ScriptedProbe;
    use crate::types::ApplicationStatus;
    use async_trait::async_trait;
    use std::time::Duration;
    use ProbeOutcome::*;

    fn engine_with(
        a: &Arc<ScriptedProbe>,
        b: &Arc<ScriptedProbe>,
        config: EngineConfig,
    ) -> PollEngine {
        PollEngine::new(a.clone(), b.clone(), config)
    }

    fn scripted(name: &str, script: Vec<ProbeOutcome>) -> Arc<ScriptedProbe> {
        Arc::new(ScriptedProbe::new(name, script))
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanimous_success_terminates_without_pause() {
        let a = scripted("a", vec![Success]);
        let b = scripted("b", vec![Success]);
        let engine = engine_with(&a, &b, EngineConfig::default());

        let start = Instant::now();
        let result = engine.perform_operation("example_id").await;

        assert_eq!(result.status, ApplicationStatus::Success);
        assert_eq!(result.reason, TerminationReason::AllSucceeded);
        assert_eq!(result.description, "Both services succeeded");
        assert_eq!(result.identifier, "example_id");
        assert_eq!(result.retry_count, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success() {
        let a = scripted("a", vec![RetryAfter, Success]);
        let b = scripted("b", vec![Success, Success]);
        let engine = engine_with(&a, &b, EngineConfig::default());

        let start = Instant::now();
        let result = engine.perform_operation("id").await;

        assert_eq!(result.status, ApplicationStatus::Success);
        assert_eq!(result.retry_count, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(a.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_outranks_failure() {
        let a = scripted("a", vec![Failure, Success]);
        let b = scripted("b", vec![RetryAfter, Success]);
        let engine = engine_with(&a, &b, EngineConfig::default());

        let result = engine.perform_operation("id").await;

        assert_eq!(result.reason, TerminationReason::AllSucceeded);
        assert_eq!(result.retry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_failure_terminates_immediately() {
        let a = scripted("a", vec![RetryAfter, Success]);
        let b = scripted("b", vec![RetryAfter, Failure]);
        let engine = engine_with(&a, &b, EngineConfig::default());

        let result = engine.perform_operation("id").await;

        assert_eq!(result.status, ApplicationStatus::Failure);
        assert_eq!(result.reason, TerminationReason::ServiceFailed);
        assert_eq!(result.description, "Both or one services failed");
        // Only the first round counted as a retry.
        assert_eq!(result.retry_count, 1);
        assert_eq!(a.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_failure() {
        let a = scripted("a", vec![Failure]);
        let b = scripted("b", vec![Failure]);
        let engine = engine_with(&a, &b, EngineConfig::default());

        let start = Instant::now();
        let result = engine.perform_operation("id").await;

        assert_eq!(result.reason, TerminationReason::ServiceFailed);
        assert_eq!(result.retry_count, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_perpetual_retry_times_out() {
        let a = scripted("a", vec![RetryAfter]);
        let b = scripted("b", vec![Success]);
        let engine = engine_with(&a, &b, EngineConfig::default());

        let start = Instant::now();
        let result = engine.perform_operation("id").await;

        assert_eq!(result.status, ApplicationStatus::Failure);
        assert_eq!(result.reason, TerminationReason::TimedOut);
        assert_eq!(result.description, "Operation timed out");
        // Rounds start at 0s, 1s, ..., 14s; the check at 15s stops the run.
        assert_eq!(result.retry_count, 15);
        assert_eq!(a.calls(), 15);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_deadline_issues_no_probes() {
        let a = scripted("a", vec![Success]);
        let b = scripted("b", vec![Success]);
        let config = EngineConfig {
            deadline_ms: 0,
            ..Default::default()
        };
        let engine = engine_with(&a, &b, config);

        let before = Utc::now();
        let result = engine.perform_operation("id").await;

        assert_eq!(result.reason, TerminationReason::TimedOut);
        assert_eq!(result.retry_count, 0);
        assert_eq!(a.calls(), 0);
        assert_eq!(b.calls(), 0);
        assert!(result.completed_at >= before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_run_concurrently() {
        let a = Arc::new(ScriptedProbe::constant("a", Success).with_latency(Duration::from_secs(2)));
        let b = Arc::new(ScriptedProbe::constant("b", Success).with_latency(Duration::from_secs(2)));
        let engine = engine_with(&a, &b, EngineConfig::default());

        let start = Instant::now();
        let result = engine.perform_operation("id").await;

        assert_eq!(result.status, ApplicationStatus::Success);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_both_probes() {
        // A fast failure must not decide the round before the slow retry arrives.
        let a = Arc::new(ScriptedProbe::new("a", vec![Failure, Success]));
        let b = Arc::new(
            ScriptedProbe::new("b", vec![RetryAfter, Success]).with_latency(Duration::from_secs(3)),
        );
        let engine = engine_with(&a, &b, EngineConfig::default());

        let start = Instant::now();
        let result = engine.perform_operation("id").await;

        assert_eq!(result.reason, TerminationReason::AllSucceeded);
        assert_eq!(result.retry_count, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_round_finishes_past_deadline() {
        let a = Arc::new(
            ScriptedProbe::new("a", vec![RetryAfter, Success]).with_latency(Duration::from_secs(10)),
        );
        let b = Arc::new(ScriptedProbe::constant("b", Success));
        let engine = engine_with(&a, &b, EngineConfig::default());

        let start = Instant::now();
        let result = engine.perform_operation("id").await;

        // Round 2 starts at 11s, before the deadline, and completes at 21s.
        assert_eq!(result.reason, TerminationReason::AllSucceeded);
        assert_eq!(result.retry_count, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_deadline_aborts_in_flight_round() {
        let a = Arc::new(
            ScriptedProbe::new("a", vec![RetryAfter, Success]).with_latency(Duration::from_secs(10)),
        );
        let b = Arc::new(ScriptedProbe::constant("b", Success));
        let config = EngineConfig {
            hard_deadline: true,
            ..Default::default()
        };
        let engine = engine_with(&a, &b, config);

        let start = Instant::now();
        let result = engine.perform_operation("id").await;

        assert_eq!(result.reason, TerminationReason::TimedOut);
        assert_eq!(result.retry_count, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_deadline_cuts_retry_pause() {
        let a = scripted("a", vec![RetryAfter]);
        let b = scripted("b", vec![RetryAfter]);
        let config = EngineConfig {
            deadline_ms: 2_500,
            retry_pause_ms: 1_000,
            hard_deadline: true,
        };
        let engine = engine_with(&a, &b, config);

        let start = Instant::now();
        let result = engine.perform_operation("id").await;

        assert_eq!(result.reason, TerminationReason::TimedOut);
        assert_eq!(result.retry_count, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(2_500));
    }

    struct PanickingProbe;

    #[async_trait]
    impl StatusProbe for PanickingProbe {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn check(&self, _identifier: &str) -> ProbeOutcome {
            panic!("status service exploded");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_probe_counts_as_failure() {
        let b = Arc::new(ScriptedProbe::constant("b", Success));
        let engine = PollEngine::new(Arc::new(PanickingProbe), b, EngineConfig::default());

        let result = engine.perform_operation("id").await;

        assert_eq!(result.reason, TerminationReason::ServiceFailed);
        assert_eq!(result.retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_at_not_before_start() {
        let a = scripted("a", vec![RetryAfter, RetryAfter, Success]);
        let b = scripted("b", vec![Success]);
        let engine = engine_with(&a, &b, EngineConfig::default());

        let before = Utc::now();
        let result = engine.perform_operation("id").await;

        assert_eq!(result.retry_count, 2);
        assert!(result.completed_at >= before);
        assert!(result.completed_at <= Utc::now());
    }

    #[tokio::test]
    async fn test_timeout_reports_last_observation_time() {
        let a = scripted("a", vec![RetryAfter]);
        let b = scripted("b", vec![RetryAfter]);
        let config = EngineConfig {
            deadline_ms: 50,
            retry_pause_ms: 20,
            hard_deadline: false,
        };
        let pause = chrono::Duration::milliseconds(20);
        let engine = engine_with(&a, &b, config);

        let before = Utc::now();
        let result = engine.perform_operation("id").await;
        let returned_at = Utc::now();

        assert_eq!(result.reason, TerminationReason::TimedOut);
        assert!(result.retry_count >= 1);
        assert_eq!(a.calls() as u32, result.retry_count);
        // Stamped when the last round was observed, one full pause before
        // the deadline check that ended the run.
        assert!(result.completed_at >= before);
        assert!(result.completed_at <= returned_at - pause);
    }
}
