use std::time::Duration;

use async_trait::async_trait;

use crate::probe::StatusProbe;
use crate::types::ProbeOutcome;

/// Bounds the latency of another probe; a call that runs past the limit
/// is reported as `Failure`.
pub struct TimeoutProbe<P> {
    inner: P,
    limit: Duration,
}

impl<P: StatusProbe> TimeoutProbe<P> {
    pub fn new(inner: P, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<P: StatusProbe> StatusProbe for TimeoutProbe<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn check(&self, identifier: &str) -> ProbeOutcome {
        match tokio::time::timeout(self.limit, self.inner.check(identifier)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    probe = %self.inner.name(),
                    identifier,
                    limit_ms = self.limit.as_millis() as u64,
                    "Status check timed out"
                );
                ProbeOutcome::Failure
            }
        }
    }
}
