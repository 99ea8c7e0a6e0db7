use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::probe::StatusProbe;
use crate::types::ProbeOutcome;

/// Deterministic probe that replays a fixed sequence of outcomes.
///
/// Call `n` returns `script[n]`; once the script is exhausted the last
/// outcome repeats. An empty script always answers `Failure`.
pub struct ScriptedProbe {
    name: String,
    script: Vec<ProbeOutcome>,
    latency: Duration,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(name: &str, script: Vec<ProbeOutcome>) -> Self {
        Self {
            name: name.to_string(),
            script,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer `outcome`.
    pub fn constant(name: &str, outcome: ProbeOutcome) -> Self {
        Self::new(name, vec![outcome])
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProbe for ScriptedProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, _identifier: &str) -> ProbeOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.script
            .get(call)
            .or_else(|| self.script.last())
            .copied()
            .unwrap_or(ProbeOutcome::Failure)
    }
}
