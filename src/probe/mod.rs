pub mod random;
pub mod scripted;
pub mod timeout;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProbeConfig;
use crate::types::ProbeOutcome;

pub use random::RandomProbe;
pub use scripted::ScriptedProbe;
pub use timeout::TimeoutProbe;

/// A status-check service queried once per round.
///
/// There is no error channel: an implementation maps transport problems to
/// `Failure` or `RetryAfter` itself, and should bound its own latency.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self, identifier: &str) -> ProbeOutcome;
}

/// Build the two simulated services used by the binary.
///
/// Both draw from explicitly seeded generators when a seed is configured;
/// the second probe is seeded with `seed + 1` so the two streams differ.
pub fn simulated_pair(config: &ProbeConfig) -> (Arc<dyn StatusProbe>, Arc<dyn StatusProbe>) {
    let probe_a = RandomProbe::new("status-a", config.seed, config.max_latency());
    let probe_b = RandomProbe::new(
        "status-b",
        config.seed.map(|s| s.wrapping_add(1)),
        config.max_latency(),
    );

    match config.timeout() {
        Some(limit) => (
            Arc::new(TimeoutProbe::new(probe_a, limit)),
            Arc::new(TimeoutProbe::new(probe_b, limit)),
        ),
        None => (Arc::new(probe_a), Arc::new(probe_b)),
    }
}
