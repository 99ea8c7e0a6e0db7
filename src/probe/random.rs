use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::probe::StatusProbe;
use crate::types::ProbeOutcome;

/// Simulated service that answers with a uniformly random outcome.
pub struct RandomProbe {
    name: String,
    rng: Mutex<StdRng>,
    max_latency: Duration,
}

impl RandomProbe {
    /// Without a seed the generator is seeded from OS entropy.
    pub fn new(name: &str, seed: Option<u64>, max_latency: Duration) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            name: name.to_string(),
            rng: Mutex::new(rng),
            max_latency,
        }
    }

    fn draw(&self) -> (ProbeOutcome, Duration) {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let outcome = ProbeOutcome::ALL[rng.gen_range(0..ProbeOutcome::ALL.len())];
        let max_ms = self.max_latency.as_millis() as u64;
        let latency = if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.gen_range(0..=max_ms))
        };
        (outcome, latency)
    }
}

#[async_trait]
impl StatusProbe for RandomProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, identifier: &str) -> ProbeOutcome {
        let (outcome, latency) = self.draw();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        tracing::trace!(probe = %self.name, identifier, %outcome, "Simulated status");
        outcome
    }
}
