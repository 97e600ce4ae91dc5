use crate::application_port::Pacer;
use anyhow::{anyhow, ensure};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Fixed-interval scheduler: consecutive turns are at least `interval` apart.
#[derive(Debug)]
pub struct IntervalPacer {
    interval: Duration,
    next_turn: Mutex<Option<Instant>>,
}

impl IntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_turn: Mutex::new(None),
        }
    }

    pub fn per_second(rate_limit: f64) -> anyhow::Result<Self> {
        ensure!(
            rate_limit.is_finite() && rate_limit > 0.0,
            "rate limit must be a positive number, got {rate_limit}"
        );
        let interval = Duration::try_from_secs_f64(1.0 / rate_limit)
            .map_err(|e| anyhow!("rate limit {rate_limit} is out of range: {e}"))?;
        Ok(Self::new(interval))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait::async_trait]
impl Pacer for IntervalPacer {
    async fn wait_turn(&self) {
        let mut next_turn = self.next_turn.lock().await;
        if let Some(at) = *next_turn {
            tokio::time::sleep_until(at).await;
        }
        *next_turn = Some(Instant::now() + self.interval);
    }
}
