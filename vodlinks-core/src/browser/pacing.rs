use std::time::Duration;

use rand::rngs::ThreadRng;
use rand::{thread_rng, Rng};
use tokio::time::sleep;

use crate::config::TimingSection;

/// Fixed and jittered sleeps used between browser interactions.
#[derive(Debug)]
pub struct Pacing {
    config: TimingSection,
    rng: ThreadRng,
}

impl Pacing {
    pub fn new(config: TimingSection) -> Self {
        Self {
            config,
            rng: thread_rng(),
        }
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_millis(self.config.listing_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.config.element_timeout_ms)
    }

    /// Lets asynchronously rendered content catch up after a click.
    pub async fn settle(&mut self) -> u64 {
        let bounds = self.config.settle_ms;
        self.pause(bounds).await
    }

    pub async fn keystroke_pause(&mut self) -> u64 {
        let bounds = self.config.keystroke_pause_ms;
        self.pause(bounds).await
    }

    pub async fn poll_interval(&mut self) -> u64 {
        let ms = self.config.poll_interval_ms;
        self.pause([ms, ms]).await
    }

    pub async fn login_retry_delay(&mut self) -> u64 {
        let ms = self.config.login_retry_delay_ms;
        self.pause([ms, ms]).await
    }

    pub async fn item_delay(&mut self) -> u64 {
        let bounds = self.config.item_delay_ms;
        self.pause(bounds).await
    }

    async fn pause(&mut self, bounds: [u64; 2]) -> u64 {
        let ms = self.random_millis(bounds);
        if ms > 0 {
            sleep(Duration::from_millis(ms)).await;
        }
        ms
    }

    fn random_millis(&mut self, bounds: [u64; 2]) -> u64 {
        let lower = bounds[0].min(bounds[1]);
        let upper = bounds[0].max(bounds[1]);
        if lower == upper {
            lower
        } else {
            self.rng.gen_range(lower..=upper)
        }
    }
}
