//! Politeness delay between page requests
//!
//! Requests are issued one at a time; before each page render the throttle
//! sleeps for a random whole number of seconds in `1..=max`.

use rand::Rng;
use std::time::Duration;

/// Randomized sleep before each page render
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    max_secs: u64,
}

impl Throttle {
    /// Creates a throttle; `max_secs == 0` disables it
    pub fn new(max_secs: u64) -> Self {
        Self { max_secs }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_secs > 0
    }

    /// Picks the next delay, or None when disabled
    pub fn next_delay(&self) -> Option<Duration> {
        if !self.is_enabled() {
            return None;
        }
        let secs = rand::thread_rng().gen_range(1..=self.max_secs);
        Some(Duration::from_secs(secs))
    }

    /// Sleeps for the next delay
    pub async fn pause(&self) {
        if let Some(delay) = self.next_delay() {
            tracing::debug!("Sleeping {:?} before next request", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_throttle() {
        let throttle = Throttle::new(0);
        assert!(!throttle.is_enabled());
        assert_eq!(throttle.next_delay(), None);
    }

    #[test]
    fn test_delay_within_bounds() {
        let throttle = Throttle::new(3);
        for _ in 0..100 {
            let delay = throttle.next_delay().unwrap();
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(3));
        }
    }

    #[tokio::test]
    async fn test_pause_sleeps() {
        let throttle = Throttle::new(1);
        let start = std::time::Instant::now();
        throttle.pause().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
