/*!
 * Provider-specific concurrency tuning.
 *
 * The number of simultaneous backend calls is a backpressure control: it is
 * sized to stay under the provider's rate limits, not to maximize throughput.
 * `RequestPacer` additionally spaces request starts for per-minute quotas.
 */

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::app_config::{MAX_CONCURRENT_REQUESTS, TranslationProvider};

/// Provider-specific concurrency profile with tuned defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
}

impl ProviderProfile {
    /// Get the profile for a given provider
    pub fn for_provider(provider: TranslationProvider) -> Self {
        match provider {
            // Free tier quota is per minute; a few in flight keeps bursts small
            TranslationProvider::Gemini => Self { max_concurrent_requests: 3 },
            // A local model serializes work anyway
            TranslationProvider::Ollama => Self { max_concurrent_requests: 2 },
        }
    }

    /// Get effective concurrent requests, respecting any user override.
    ///
    /// The result always lies in `1..=MAX_CONCURRENT_REQUESTS`.
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override
            .unwrap_or(self.max_concurrent_requests)
            .clamp(1, MAX_CONCURRENT_REQUESTS)
    }
}

/// Spaces request starts at least `interval` apart across all tasks
#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Pacer for a requests-per-minute budget; `None` for a zero budget
    pub fn per_minute(rpm: u32) -> Option<Self> {
        (rpm > 0).then(|| Self::new(Duration::from_millis(60_000 / u64::from(rpm))))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until this caller may start a request
    pub async fn wait(&self) {
        let start_at = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start_at = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(start_at + self.interval);
            start_at
        };
        tokio::time::sleep_until(start_at).await;
    }
}
