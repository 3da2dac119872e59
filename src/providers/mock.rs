/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock backend that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with a tagged translation
 * - `MockProvider::failing()` - Always fails with a server error
 * - `MockProvider::rate_limited()` - Always fails with a quota error
 * - `MockProvider::fail_on()` - Fails only for chunks containing a needle
 * - `MockProvider::random_latency()` - Succeeds after a random delay
 *
 * Clones share their counters, so a test can hand one clone to the
 * orchestrator and inspect another.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{Provider, TranslationRequest};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Always fails with a server error
    Failing,
    /// Always fails with a quota error
    RateLimited { retry_after_secs: Option<u64> },
    /// Rejects the first `failures` calls with a quota error, then succeeds
    RateLimitedThenWorking { failures: usize },
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Fails requests whose text contains the needle
    FailOn { needle: String },
    /// Succeeds after a fixed delay
    Slow { delay_ms: u64 },
    /// Succeeds after a random delay in `0..=max_ms`
    RandomLatency { max_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Total number of `complete` calls
    request_count: Arc<AtomicUsize>,
    /// Calls per exact request text
    calls_by_text: Arc<Mutex<HashMap<String, usize>>>,
    /// Calls currently running
    in_flight: Arc<AtomicUsize>,
    /// Highest number of simultaneous calls observed
    max_in_flight: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls_by_text: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that always reports an exhausted quota
    pub fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        Self::new(MockBehavior::RateLimited { retry_after_secs })
    }

    /// Create a mock that fails only for texts containing `needle`
    pub fn fail_on(needle: impl Into<String>) -> Self {
        Self::new(MockBehavior::FailOn { needle: needle.into() })
    }

    /// Create a mock with random per-call latency
    pub fn random_latency(max_ms: u64) -> Self {
        Self::new(MockBehavior::RandomLatency { max_ms })
    }

    /// Create a slow mock
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// The translation the working behaviors produce for `text`
    pub fn expected_translation(text: &str) -> String {
        format!("[VI] {}", text.trim_end())
    }

    /// Total number of calls made
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Number of calls made with exactly this text
    pub fn calls_for(&self, text: &str) -> usize {
        self.calls_by_text.lock().get(text).copied().unwrap_or(0)
    }

    /// Highest number of simultaneous calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Calls running right now
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn respond(&self, request: &TranslationRequest, count: usize) -> Result<String, ProviderError> {
        match &self.behavior {
            MockBehavior::Working => Ok(Self::expected_translation(&request.text)),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::RateLimited { retry_after_secs } => Err(ProviderError::RateLimitExceeded {
                message: "Simulated quota exhaustion".to_string(),
                retry_after_secs: *retry_after_secs,
            }),

            MockBehavior::RateLimitedThenWorking { failures } => {
                if count < *failures {
                    Err(ProviderError::RateLimitExceeded {
                        message: format!("Simulated quota exhaustion (request #{})", count + 1),
                        retry_after_secs: None,
                    })
                } else {
                    Ok(Self::expected_translation(&request.text))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::expected_translation(&request.text))
                }
            }

            MockBehavior::FailOn { needle } => {
                if request.text.contains(needle.as_str()) {
                    Err(ProviderError::ConnectionError(format!("Simulated failure on '{}'", needle)))
                } else {
                    Ok(Self::expected_translation(&request.text))
                }
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(Self::expected_translation(&request.text))
            }

            MockBehavior::RandomLatency { max_ms } => {
                let delay = rand::rng().random_range(0..=*max_ms);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(Self::expected_translation(&request.text))
            }
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        *self.calls_by_text.lock().entry(request.text.clone()).or_insert(0) += 1;

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        // Released on completion and when a timeout drops this future
        let _slot = InFlightSlot(&self.in_flight);

        self.respond(request, count).await
    }
}

/// Decrements the in-flight counter when dropped
struct InFlightSlot<'a>(&'a AtomicUsize);

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
