/*!
 * Chunked translation orchestration.
 *
 * `TranslationOrchestrator` splits a text with the `Chunker`, sends each
 * chunk to the injected `Provider` and reassembles the results in chunk
 * order. Along the way it:
 *
 * - skips chunks too short to be worth a backend call,
 * - reuses cached translations and stores fresh ones,
 * - caps simultaneous backend calls with a semaphore,
 * - bounds every call with a timeout,
 * - turns per-chunk failures into typed outcomes instead of aborting.
 *
 * Results are scattered into a preallocated, index-addressed vector, so
 * completion order never affects output order.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::app_config::{Config, DispatchMode};
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{Provider, TranslationRequest};

use super::cache::{CacheKey, TranslationCache};
use super::chunker::{Chunk, ChunkPolicy, Chunker};
use super::concurrency::{ProviderProfile, RequestPacer};
use super::outcome::{ChunkFailure, ChunkOutcome, FailureKind, TranslationOutcome};

/// How chunks are handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// One chunk at a time, in index order
    Sequential,
    /// Up to `max_in_flight` backend calls at once
    Concurrent { max_in_flight: usize },
}

impl Dispatch {
    fn width(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Concurrent { max_in_flight } => (*max_in_flight).max(1),
        }
    }
}

/// Automatic retry for rate-limited and timed-out chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first; 0 disables retrying
    pub max_retries: u32,
    /// First backoff, doubled on every further attempt
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32, failure: &ChunkFailure) -> Duration {
        if let FailureKind::RateLimited { retry_after: Some(wait) } = failure.kind {
            return wait;
        }
        let backoff = self.base_backoff.saturating_mul(2u32.saturating_pow(attempt));
        let jitter_ms = (backoff.as_millis() as u64 / 4).max(1);
        backoff + Duration::from_millis(rand::rng().random_range(0..jitter_ms))
    }
}

/// Knobs for one orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Character budget per chunk
    pub max_chunk_chars: usize,
    /// Chunk splitting policy
    pub policy: ChunkPolicy,
    /// Chunks with fewer trimmed characters are skipped
    pub min_translatable_chars: usize,
    pub dispatch: Dispatch,
    /// Deadline for a single backend call
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Optional per-minute request budget
    pub requests_per_minute: Option<u32>,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Prompt template with `{source_language}` / `{target_language}` placeholders
    pub system_prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        let config = Config::default();
        Self::from_config(&config)
    }
}

impl OrchestratorOptions {
    /// Derive orchestrator options from the application configuration
    pub fn from_config(config: &Config) -> Self {
        let common = &config.translation.common;
        let profile = ProviderProfile::for_provider(config.translation.provider);

        let dispatch = match config.dispatch.mode {
            DispatchMode::Sequential => Dispatch::Sequential,
            DispatchMode::Concurrent => Dispatch::Concurrent {
                max_in_flight: profile.effective_concurrent_requests(config.dispatch.concurrent_requests),
            },
        };

        let request_timeout = config
            .dispatch
            .chunk_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.translation.get_timeout());

        Self {
            max_chunk_chars: config.chunking.max_chars,
            policy: config.chunking.policy,
            min_translatable_chars: config.chunking.min_translatable_chars,
            dispatch,
            request_timeout,
            retry: RetryPolicy {
                max_retries: common.retry_count,
                base_backoff: Duration::from_millis(common.retry_backoff_ms),
            },
            requests_per_minute: config.dispatch.requests_per_minute,
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            system_prompt: common.system_prompt.clone(),
            temperature: common.temperature,
            max_output_tokens: common.max_output_tokens,
            top_p: common.top_p,
        }
    }
}

/// Splits, dispatches and reassembles translations
#[derive(Debug)]
pub struct TranslationOrchestrator {
    provider: Arc<dyn Provider>,
    cache: TranslationCache,
    chunker: Chunker,
    options: OrchestratorOptions,
    /// Hard cap on simultaneous backend calls across all requests
    permits: Arc<Semaphore>,
    pacer: Option<RequestPacer>,
    /// System prompt with language names filled in
    system_prompt: String,
}

impl TranslationOrchestrator {
    pub fn new(provider: Arc<dyn Provider>, cache: TranslationCache, options: OrchestratorOptions) -> Self {
        let chunker = Chunker::new(options.max_chunk_chars, options.policy);
        let permits = Arc::new(Semaphore::new(options.dispatch.width()));
        let pacer = options.requests_per_minute.and_then(RequestPacer::per_minute);

        let source_name = language_name(&options.source_language);
        let target_name = language_name(&options.target_language);
        let system_prompt = options
            .system_prompt
            .replace("{source_language}", &source_name)
            .replace("{target_language}", &target_name);

        Self {
            provider,
            cache,
            chunker,
            options,
            permits,
            pacer,
            system_prompt,
        }
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Check the backend answers a trivial request
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }

    /// Chunks `text` would be split into
    pub fn chunks(&self, text: &str) -> Vec<Chunk> {
        self.chunker.chunk(text)
    }

    /// Translate `text` and render the result, error markers included
    pub async fn translate_text(&self, text: &str) -> String {
        self.translate_all(text).await.render()
    }

    /// Translate every chunk of `text`; never fails as a whole
    pub async fn translate_all(&self, text: &str) -> TranslationOutcome {
        self.translate_all_with_progress(text, |_, _| {}).await
    }

    /// Like [`translate_all`](Self::translate_all), reporting `(finished, total)` after each chunk
    pub async fn translate_all_with_progress<F>(&self, text: &str, progress: F) -> TranslationOutcome
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let started = Instant::now();
        let chunks = self.chunker.chunk(text);
        let total = chunks.len();
        if total == 0 {
            return TranslationOutcome::new(Vec::new(), 0);
        }

        debug!(
            "Translating {} chunk(s) with {} ({:?})",
            total,
            self.provider.name(),
            self.options.dispatch
        );

        let backend_calls = AtomicUsize::new(0);
        let mut results: Vec<Option<ChunkOutcome>> = vec![None; total];
        let mut finished = 0;

        match self.options.dispatch {
            Dispatch::Sequential => {
                for chunk in &chunks {
                    let outcome = self.process_chunk(chunk, &backend_calls).await;
                    results[chunk.index] = Some(outcome);
                    finished += 1;
                    progress(finished, total);
                }
            }
            Dispatch::Concurrent { .. } => {
                let calls = &backend_calls;
                let chunks = &chunks;
                // Map over positions so the stage closure borrows nothing from its argument
                let mut completed = stream::iter(0..total)
                    .map(move |position| {
                        let chunk = &chunks[position];
                        async move { (chunk.index, self.process_chunk(chunk, calls).await) }
                    })
                    .buffer_unordered(self.options.dispatch.width());

                while let Some((index, outcome)) = completed.next().await {
                    results[index] = Some(outcome);
                    finished += 1;
                    progress(finished, total);
                }
            }
        }

        let segments: Vec<ChunkOutcome> = results
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|| {
                    ChunkOutcome::Failed(ChunkFailure {
                        index,
                        kind: FailureKind::Backend,
                        message: "Chunk was never dispatched".to_string(),
                    })
                })
            })
            .collect();

        let outcome = TranslationOutcome::new(segments, backend_calls.load(Ordering::SeqCst));
        let stats = outcome.stats();
        info!(
            "Translated {} chunk(s) in {:.1}s: {} backend call(s), {} cached, {} skipped, {} failed",
            stats.chunks,
            started.elapsed().as_secs_f64(),
            stats.backend_calls,
            stats.cache_hits,
            stats.skipped,
            stats.failed
        );
        outcome
    }

    async fn process_chunk(&self, chunk: &Chunk, calls: &AtomicUsize) -> ChunkOutcome {
        if chunk.trimmed_len() < self.options.min_translatable_chars {
            debug!("Skipping segment {} ({} chars)", chunk.index + 1, chunk.trimmed_len());
            return ChunkOutcome::Skipped;
        }

        if !self.cache.is_enabled() {
            return match self.translate_chunk(chunk, calls).await {
                Ok(text) => ChunkOutcome::Translated { text, from_cache: false },
                Err(failure) => ChunkOutcome::Failed(failure),
            };
        }

        let key = CacheKey::new(&chunk.text, &self.options.source_language, &self.options.target_language);
        // Held until the fresh translation is stored, so duplicates wait for it
        let _guard = self.cache.lock_key(&key).await;

        if let Some(text) = self.cache.get(&key) {
            return ChunkOutcome::Translated { text, from_cache: true };
        }

        match self.translate_chunk(chunk, calls).await {
            Ok(text) => {
                self.cache.store(&key, &text);
                ChunkOutcome::Translated { text, from_cache: false }
            }
            Err(failure) => ChunkOutcome::Failed(failure),
        }
    }

    async fn translate_chunk(&self, chunk: &Chunk, calls: &AtomicUsize) -> Result<String, ChunkFailure> {
        let request = TranslationRequest {
            text: chunk.text.clone(),
            system_prompt: self.system_prompt.clone(),
            temperature: self.options.temperature,
            max_output_tokens: self.options.max_output_tokens,
            top_p: self.options.top_p,
        };

        let mut attempt = 0;
        loop {
            let failure = match self.call_backend(&request, chunk.index, calls).await {
                Ok(text) => return Ok(text),
                Err(failure) => failure,
            };

            if failure.is_retryable() && attempt < self.options.retry.max_retries {
                let delay = self.options.retry.delay_for(attempt, &failure);
                warn!(
                    "Segment {} failed ({}), retry {}/{} in {:?}",
                    chunk.index + 1,
                    failure.message,
                    attempt + 1,
                    self.options.retry.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            warn!("Segment {} failed: {}", chunk.index + 1, failure.message);
            return Err(failure);
        }
    }

    async fn call_backend(
        &self,
        request: &TranslationRequest,
        index: usize,
        calls: &AtomicUsize,
    ) -> Result<String, ChunkFailure> {
        // The semaphore is never closed, so acquire only fails if it were
        let _permit = self.permits.acquire().await.ok();

        if let Some(pacer) = &self.pacer {
            pacer.wait().await;
        }

        calls.fetch_add(1, Ordering::SeqCst);
        let timeout = self.options.request_timeout;
        match tokio::time::timeout(timeout, self.provider.complete(request)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(error)) => Err(ChunkFailure::from_provider_error(index, &error)),
            Err(_) => Err(ChunkFailure::timeout(index, timeout)),
        }
    }
}

fn language_name(code: &str) -> String {
    language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string())
}
