/*!
 * Per-chunk translation results and final assembly.
 *
 * Every chunk ends in exactly one `ChunkOutcome`. Failures stay typed until
 * `TranslationOutcome::render`, which turns them into inline error markers,
 * so callers can still inspect why a segment failed (e.g. to retry quota
 * failures after a cooldown).
 */

use std::fmt;
use std::time::Duration;

use crate::errors::ProviderError;

/// Every rendered error marker starts with this text
pub const ERROR_MARKER_PREFIX: &str = "[translation failed";

/// Why a chunk could not be translated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Quota or rate-limit rejection; retry after a cooldown
    RateLimited { retry_after: Option<Duration> },
    /// The per-chunk deadline passed
    Timeout { after: Duration },
    /// Any other backend or transport failure
    Backend,
}

/// A failed chunk with the underlying error description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl ChunkFailure {
    /// Classify a provider error for chunk `index`
    pub fn from_provider_error(index: usize, error: &ProviderError) -> Self {
        let kind = match error {
            ProviderError::Timeout(after) => FailureKind::Timeout { after: *after },
            e if e.is_rate_limit() => FailureKind::RateLimited {
                retry_after: e.retry_after(),
            },
            _ => FailureKind::Backend,
        };

        Self {
            index,
            kind,
            message: error.to_string(),
        }
    }

    pub fn timeout(index: usize, after: Duration) -> Self {
        Self {
            index,
            kind: FailureKind::Timeout { after },
            message: format!("No response within {}s", after.as_secs()),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, FailureKind::RateLimited { .. })
    }

    /// Whether an automatic or caller retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::RateLimited { .. } | FailureKind::Timeout { .. })
    }

    /// Human-readable marker placed in the assembled text
    pub fn marker(&self) -> String {
        let segment = self.index + 1;
        match &self.kind {
            FailureKind::RateLimited { retry_after: Some(wait) } => format!(
                "{}: quota exceeded (segment {}), retry after {}s] {}",
                ERROR_MARKER_PREFIX,
                segment,
                wait.as_secs(),
                self.message
            ),
            FailureKind::RateLimited { retry_after: None } => format!(
                "{}: quota exceeded (segment {}), wait and retry] {}",
                ERROR_MARKER_PREFIX, segment, self.message
            ),
            FailureKind::Timeout { after } => format!(
                "{}: timed out after {}s (segment {})]",
                ERROR_MARKER_PREFIX,
                after.as_secs(),
                segment
            ),
            FailureKind::Backend => format!(
                "{} (segment {})] {}",
                ERROR_MARKER_PREFIX, segment, self.message
            ),
        }
    }
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marker())
    }
}

/// Result for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Backend or cache produced a translation
    Translated { text: String, from_cache: bool },
    /// Too short to be worth a backend call
    Skipped,
    /// Backend call failed
    Failed(ChunkFailure),
}

impl ChunkOutcome {
    /// Text contributed to the assembled translation
    pub fn rendered(&self) -> String {
        match self {
            Self::Translated { text, .. } => text.clone(),
            Self::Skipped => String::new(),
            Self::Failed(failure) => failure.marker(),
        }
    }
}

/// Counters for one `translate_all` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeStats {
    pub chunks: usize,
    pub backend_calls: usize,
    pub cache_hits: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// All chunk results of one request, in chunk index order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    segments: Vec<ChunkOutcome>,
    backend_calls: usize,
}

impl TranslationOutcome {
    pub fn new(segments: Vec<ChunkOutcome>, backend_calls: usize) -> Self {
        Self { segments, backend_calls }
    }

    pub fn segments(&self) -> &[ChunkOutcome] {
        &self.segments
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChunkFailure> {
        self.segments.iter().filter_map(|segment| match segment {
            ChunkOutcome::Failed(failure) => Some(failure),
            _ => None,
        })
    }

    pub fn has_rate_limit_failure(&self) -> bool {
        self.failures().any(ChunkFailure::is_rate_limited)
    }

    /// True when no chunk failed
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn stats(&self) -> OutcomeStats {
        let mut stats = OutcomeStats {
            chunks: self.segments.len(),
            backend_calls: self.backend_calls,
            ..OutcomeStats::default()
        };
        for segment in &self.segments {
            match segment {
                ChunkOutcome::Translated { from_cache: true, .. } => stats.cache_hits += 1,
                ChunkOutcome::Translated { .. } => {}
                ChunkOutcome::Skipped => stats.skipped += 1,
                ChunkOutcome::Failed(_) => stats.failed += 1,
            }
        }
        stats
    }

    /// Join all segments in index order with a single newline
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(ChunkOutcome::rendered)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for TranslationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
