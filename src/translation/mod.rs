/*!
 * Chunked translation pipeline.
 *
 * - `chunker`: deterministic, order-preserving text splitting
 * - `cache`: content-addressed translation memo with per-key locking
 * - `concurrency`: provider concurrency profiles and request pacing
 * - `outcome`: typed per-chunk results and final assembly
 * - `orchestrator`: dispatch of chunks to a backend and reassembly
 */

pub mod cache;
pub mod chunker;
pub mod concurrency;
pub mod orchestrator;
pub mod outcome;

// Re-export main types for easier usage
pub use self::cache::{CacheKey, CachePolicy, CacheStats, Fingerprint, TranslationCache};
pub use self::chunker::{Chunk, ChunkPolicy, Chunker};
pub use self::concurrency::{ProviderProfile, RequestPacer};
pub use self::orchestrator::{Dispatch, OrchestratorOptions, RetryPolicy, TranslationOrchestrator};
pub use self::outcome::{
    ChunkFailure, ChunkOutcome, ERROR_MARKER_PREFIX, FailureKind, OutcomeStats, TranslationOutcome,
};
