/*!
 * # vitranslate
 *
 * A Rust library for translating long English texts into Vietnamese with
 * AI backends, one chunk at a time.
 *
 * ## Features
 *
 * - Paragraph- or word-based chunking under a character budget
 * - Gemini (hosted) and Ollama (local) backends behind one `Provider` trait
 * - Sequential or bounded concurrent dispatch with ordered reassembly
 * - Content-addressed caching so repeated chunks are translated once
 * - Per-chunk failure isolation with inline error markers
 * - Images and PDFs read through the provider before translation
 * - ISO 639-1 and ISO 639-3 language code support
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `translation`: The chunked translation pipeline:
 *   - `translation::chunker`: Text splitting
 *   - `translation::cache`: Translation memo
 *   - `translation::orchestrator`: Dispatch and reassembly
 *   - `translation::outcome`: Per-chunk results
 *   - `translation::concurrency`: Provider concurrency profiles
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Backend clients (Gemini, Ollama, mock)
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use errors::{AppError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match};
pub use providers::{Provider, TranslationRequest};
pub use translation::{ChunkPolicy, Chunker, TranslationCache, TranslationOrchestrator, TranslationOutcome};
