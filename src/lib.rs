/*!
 * # yakusu - sentence-level translation through a local LM Studio server
 *
 * A Rust library for translating text between English and Japanese with an
 * OpenAI-compatible chat-completions endpoint.
 *
 * ## Features
 *
 * - Sentence segmentation with stable segment ids
 * - Batched requests joined by a private delimiter, split back 1:1
 * - Bounded concurrency with exponential backoff retries
 * - Size-bounded translation cache with TTL, in memory or in SQLite
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: The translation pipeline:
 *   - `translation::segmenter`: Text normalization and segmentation
 *   - `translation::request`: Request model and payload codec
 *   - `translation::batch`: Windowed batch processing
 *   - `translation::cache`: Translation cache backends
 *   - `translation::core`: The translation service
 * - `providers`: LM Studio client and transports
 * - `database`: SQLite connection and schema for the persistent cache
 * - `language_utils`: Supported languages and ISO code handling
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, CacheError, ClientError, ClientErrorKind, RequestError, TranslationError};
pub use language_utils::{Language, language_codes_match};
pub use providers::LmStudio;
pub use translation::{LanguagePair, TranslationResult, TranslationService};
