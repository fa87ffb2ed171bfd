/*!
 * Translation pipeline for LM Studio backed text translation.
 *
 * It is split into several submodules:
 *
 * - `segmenter`: Normalization and sentence segmentation
 * - `request`: Request, parameter and result model plus the wire payload codec
 * - `concurrency`: Concurrency gate and retry policy
 * - `batch`: Windowed processing of large inputs
 * - `cache`: Size-bounded translation cache (memory and SQLite)
 * - `core`: The service tying everything together
 */

// Re-export main types for easier usage
pub use self::batch::BatchTranslator;
pub use self::cache::{CacheEntry, CacheRepository, CacheStats, MemoryCacheRepository, SqliteCacheRepository};
pub use self::concurrency::{ConcurrencyLimiter, RetryPolicy};
pub use self::core::TranslationService;
pub use self::request::{
    LanguagePair, ParamOverrides, TranslatedItem, TranslationParams, TranslationRequest,
    TranslationResult, create_request,
};
pub use self::segmenter::{Segmenter, TextSegment};

// Submodules
pub mod batch;
pub mod cache;
pub mod concurrency;
pub mod core;
pub mod request;
pub mod segmenter;
