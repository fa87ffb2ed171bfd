/*!
 * Core translation service implementation.
 *
 * `TranslationService` ties the pieces together: segment the input, build a
 * validated request, answer what it can from the cache, send the rest to
 * LM Studio in windows, write new translations back and return a result
 * aligned 1:1 with the request.
 */

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::errors::{RequestError, TranslationError};
use crate::providers::LmStudio;

use super::batch::BatchTranslator;
use super::cache::{
    CacheEntry, CacheRepository, CacheStats, SystemClock, build_cache_key,
    create_cache_repository,
};
use super::request::{
    LanguagePair, ParamOverrides, TranslationParams, TranslationResult, build_result,
    create_request,
};
use super::segmenter::{Segmenter, TextSegment, is_valid_selection};

/// Translation service
#[derive(Clone)]
pub struct TranslationService {
    /// Windowed client
    batch: BatchTranslator,

    /// Cache backend
    cache: Arc<dyn CacheRepository>,

    /// Parameters applied to every request
    params: TranslationParams,

    segmenter: Segmenter,
}

impl std::fmt::Debug for TranslationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationService")
            .field("batch", &self.batch)
            .field("cache", &self.cache.backend_name())
            .field("params", &self.params)
            .finish()
    }
}

impl TranslationService {
    /// Create a new translation service
    pub fn new(
        client: LmStudio,
        cache: Arc<dyn CacheRepository>,
        params: TranslationParams,
        window_size: usize,
    ) -> Self {
        Self {
            batch: BatchTranslator::new(client, window_size),
            cache,
            params,
            segmenter: Segmenter::new(),
        }
    }

    /// Build the HTTP client and cache described by `config`
    pub fn from_config(config: &Config) -> Result<Self, TranslationError> {
        let client = LmStudio::from_config(&config.client)?;
        let cache = create_cache_repository(&config.cache, Arc::new(SystemClock))?;
        Ok(Self::new(
            client,
            cache,
            config.client.params(),
            config.batch.window_size,
        ))
    }

    pub fn params(&self) -> &TranslationParams {
        &self.params
    }

    pub fn cache(&self) -> &Arc<dyn CacheRepository> {
        &self.cache
    }

    pub fn batch(&self) -> &BatchTranslator {
        &self.batch
    }

    /// Segment `text` and translate it; input without letters or digits yields an empty result
    pub async fn translate_text(
        &self,
        id: &str,
        text: &str,
        lang_pair: LanguagePair,
    ) -> Result<TranslationResult, TranslationError> {
        if !is_valid_selection(text) {
            debug!("Skipping {}: no letters or digits to translate", id);
            return Ok(TranslationResult::empty(id));
        }

        let segments = self.segmenter.split(text);
        if segments.is_empty() {
            debug!("Nothing to translate for {}", id);
            return Ok(TranslationResult::empty(id));
        }
        self.translate_segments(id, segments, lang_pair).await
    }

    /// Translate pre-segmented input, serving repeats from the cache
    pub async fn translate_segments(
        &self,
        id: &str,
        segments: Vec<TextSegment>,
        lang_pair: LanguagePair,
    ) -> Result<TranslationResult, TranslationError> {
        let request = create_request(
            id,
            segments,
            lang_pair,
            Some(ParamOverrides::from(self.params.clone())),
        )?;
        let start_time = Instant::now();

        let mut translations: Vec<Option<String>> = Vec::with_capacity(request.len());
        let mut misses: Vec<(usize, TextSegment)> = Vec::new();
        for (index, segment) in request.segments().iter().enumerate() {
            match self.lookup(lang_pair, &segment.text).await {
                Some(translated) => translations.push(Some(translated)),
                None => {
                    translations.push(None);
                    misses.push((index, segment.clone()));
                }
            }
        }

        let cached = request.len() - misses.len();
        if !misses.is_empty() {
            let pending: Vec<TextSegment> = misses.iter().map(|(_, segment)| segment.clone()).collect();
            let items = self
                .batch
                .translate(request.id(), pending, lang_pair, request.params())
                .await?;

            if items.len() != misses.len() {
                return Err(RequestError::ResultCountMismatch {
                    expected: misses.len(),
                    actual: items.len(),
                }
                .into());
            }

            for ((index, segment), item) in misses.into_iter().zip(items) {
                self.store(lang_pair, &segment.text, &item.translated).await;
                translations[index] = Some(item.translated);
            }
        }

        info!(
            "Translated {} segments for {} ({} from cache) in {:?}",
            request.len(),
            request.id(),
            cached,
            start_time.elapsed()
        );

        let translated: Vec<String> = translations.into_iter().flatten().collect();
        Ok(build_result(&request, translated)?)
    }

    /// Probe the backend with the service parameters
    pub async fn test_connection(&self) -> Result<(), TranslationError> {
        Ok(self.batch.client().test_connection(&self.params).await?)
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, TranslationError> {
        Ok(self.cache.stats().await?)
    }

    pub async fn clear_cache(&self) -> Result<u64, TranslationError> {
        Ok(self.cache.clear().await?)
    }

    async fn lookup(&self, lang_pair: LanguagePair, text: &str) -> Option<String> {
        let key = build_cache_key(lang_pair, text);
        match self.cache.get(&key).await {
            Ok(entry) => entry.map(|entry| entry.translated_text),
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, lang_pair: LanguagePair, text: &str, translated: &str) {
        let entry = CacheEntry::new(
            lang_pair,
            text,
            translated,
            self.params.model.clone(),
            self.params.temperature,
        );
        if let Err(e) = self.cache.set(entry).await {
            warn!("Failed to cache translation for {}: {}", text, e);
        }
    }
}
