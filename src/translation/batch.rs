/*!
 * Batch translation processing.
 *
 * Large segment lists are cut into fixed-size windows. Each window becomes
 * its own translation request; windows run concurrently (the client's
 * concurrency gate still bounds the in-flight calls) and their results are
 * merged back in the original order. One failed window fails the batch.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error};
use std::time::Instant;

use crate::errors::TranslationError;
use crate::providers::LmStudio;

use super::request::{LanguagePair, ParamOverrides, TranslatedItem, TranslationParams, create_request};
use super::segmenter::TextSegment;

/// Default number of segments per backend request
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Windowed translator over an LM Studio client
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    /// Client shared by every window
    client: LmStudio,

    /// Maximum segments per request
    window_size: usize,
}

impl BatchTranslator {
    /// Create a new batch translator; a zero window size is treated as one
    pub fn new(client: LmStudio, window_size: usize) -> Self {
        Self {
            client,
            window_size: window_size.max(1),
        }
    }

    pub fn client(&self) -> &LmStudio {
        &self.client
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of requests needed for `segment_count` segments
    pub fn window_count(&self, segment_count: usize) -> usize {
        segment_count.div_ceil(self.window_size)
    }

    /// Translate `segments`, returning items in input order
    pub async fn translate(
        &self,
        id: &str,
        segments: Vec<TextSegment>,
        lang_pair: LanguagePair,
        params: &TranslationParams,
    ) -> Result<Vec<TranslatedItem>, TranslationError> {
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let total_windows = self.window_count(segments.len());
        let requests = segments
            .chunks(self.window_size)
            .enumerate()
            .map(|(index, window)| {
                let window_id = if total_windows == 1 {
                    id.to_string()
                } else {
                    format!("{}-w{}", id, index)
                };
                create_request(
                    window_id,
                    window.to_vec(),
                    lang_pair,
                    Some(ParamOverrides::from(params.clone())),
                )
                .map(|request| (index, request))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let concurrency = self.client.limiter().capacity();
        let mut results = stream::iter(requests)
            .map(|(index, request)| {
                let client = self.client.clone();
                async move {
                    let start_time = Instant::now();
                    let result = client.translate(&request).await;
                    match &result {
                        Ok(_) => debug!(
                            "Window {} of {} ({} segments) completed in {:?}",
                            index + 1,
                            total_windows,
                            request.len(),
                            start_time.elapsed()
                        ),
                        Err(e) => error!("Window {} of {} failed: {}", index + 1, total_windows, e),
                    }
                    (index, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await;

        // Sort results by window index to maintain original order
        results.sort_by_key(|(index, _)| *index);

        let mut items = Vec::with_capacity(segments.len());
        for (_, result) in results {
            items.extend(result?.items);
        }
        Ok(items)
    }
}
