/*!
 * Translation request construction.
 *
 * `create_request` is the only way to obtain a `TranslationRequest`; it
 * validates the language pair, resolves generation parameters and
 * re-normalizes every segment. The prompt helpers join segments with a
 * reserved delimiter and split the model output back into aligned results.
 */

use serde::{Deserialize, Serialize};

use crate::errors::RequestError;
use crate::language_utils::Language;

use super::segmenter::{TextSegment, normalize_text};

/// Reserved delimiter placed between segments (U+241E SYMBOL FOR RECORD SEPARATOR)
pub const SEGMENT_DELIMITER: char = '\u{241E}';

pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 512;
pub const DEFAULT_MODEL: &str = "lmstudio";

/// Ordered (source, destination) language pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub src: Language,
    pub dst: Language,
}

impl LanguagePair {
    pub fn new(src: Language, dst: Language) -> Self {
        Self { src, dst }
    }

    /// Parse a pair from two language codes
    pub fn from_codes(src: &str, dst: &str) -> Result<Self, RequestError> {
        Ok(Self::new(src.parse()?, dst.parse()?))
    }
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.src, self.dst)
    }
}

/// Fully resolved generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub model: String,
}

impl Default for TranslationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Caller supplied parameters; anything left out falls back to the defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamOverrides {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ParamOverrides {
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Resolve against the system defaults
    pub fn resolve(&self) -> TranslationParams {
        let defaults = TranslationParams::default();
        TranslationParams {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            model: self.model.clone().unwrap_or(defaults.model),
        }
    }
}

impl From<TranslationParams> for ParamOverrides {
    fn from(params: TranslationParams) -> Self {
        Self {
            temperature: Some(params.temperature),
            max_tokens: Some(params.max_tokens),
            model: Some(params.model),
        }
    }
}

/// A validated translation request
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    id: String,
    segments: Vec<TextSegment>,
    lang_pair: LanguagePair,
    params: TranslationParams,
}

impl TranslationRequest {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn segments(&self) -> &[TextSegment] {
        &self.segments
    }

    pub fn lang_pair(&self) -> LanguagePair {
        self.lang_pair
    }

    pub fn params(&self) -> &TranslationParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: requests carry at least one segment
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// One translated segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedItem {
    pub id: String,
    pub translated: String,
}

/// Translations aligned 1:1 with the request's segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub id: String,
    pub items: Vec<TranslatedItem>,
}

impl TranslationResult {
    /// Result with no items, used for input that produced no segments
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
        }
    }

    /// Translated texts in segment order
    pub fn texts(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.translated.as_str()).collect()
    }
}

/// Build a validated request
///
/// Fails with `InvalidRequest` when there are no segments, when source and
/// destination languages are the same, or when the resolved model is empty.
pub fn create_request(
    id: impl Into<String>,
    segments: Vec<TextSegment>,
    lang_pair: LanguagePair,
    overrides: Option<ParamOverrides>,
) -> Result<TranslationRequest, RequestError> {
    if segments.is_empty() {
        return Err(RequestError::InvalidRequest(
            "Translation request requires at least one segment".to_string(),
        ));
    }
    if lang_pair.src == lang_pair.dst {
        return Err(RequestError::InvalidRequest(
            "Source and destination languages must differ".to_string(),
        ));
    }

    let params = overrides.unwrap_or_default().resolve();
    if params.model.trim().is_empty() {
        return Err(RequestError::InvalidRequest(
            "Model is required for translation".to_string(),
        ));
    }

    let segments = segments
        .into_iter()
        .map(|segment| TextSegment {
            text: normalize_text(&segment.text),
            id: segment.id,
        })
        .collect();

    Ok(TranslationRequest {
        id: id.into(),
        segments,
        lang_pair,
        params,
    })
}

/// Join segment texts into a single prompt payload
pub fn join_for_prompt(segments: &[TextSegment]) -> String {
    let mut delimiter = [0u8; 4];
    let delimiter: &str = SEGMENT_DELIMITER.encode_utf8(&mut delimiter);
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// Split a delimited payload, requiring exactly `expected` pieces
pub fn split_payload(payload: &str, expected: usize) -> Result<Vec<String>, RequestError> {
    let tokens: Vec<String> = payload.split(SEGMENT_DELIMITER).map(str::to_string).collect();
    if tokens.len() != expected {
        return Err(RequestError::SegmentCountMismatch {
            expected,
            actual: tokens.len(),
        });
    }
    Ok(tokens)
}

/// Zip translations with the request's segment ids
pub fn build_result(
    request: &TranslationRequest,
    translated: Vec<String>,
) -> Result<TranslationResult, RequestError> {
    if request.segments.len() != translated.len() {
        return Err(RequestError::ResultCountMismatch {
            expected: request.segments.len(),
            actual: translated.len(),
        });
    }

    let items = request
        .segments
        .iter()
        .zip(translated)
        .map(|(segment, translated)| TranslatedItem {
            id: segment.id.clone(),
            translated,
        })
        .collect();

    Ok(TranslationResult {
        id: request.id.clone(),
        items,
    })
}
