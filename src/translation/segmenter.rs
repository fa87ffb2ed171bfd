/*!
 * Text segmentation.
 *
 * Splits raw input into ordered, addressable segments (roughly one sentence
 * or line each). Latin and CJK sentence-terminal punctuation are handled the
 * same way, so mixed-script input segments predictably.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HORIZONTAL_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("valid horizontal whitespace regex"));

static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

static NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("valid newline regex"));

/// Punctuation that ends a sentence when followed by whitespace
const SENTENCE_TERMINALS: [char; 6] = ['.', '。', '!', '！', '?', '？'];

/// One addressable unit of source text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSegment {
    /// Stable id, `segment-0000` style
    pub id: String,
    /// Segment text
    pub text: String,
}

impl TextSegment {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Normalize whitespace: CRLF to LF, collapse blanks, cap blank lines at one, trim
pub fn normalize_text(value: &str) -> String {
    let unified = value.replace("\r\n", "\n");
    let collapsed = HORIZONTAL_WHITESPACE.replace_all(&unified, " ");
    let capped = EXCESS_NEWLINES.replace_all(&collapsed, "\n\n");
    capped.trim().to_string()
}

/// Id for the segment at `index`
pub fn segment_id(index: usize) -> String {
    format!("segment-{:04}", index)
}

/// Whether a user selection is worth translating at all
pub fn is_valid_selection(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.chars().any(char::is_alphanumeric)
}

/// Deterministic sentence/line segmenter
#[derive(Debug, Clone, Copy, Default)]
pub struct Segmenter;

impl Segmenter {
    pub fn new() -> Self {
        Self
    }

    /// Split text into ordered segments; whitespace-only input yields none
    pub fn split(&self, input: &str) -> Vec<TextSegment> {
        let sanitized = normalize_text(input);
        if sanitized.is_empty() {
            return Vec::new();
        }

        let parts: Vec<&str> = split_sentences(&sanitized)
            .into_iter()
            .flat_map(|chunk| NEWLINE_RUNS.split(chunk))
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if parts.is_empty() {
            return vec![TextSegment::new(segment_id(0), sanitized)];
        }

        parts
            .into_iter()
            .enumerate()
            .map(|(index, text)| TextSegment::new(segment_id(index), text))
            .collect()
    }
}

/// Cut after terminal punctuation that is followed by whitespace.
/// The punctuation stays with its sentence and the whitespace run is dropped.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if !SENTENCE_TERMINALS.contains(&ch) {
            continue;
        }

        let end = index + ch.len_utf8();
        if !matches!(chars.peek(), Some((_, next)) if next.is_whitespace()) {
            continue;
        }

        chunks.push(&text[start..end]);

        let mut resume = text.len();
        while let Some(&(next_index, next)) = chars.peek() {
            if next.is_whitespace() {
                chars.next();
            } else {
                resume = next_index;
                break;
            }
        }
        start = resume;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}
