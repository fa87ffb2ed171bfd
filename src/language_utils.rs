use isolang::Language as IsoLanguage;
use serde::{Deserialize, Serialize};

use crate::errors::RequestError;

/// Language utilities for the supported translation languages
///
/// The translator works on a fixed set of languages. Codes are accepted in
/// ISO 639-1 (2-letter) or ISO 639-3 (3-letter) form, or as the English
/// language name, and are always emitted in ISO 639-1 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    En,
    /// Japanese
    Ja,
}

impl Language {
    /// All supported languages
    pub const ALL: [Language; 2] = [Language::En, Language::Ja];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ja => "ja",
        }
    }

    /// English display name, e.g. "Japanese"
    pub fn name(&self) -> String {
        IsoLanguage::from_639_1(self.code())
            .map(|lang| lang.to_name().to_string())
            .unwrap_or_else(|| self.code().to_string())
    }

    /// Name of the language in the language itself, e.g. "日本語"
    pub fn native_name(&self) -> String {
        IsoLanguage::from_639_1(self.code())
            .and_then(|lang| lang.to_autonym())
            .map(|name| name.to_string())
            .unwrap_or_else(|| self.name())
    }

    fn from_iso(lang: IsoLanguage) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| lang.to_639_1() == Some(candidate.code()))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized_code = s.trim().to_lowercase();

        let iso = match normalized_code.len() {
            2 => IsoLanguage::from_639_1(&normalized_code),
            3 => IsoLanguage::from_639_3(&normalized_code),
            _ => None,
        };

        iso.and_then(Self::from_iso)
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|lang| lang.name().to_lowercase() == normalized_code)
            })
            .ok_or_else(|| RequestError::InvalidRequest(format!("Unsupported language: {}", s)))
    }
}

/// Check whether two language codes refer to the same supported language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (code1.parse::<Language>(), code2.parse::<Language>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
