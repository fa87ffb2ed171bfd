/*!
 * Tests for language code handling
 */

use yakusu::language_utils::{Language, language_codes_match};
use yakusu::translation::request::LanguagePair;

#[test]
fn test_language_displayNames_shouldComeFromIsoTables() {
    assert_eq!(Language::En.name(), "English");
    assert_eq!(Language::Ja.name(), "Japanese");
    assert!(Language::Ja.native_name().contains("日本語"));
}

#[test]
fn test_languageCodesMatch_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("ja", "jpn"));
    assert!(language_codes_match("EN", "english"));
    assert!(!language_codes_match("en", "ja"));
    assert!(!language_codes_match("fr", "fra"));
}

#[test]
fn test_languagePair_fromCodes_shouldParseAndDisplay() {
    let pair = LanguagePair::from_codes("eng", "ja").unwrap();
    assert_eq!(pair.src, Language::En);
    assert_eq!(pair.dst, Language::Ja);
    assert_eq!(pair.to_string(), "en:ja");
    assert!(LanguagePair::from_codes("en", "de").is_err());
}

#[test]
fn test_language_serde_shouldUseLowercaseCodes() {
    assert_eq!(serde_json::to_string(&Language::Ja).unwrap(), "\"ja\"");
    let parsed: Language = serde_json::from_str("\"en\"").unwrap();
    assert_eq!(parsed, Language::En);
}
