/*!
 * Tests for text normalization and sentence segmentation
 */

use yakusu::translation::segmenter::{Segmenter, is_valid_selection, normalize_text};

fn split_texts(input: &str) -> Vec<String> {
    Segmenter::new()
        .split(input)
        .into_iter()
        .map(|segment| segment.text)
        .collect()
}

#[test]
fn test_split_withMixedScripts_shouldSplitOnBothTerminals() {
    assert_eq!(
        split_texts("Hello world. こんにちは世界。"),
        vec!["Hello world.", "こんにちは世界。"]
    );
}

#[test]
fn test_split_withEmptyOrBlankInput_shouldReturnNothing() {
    assert!(Segmenter::new().split("").is_empty());
    assert!(Segmenter::new().split("   ").is_empty());
    assert!(Segmenter::new().split("\r\n\t \n").is_empty());
}

#[test]
fn test_split_shouldAssignSequentialZeroPaddedIds() {
    let segments = Segmenter::new().split("One. Two! Three?");
    let ids: Vec<&str> = segments.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["segment-0000", "segment-0001", "segment-0002"]);
}

#[test]
fn test_split_withLineBreaks_shouldTreatLinesAsSegments() {
    assert_eq!(
        split_texts("Title\r\n\r\n\r\nFirst line\nSecond line"),
        vec!["Title", "First line", "Second line"]
    );
}

#[test]
fn test_split_withPunctuationInsideToken_shouldNotSplit() {
    assert_eq!(split_texts("Version 1.5 is out."), vec!["Version 1.5 is out."]);
}

#[test]
fn test_split_thenRejoin_shouldPreserveNonWhitespaceCharacters() {
    let inputs = [
        "Hello world. How are you?  Fine!\n\nこんにちは。元気ですか？",
        "  leading and trailing   ",
        "no terminal punctuation at all",
        "Tabs\tand   spaces.\r\nCRLF line.",
    ];

    for input in inputs {
        let rejoined = split_texts(input).join(" ");
        let expected: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let actual: String = rejoined.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(actual, expected, "input: {:?}", input);
    }
}

#[test]
fn test_normalizeText_shouldCollapseWhitespaceAndCapBlankLines() {
    assert_eq!(normalize_text("  a \t b\r\n\n\n\nc  "), "a b\n\nc");
}

#[test]
fn test_isValidSelection_shouldRequireAlphanumericContent() {
    assert!(is_valid_selection("こんにちは"));
    assert!(is_valid_selection(" 42 "));
    assert!(!is_valid_selection("   "));
    assert!(!is_valid_selection("...!?"));
}
