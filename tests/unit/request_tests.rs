/*!
 * Tests for the request model and the delimited payload codec
 */

use yakusu::errors::RequestError;
use yakusu::translation::request::{
    ParamOverrides, SEGMENT_DELIMITER, build_result, create_request, join_for_prompt,
    split_payload,
};

use crate::common::{en_ja, ja_en, segments};

#[test]
fn test_createRequest_withDefaults_shouldResolveParams() {
    let request = create_request("req", segments(&["Hello."]), en_ja(), None).unwrap();

    assert_eq!(request.id(), "req");
    assert_eq!(request.params().model, "lmstudio");
    assert_eq!(request.params().max_tokens, 512);
    assert!((request.params().temperature - 0.2).abs() < f32::EPSILON);
}

#[test]
fn test_createRequest_withOverrides_shouldApplyOnlyGivenFields() {
    let overrides = ParamOverrides::default().model("qwen2.5").temperature(0.7);
    let request = create_request("req", segments(&["Hi."]), ja_en(), Some(overrides)).unwrap();

    assert_eq!(request.params().model, "qwen2.5");
    assert_eq!(request.params().max_tokens, 512);
    assert!((request.params().temperature - 0.7).abs() < f32::EPSILON);
}

#[test]
fn test_createRequest_withSameLanguages_shouldBeInvalid() {
    let pair = yakusu::LanguagePair::new(yakusu::Language::Ja, yakusu::Language::Ja);
    let error = create_request("req", segments(&["Hi."]), pair, None).unwrap_err();
    assert!(matches!(error, RequestError::InvalidRequest(_)));
}

#[test]
fn test_createRequest_withNoSegments_shouldBeInvalid() {
    let error = create_request("req", Vec::new(), en_ja(), None).unwrap_err();
    assert!(matches!(error, RequestError::InvalidRequest(_)));
}

#[test]
fn test_createRequest_withBlankModel_shouldBeInvalid() {
    let overrides = ParamOverrides::default().model("  ");
    let error = create_request("req", segments(&["Hi."]), en_ja(), Some(overrides)).unwrap_err();
    assert!(matches!(error, RequestError::InvalidRequest(_)));
}

#[test]
fn test_splitPayload_ofJoinedSegments_shouldRecoverTexts() {
    let input = segments(&["First line.", "二行目。", "Third, with\nnewline."]);
    let joined = join_for_prompt(&input);

    assert_eq!(joined.matches(SEGMENT_DELIMITER).count(), 2);
    assert_eq!(
        split_payload(&joined, input.len()).unwrap(),
        vec!["First line.", "二行目。", "Third, with\nnewline."]
    );
}

#[test]
fn test_splitPayload_withWrongCount_shouldReportBothCounts() {
    let error = split_payload("a\u{241E}b", 3).unwrap_err();
    assert_eq!(error, RequestError::SegmentCountMismatch { expected: 3, actual: 2 });
}

#[test]
fn test_buildResult_shouldKeepIdsAndOrder() {
    let request = create_request("req", segments(&["A.", "B."]), en_ja(), None).unwrap();
    let result = build_result(&request, vec!["あ。".to_string(), "い。".to_string()]).unwrap();

    assert_eq!(result.id, "req");
    assert_eq!(result.items[0].id, "segment-0000");
    assert_eq!(result.texts(), vec!["あ。", "い。"]);
}

#[test]
fn test_buildResult_withTooFewTranslations_shouldFail() {
    let request = create_request("req", segments(&["A.", "B."]), en_ja(), None).unwrap();
    let error = build_result(&request, vec!["あ。".to_string()]).unwrap_err();
    assert_eq!(error, RequestError::ResultCountMismatch { expected: 2, actual: 1 });
}
