/*!
 * Tests for the error taxonomy
 */

use yakusu::errors::{AppError, ClientError, ClientErrorKind, RequestError, TranslationError};

#[test]
fn test_clientError_codes_shouldBeStableStrings() {
    let cases = [
        (ClientError::network("reset"), "network"),
        (
            ClientError::RateLimit {
                message: "slow down".to_string(),
                retry_after_secs: Some(3),
            },
            "rate-limit",
        ),
        (
            ClientError::Server {
                status: 502,
                message: "bad gateway".to_string(),
                retry_after_secs: None,
            },
            "server",
        ),
        (ClientError::invalid_response("garbage"), "invalid-response"),
        (
            ClientError::Unauthorized {
                message: "bad key".to_string(),
            },
            "unauthorized",
        ),
    ];

    for (error, code) in cases {
        assert_eq!(error.code(), code);
        assert_eq!(error.kind().code(), code);
    }
}

#[test]
fn test_clientError_fromRequestError_shouldCarryMismatch() {
    let mismatch = RequestError::SegmentCountMismatch { expected: 4, actual: 3 };
    let error = ClientError::from(mismatch.clone());

    assert_eq!(error.kind(), ClientErrorKind::InvalidResponse);
    match error {
        ClientError::InvalidResponse { mismatch: carried, .. } => assert_eq!(carried, Some(mismatch)),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_clientError_accessors_shouldExposeStatusAndRetryAfter() {
    let server = ClientError::Server {
        status: 503,
        message: "unavailable".to_string(),
        retry_after_secs: Some(5),
    };
    assert_eq!(server.status(), Some(503));
    assert_eq!(server.retry_after_secs(), Some(5));
    assert_eq!(ClientError::network("x").status(), None);
}

#[test]
fn test_translationError_shouldWrapSources() {
    let error: TranslationError = RequestError::InvalidRequest("empty".to_string()).into();
    assert!(error.to_string().contains("empty"));

    let app: AppError = error.into();
    assert!(matches!(app, AppError::Translation(TranslationError::Request(_))));
}

#[test]
fn test_appError_fromIoError_shouldBeFileError() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    assert!(matches!(AppError::from(io), AppError::File(_)));
}
