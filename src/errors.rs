/*!
 * Error types for the yakusu library.
 *
 * This module contains custom error types for the different layers of the
 * translation core, using the thiserror crate for ergonomic error definitions:
 * - `RequestError`: request construction and payload/result alignment
 * - `ClientError`: failures talking to the LM Studio backend
 * - `CacheError`: failures inside a cache backend
 * - `TranslationError`: everything the translation service can surface
 */

use thiserror::Error;

/// Errors raised while building a request or aligning a response with it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Malformed input: empty segments, identical languages, empty model
    #[error("Invalid translation request: {0}")]
    InvalidRequest(String),

    /// The delimited payload did not split into the expected number of segments
    #[error("Segment count mismatch. expected={expected} actual={actual}")]
    SegmentCountMismatch {
        /// Number of segments the request carried
        expected: usize,
        /// Number of segments found in the payload
        actual: usize,
    },

    /// The translated list does not line up with the request segments
    #[error("Result segment count does not match request. expected={expected} actual={actual}")]
    ResultCountMismatch {
        /// Number of segments the request carried
        expected: usize,
        /// Number of translations supplied
        actual: usize,
    },
}

/// Closed set of client failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientErrorKind {
    Network,
    RateLimit,
    Server,
    InvalidResponse,
    Unauthorized,
}

impl ClientErrorKind {
    /// Stable wire code for the kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimit => "rate-limit",
            Self::Server => "server",
            Self::InvalidResponse => "invalid-response",
            Self::Unauthorized => "unauthorized",
        }
    }
}

impl std::fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors that can occur when talking to the translation backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// DNS, connect, timeout or any other transport-level failure
    #[error("Failed to reach LM Studio: {message}")]
    Network {
        /// Transport error description
        message: String,
    },

    /// HTTP 429
    #[error("LM Studio rate limit exceeded: {message}")]
    RateLimit {
        /// Error description
        message: String,
        /// Server supplied `Retry-After` in seconds
        retry_after_secs: Option<u64>,
    },

    /// HTTP 5xx
    #[error("LM Studio returned {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error description
        message: String,
        /// Server supplied `Retry-After` in seconds (informational only)
        retry_after_secs: Option<u64>,
    },

    /// Unexpected status, unparsable body, empty content or misaligned payload
    #[error("Invalid response from LM Studio: {message}")]
    InvalidResponse {
        /// Error description
        message: String,
        /// HTTP status code, when the failure came from a status line
        status: Option<u16>,
        /// Alignment failure, when the payload could not be split
        mismatch: Option<RequestError>,
    },

    /// HTTP 401
    #[error("LM Studio rejected the API key: {message}")]
    Unauthorized {
        /// Error description
        message: String,
    },
}

impl ClientError {
    /// Kind of this error
    pub fn kind(&self) -> ClientErrorKind {
        match self {
            Self::Network { .. } => ClientErrorKind::Network,
            Self::RateLimit { .. } => ClientErrorKind::RateLimit,
            Self::Server { .. } => ClientErrorKind::Server,
            Self::InvalidResponse { .. } => ClientErrorKind::InvalidResponse,
            Self::Unauthorized { .. } => ClientErrorKind::Unauthorized,
        }
    }

    /// Stable wire code, e.g. `rate-limit`
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// HTTP status attached to the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimit { .. } => Some(429),
            Self::Server { status, .. } => Some(*status),
            Self::InvalidResponse { status, .. } => *status,
            Self::Unauthorized { .. } => Some(401),
            Self::Network { .. } => None,
        }
    }

    /// Retry-after hint in seconds, if the server sent one
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after_secs, .. } | Self::Server { retry_after_secs, .. } => {
                *retry_after_secs
            }
            _ => None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
            status: None,
            mismatch: None,
        }
    }
}

impl From<RequestError> for ClientError {
    fn from(error: RequestError) -> Self {
        Self::InvalidResponse {
            message: error.to_string(),
            status: None,
            mismatch: Some(error),
        }
    }
}

/// Errors that can occur inside a cache backend
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store failed
    #[error("Cache storage error: {0}")]
    Storage(String),

    /// A stored row could not be decoded
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<anyhow::Error> for CacheError {
    fn from(error: anyhow::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Errors that can occur during a translation call
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The request could not be built or aligned
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// The backend call failed
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// The cache backend failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Main application error type used by the binary
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
