//! Error taxonomy for a single upstream fetch attempt

use std::time::Duration;

/// Why a single fetch attempt produced no document.
///
/// Only [`FetchError::is_not_found`] is terminal; every other variant is
/// retried by [`crate::retry::fetch_with_retry`] until the attempt budget
/// runs out.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP error with optional status code (`None` = connect/transport failure)
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Attempt exceeded its per-attempt time limit
    Timeout(Duration),
    /// Response body was not a JSON document
    Decode(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Timeout(after) => write!(f, "timed out after {after:?}"),
            Self::Decode(msg) => write!(f, "invalid JSON body: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create HTTP error from reqwest error.
    ///
    /// The URL is stripped so log lines stay short for long scoped names.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }

    /// Upstream confirmed the identifier does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: Some(404), .. })
    }

    /// Worth another attempt: everything except a confirmed 404.
    pub fn is_retryable(&self) -> bool {
        !self.is_not_found()
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_err(status: u16) -> FetchError {
        FetchError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn http_404_is_terminal() {
        let err = http_err(404);
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn http_429_retryable() {
        assert!(http_err(429).is_retryable());
    }

    #[test]
    fn http_500_retryable() {
        assert!(http_err(500).is_retryable());
    }

    #[test]
    fn http_410_retryable() {
        // only a plain 404 counts as "not found"
        assert!(http_err(410).is_retryable());
    }

    #[test]
    fn transport_error_retryable() {
        let err = FetchError::Http {
            status: None,
            message: "connection refused".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
    }

    #[test]
    fn timeout_retryable() {
        assert!(FetchError::Timeout(Duration::from_secs(30)).is_retryable());
    }

    #[test]
    fn decode_error_from_serde() {
        let err: FetchError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn display_http_with_status() {
        assert_eq!(format!("{}", http_err(404)), "HTTP 404: test");
    }

    #[test]
    fn display_http_without_status() {
        let err = FetchError::Http {
            status: None,
            message: "reset".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP error: reset");
    }

    #[test]
    fn display_timeout() {
        let err = FetchError::Timeout(Duration::from_secs(60));
        assert_eq!(format!("{err}"), "timed out after 60s");
    }
}
