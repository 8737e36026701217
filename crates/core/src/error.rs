// ABOUTME: Error types for fetching horoscope pages and writing the CSV log.
// ABOUTME: Provides the Error enum and a Result alias shared by the session and the CSV log.

use thiserror::Error;

/// Errors surfaced by the fetch and persistence boundaries.
///
/// Extraction itself never fails: unmatched headings and paragraphs are
/// skipped, so nothing in this enum comes from [`crate::extract`].
#[derive(Debug, Error)]
pub enum Error {
    /// The URL could not be parsed or uses a scheme other than http/https.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport failure that survived the retry budget (or was not retryable).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success status outside the retry forcelist.
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Every attempt allowed by the retry policy came back retryable.
    #[error("GET {url} gave up after {attempts} attempts (last status: {})", display_status(.last_status))]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_status: Option<u16>,
    },

    /// Response body exceeded [`crate::resource::MAX_CONTENT_LENGTH`].
    #[error("response from {url} is too large ({len} bytes)")]
    TooLarge { url: String, len: u64 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

fn display_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl Error {
    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        Error::Csv {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the retry budget ran out.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Error::RetriesExhausted { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_exhausted_display_includes_last_status() {
        let err = Error::RetriesExhausted {
            url: "https://example.com/h".to_string(),
            attempts: 6,
            last_status: Some(503),
        };
        assert_eq!(
            err.to_string(),
            "GET https://example.com/h gave up after 6 attempts (last status: 503)"
        );
        assert!(err.is_retries_exhausted());
    }

    #[test]
    fn retries_exhausted_without_status() {
        let err = Error::RetriesExhausted {
            url: "https://example.com".to_string(),
            attempts: 2,
            last_status: None,
        };
        assert!(err.to_string().ends_with("(last status: none)"));
    }

    #[test]
    fn io_error_names_the_path() {
        let err = Error::io(
            "log.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_retries_exhausted());
        assert!(err.to_string().starts_with("I/O error on log.csv"));
    }
}
