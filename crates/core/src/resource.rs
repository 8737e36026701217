// ABOUTME: Blocking HTTP session that fetches article pages under an injected retry policy.
// ABOUTME: Retries transient statuses and transport errors with exponential backoff, then decodes the body.

use std::thread;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::options::{RetryMethod, RetryPolicy, SessionBuilder, SessionOptions};

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decode the body as text using the Content-Type charset or detection.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// HTTP session with a fixed User-Agent, timeout, and retry policy.
pub struct HttpSession {
    opts: SessionOptions,
    client: Client,
}

impl HttpSession {
    /// Create a new SessionBuilder for configuring the session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Create a new session with the given options.
    pub fn new(opts: SessionOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&opts.user_agent)
            .timeout(opts.timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|source| Error::Request {
                url: String::new(),
                source,
            })?;
        Ok(Self { opts, client })
    }

    /// GET `url` and return its decoded body.
    pub fn get_text(&self, url: &str) -> Result<String> {
        Ok(self.get(url)?.text())
    }

    /// GET `url`, retrying transient failures per the session's policy.
    pub fn get(&self, url: &str) -> Result<FetchResult> {
        let parsed = validate_url(url)?;
        let policy = &self.opts.retry;
        let budget = if policy.allows(RetryMethod::Get) {
            policy.total
        } else {
            0
        };

        let mut retries = 0u32;
        loop {
            let attempt = retries + 1;
            debug!(url, attempt, "GET");

            match self.client.get(parsed.clone()).send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !policy.is_retryable_status(status) {
                        if !response.status().is_success() {
                            return Err(Error::Status {
                                url: url.to_string(),
                                status,
                            });
                        }
                        return read_response(url, response);
                    }

                    if retries >= budget {
                        return Err(Error::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last_status: Some(status),
                        });
                    }
                    retries += 1;
                    let delay = retry_after(&response, policy)
                        .unwrap_or_else(|| policy.backoff(retries));
                    warn!(
                        url,
                        status,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "retryable status, backing off"
                    );
                    thread::sleep(delay);
                }
                Err(source) => {
                    let transient = source.is_connect() || source.is_timeout();
                    if !transient || retries >= budget {
                        return Err(Error::Request {
                            url: url.to_string(),
                            source,
                        });
                    }
                    retries += 1;
                    let delay = policy.backoff(retries);
                    warn!(
                        url,
                        error = %source,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "transport error, backing off"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }
}

fn validate_url(url: &str) -> Result<Url> {
    if url.is_empty() {
        return Err(Error::invalid_url(url, "empty URL"));
    }
    let parsed = Url::parse(url).map_err(|e| Error::invalid_url(url, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(Error::invalid_url(url, "scheme must be http or https")),
    }
}

/// Server-requested delay for 429/503, capped at the policy's backoff ceiling.
fn retry_after(response: &Response, policy: &RetryPolicy) -> Option<Duration> {
    if !policy.respect_retry_after {
        return None;
    }
    let status = response.status().as_u16();
    if status != 429 && status != 503 {
        return None;
    }
    let value = response.headers().get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, Utc::now()).map(|d| d.min(policy.backoff_max))
}

/// Parses a Retry-After value given either as seconds or as an HTTP date.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

fn read_response(url: &str, response: Response) -> Result<FetchResult> {
    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(Error::TooLarge {
                url: url.to_string(),
                len,
            });
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response.bytes().map_err(|source| Error::Request {
        url: url.to_string(),
        source,
    })?;
    if body.len() > MAX_CONTENT_LENGTH {
        return Err(Error::TooLarge {
            url: url.to_string(),
            len: body.len() as u64,
        });
    }

    Ok(FetchResult {
        content_type,
        body,
    })
}

/// Decode body bytes using the charset from content-type, or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(charset) = content_type.and_then(extract_charset) {
        if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
            let (decoded, _, _) = encoding.decode(body);
            return decoded.into_owned();
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract the charset value from a Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .to_lowercase()
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("charset="))
        .map(|charset| charset.trim_matches('"').trim_matches('\'').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use httpmock::prelude::*;

    fn fast_session(retries: u32) -> HttpSession {
        HttpSession::builder()
            .user_agent("test-agent")
            .retries(retries)
            .backoff_factor(0.0)
            .build()
            .unwrap()
    }

    #[test]
    fn get_text_ok_utf8() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/h").header("user-agent", "test-agent");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<h2>Horóscopo</h2>");
        });

        let text = fast_session(0).get_text(&server.url("/h")).unwrap();
        mock.assert();
        assert_eq!(text, "<h2>Horóscopo</h2>");
    }

    #[test]
    fn get_text_decodes_latin1() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/latin");
            then.status(200)
                .header("content-type", "text/html; charset=ISO-8859-1")
                .body(b"Hor\xf3scopo".to_vec());
        });

        let text = fast_session(0).get_text(&server.url("/latin")).unwrap();
        assert_eq!(text, "Horóscopo");
    }

    #[test]
    fn retryable_status_exhausts_budget() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(503);
        });

        let err = fast_session(2).get(&server.url("/busy")).unwrap_err();
        mock.assert_calls(3);
        match err {
            Error::RetriesExhausted {
                attempts,
                last_status,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_status, Some(503));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_retryable_status_fails_immediately() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let err = fast_session(5).get(&server.url("/missing")).unwrap_err();
        mock.assert_calls(1);
        assert!(matches!(err, Error::Status { status: 404, .. }));
    }

    #[test]
    fn get_not_in_allowed_methods_disables_retries() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(500);
        });

        let session = HttpSession::builder()
            .retry(RetryPolicy {
                allowed_methods: vec![RetryMethod::Head],
                backoff_factor: 0.0,
                ..RetryPolicy::default()
            })
            .build()
            .unwrap();
        let err = session.get(&server.url("/busy")).unwrap_err();
        mock.assert_calls(1);
        assert!(err.is_retries_exhausted());
    }

    #[test]
    fn connection_refused_is_retried_then_reported() {
        let err = fast_session(1).get("http://127.0.0.1:1/").unwrap_err();
        assert!(matches!(err, Error::Request { .. }));
    }

    #[test]
    fn rejects_non_http_schemes() {
        let session = fast_session(0);
        assert!(matches!(
            session.get("ftp://example.com/x"),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(matches!(session.get(""), Err(Error::InvalidUrl { .. })));
        assert!(matches!(
            session.get("not a url"),
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[test]
    fn retry_after_accepts_seconds_and_dates() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(
            parse_retry_after("7", now),
            Some(Duration::from_secs(7))
        );
        assert_eq!(
            parse_retry_after("Mon, 01 Jan 2024 12:00:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Mon, 01 Jan 2024 11:00:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn extract_charset_variants() {
        assert_eq!(
            extract_charset("text/html; charset=\"UTF-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }
}
