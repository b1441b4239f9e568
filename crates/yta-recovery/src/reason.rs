//! Pure classification of a failure into a [`RetryReason`] (spec.md §4.1).
//!
//! Rust has no uniform exception hierarchy to dispatch on, so callers pass a
//! couple of type hints (`is_network`, `is_io`) alongside the stringified
//! error and an optional HTTP-like status code. Keyword matching is
//! case-insensitive.

use yta_models::RetryReason;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReasonHints {
    /// The underlying error is a connection or timeout error type.
    pub is_network: bool,
    /// The underlying error is an I/O / OS error type.
    pub is_io: bool,
    /// An HTTP-like status code carried by the error, if any.
    pub http_status: Option<u16>,
}

const NETWORK_KEYWORDS: [&str; 4] = ["timeout", "connection", "network", "unreachable"];

pub fn determine_retry_reason(message: &str, hints: ReasonHints) -> RetryReason {
    let lower = message.to_lowercase();

    if hints.is_network || NETWORK_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return RetryReason::NetworkError;
    }
    if lower.contains("quota") {
        return RetryReason::ApiQuotaExceeded;
    }
    if lower.contains("rate") {
        return RetryReason::RateLimited;
    }
    if hints.is_io {
        return RetryReason::DownloadFailed;
    }
    if let Some(status) = hints.http_status {
        return match status {
            503 => RetryReason::ServiceUnavailable,
            429 => RetryReason::RateLimited,
            s if s >= 500 => RetryReason::ServerError,
            _ => RetryReason::Unknown,
        };
    }
    RetryReason::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_hint_wins_first() {
        let reason = determine_retry_reason(
            "quota exceeded",
            ReasonHints {
                is_network: true,
                ..Default::default()
            },
        );
        assert_eq!(reason, RetryReason::NetworkError);
    }

    #[test]
    fn network_keyword_detected_without_hint() {
        assert_eq!(
            determine_retry_reason("Connection refused by peer", ReasonHints::default()),
            RetryReason::NetworkError
        );
    }

    #[test]
    fn quota_keyword_detected() {
        assert_eq!(
            determine_retry_reason("Daily quota exceeded", ReasonHints::default()),
            RetryReason::ApiQuotaExceeded
        );
    }

    #[test]
    fn rate_keyword_detected() {
        assert_eq!(
            determine_retry_reason("Rate limit hit", ReasonHints::default()),
            RetryReason::RateLimited
        );
    }

    #[test]
    fn io_hint_maps_to_download_failed() {
        assert_eq!(
            determine_retry_reason(
                "disk error",
                ReasonHints {
                    is_io: true,
                    ..Default::default()
                }
            ),
            RetryReason::DownloadFailed
        );
    }

    #[test]
    fn http_status_mapping() {
        let hints = |status| ReasonHints {
            http_status: Some(status),
            ..Default::default()
        };
        assert_eq!(
            determine_retry_reason("err", hints(503)),
            RetryReason::ServiceUnavailable
        );
        assert_eq!(
            determine_retry_reason("err", hints(429)),
            RetryReason::RateLimited
        );
        assert_eq!(
            determine_retry_reason("err", hints(502)),
            RetryReason::ServerError
        );
        assert_eq!(
            determine_retry_reason("err", hints(400)),
            RetryReason::Unknown
        );
    }

    #[test]
    fn default_is_unknown() {
        assert_eq!(
            determine_retry_reason("something odd", ReasonHints::default()),
            RetryReason::Unknown
        );
    }
}
