//! Shared retry/error-recovery vocabulary (C1). Strategy implementations
//! live in `yta-recovery`; this crate only carries the data types so that
//! `yta-handlers` and the supervisors can speak the same language without
//! depending on the driver.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Why a retry is being considered, used by strategies to branch behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryReason {
    NetworkError,
    ApiQuotaExceeded,
    RateLimited,
    DownloadFailed,
    ServiceUnavailable,
    ServerError,
    Timeout,
    ResourceExhausted,
    QualityNotAvailable,
    Unknown,
}

/// Severity attached to an `ErrorReport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "info",
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Critical => "critical",
        }
    }
}

/// Retry/backoff configuration. Constructed only through [`RetryConfig::new`]
/// or [`RetryConfig::default`], both of which enforce the validation rules
/// in spec.md §7 (invalid configurations fail at construction).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
    pub exponential_base: f64,
    pub jitter: bool,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum RetryConfigError {
    #[error("max_attempts must be >= 1, got {0}")]
    MaxAttemptsTooLow(u32),
    #[error("base_delay must be >= 0, got {0}")]
    NegativeBaseDelay(f64),
    #[error("max_delay ({max}) must be >= base_delay ({base})")]
    MaxDelayBelowBase { max: f64, base: f64 },
    #[error("exponential_base must be >= 1, got {0}")]
    ExponentialBaseTooLow(f64),
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 300.0,
            exponential_base: 2.0,
            jitter: true,
            failure_threshold: 5,
            recovery_timeout_secs: 60.0,
        }
    }
}

impl RetryConfig {
    pub fn new(
        max_attempts: u32,
        base_delay_secs: f64,
        max_delay_secs: f64,
        exponential_base: f64,
        jitter: bool,
        failure_threshold: u32,
        recovery_timeout_secs: f64,
    ) -> Result<Self, RetryConfigError> {
        if max_attempts < 1 {
            return Err(RetryConfigError::MaxAttemptsTooLow(max_attempts));
        }
        if base_delay_secs < 0.0 {
            return Err(RetryConfigError::NegativeBaseDelay(base_delay_secs));
        }
        if max_delay_secs < base_delay_secs {
            return Err(RetryConfigError::MaxDelayBelowBase {
                max: max_delay_secs,
                base: base_delay_secs,
            });
        }
        if exponential_base < 1.0 {
            return Err(RetryConfigError::ExponentialBaseTooLow(exponential_base));
        }
        Ok(Self {
            max_attempts,
            base_delay_secs,
            max_delay_secs,
            exponential_base,
            jitter,
            failure_threshold,
            recovery_timeout_secs,
        })
    }
}

/// Transient per-call-site context handed to a strategy and a handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RetryContext {
    pub operation_name: String,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default)]
    pub operation_context: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub user_config: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl RetryContext {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_video_id(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_operation_context_entry(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.operation_context.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_attempts() {
        assert_eq!(
            RetryConfig::new(0, 1.0, 10.0, 2.0, false, 5, 60.0),
            Err(RetryConfigError::MaxAttemptsTooLow(0))
        );
    }

    #[test]
    fn rejects_max_delay_below_base() {
        assert!(matches!(
            RetryConfig::new(3, 10.0, 5.0, 2.0, false, 5, 60.0),
            Err(RetryConfigError::MaxDelayBelowBase { .. })
        ));
    }

    #[test]
    fn default_is_valid() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_attempts, 3);
        assert!(cfg.jitter);
    }

    #[test]
    fn context_builder_sets_fields() {
        let ctx = RetryContext::new("download").with_video_id("abc").with_job_id("job1");
        assert_eq!(ctx.video_id.as_deref(), Some("abc"));
        assert_eq!(ctx.job_id.as_deref(), Some("job1"));
    }
}
