//! The `ServiceErrorHandler` capability interface consumed by the driver
//! (spec.md §4.2). Concrete implementations live in `yta-handlers` (C2);
//! this crate only declares the contract so C1 has no I/O dependencies.

use async_trait::async_trait;
use yta_models::{ErrorSeverity, RetryContext, RetryReason};

#[async_trait]
pub trait ServiceErrorHandler: Send + Sync {
    /// Attempt service-specific recovery. Returning `true` means the driver
    /// may continue to the next attempt without sleeping.
    async fn handle_error(&self, message: &str, context: &RetryContext) -> bool;

    fn get_recovery_suggestions(&self, message: &str) -> Vec<String>;

    fn should_retry(&self, message: &str, context: &RetryContext) -> bool;

    fn get_error_severity(&self, message: &str, context: &RetryContext) -> ErrorSeverity;

    fn get_retry_reason(&self, message: &str, context: &RetryContext) -> Option<RetryReason>;

    async fn cleanup_after_failure(&self, context: &RetryContext) -> bool;
}
