//! The `ExecuteWithRetry` driver (spec.md §4.1): interleaves strategy
//! decisions with an optional service-specific recovery hook, tracking
//! active operations for introspection.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use yta_models::{ErrorSeverity, RetryContext};

use crate::handler::ServiceErrorHandler;
use crate::reason::{determine_retry_reason, ReasonHints};
use crate::reporter::ErrorReporter;
use crate::strategies::RetryStrategy;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ActiveRecovery {
    pub function_name: String,
    pub context: RetryContext,
    pub started_at: DateTime<Utc>,
    pub attempts: u32,
}

/// An error surfaced by the driver along with its classified reason hints,
/// used both for the error reporter and for the optional service handler.
pub trait RecoverableError: std::fmt::Display + Send + Sync + 'static {
    fn reason_hints(&self) -> ReasonHints {
        ReasonHints::default()
    }

    fn exception_type(&self) -> &'static str {
        "Error"
    }
}

pub struct ErrorRecoveryManager {
    strategy: Arc<dyn RetryStrategy>,
    reporter: Arc<dyn ErrorReporter>,
    handler: Option<Arc<dyn ServiceErrorHandler>>,
    active: Mutex<HashMap<String, ActiveRecovery>>,
}

impl ErrorRecoveryManager {
    pub fn new(
        strategy: Arc<dyn RetryStrategy>,
        reporter: Arc<dyn ErrorReporter>,
        handler: Option<Arc<dyn ServiceErrorHandler>>,
    ) -> Self {
        Self {
            strategy,
            reporter,
            handler,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn active_recoveries(&self) -> HashMap<String, ActiveRecovery> {
        self.active.lock().unwrap().clone()
    }

    /// Drive `operation` under the bound strategy until success or budget
    /// exhaustion. `function_name` is purely descriptive (introspection).
    pub async fn execute_with_retry<F, Fut, T, E>(
        &self,
        function_name: &str,
        mut context: RetryContext,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RecoverableError,
    {
        let operation_id = uuid::Uuid::new_v4().to_string();
        let max_attempts = self.strategy.config().max_attempts;

        {
            let mut active = self.active.lock().unwrap();
            active.insert(
                operation_id.clone(),
                ActiveRecovery {
                    function_name: function_name.to_string(),
                    context: context.clone(),
                    started_at: Utc::now(),
                    attempts: 0,
                },
            );
        }

        let result = self
            .run_loop(function_name, &mut context, &mut operation, &operation_id, max_attempts)
            .await;

        self.active.lock().unwrap().remove(&operation_id);
        result
    }

    async fn run_loop<F, Fut, T, E>(
        &self,
        function_name: &str,
        context: &mut RetryContext,
        operation: &mut F,
        operation_id: &str,
        max_attempts: u32,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RecoverableError,
    {
        let mut last_error: Option<E> = None;

        for attempt in 0..max_attempts {
            {
                let mut active = self.active.lock().unwrap();
                if let Some(entry) = active.get_mut(operation_id) {
                    entry.attempts = attempt + 1;
                }
            }
            context.attempt_count = attempt + 1;

            match operation().await {
                Ok(value) => {
                    self.strategy.record_attempt(true, None);
                    return Ok(value);
                }
                Err(err) => {
                    let message = err.to_string();
                    let reason = determine_retry_reason(&message, err.reason_hints());
                    self.strategy.record_attempt(false, Some(reason));

                    if !self.strategy.should_retry(attempt, reason) {
                        last_error = Some(err);
                        break;
                    }

                    if let Some(handler) = &self.handler {
                        if handler.handle_error(&message, context).await {
                            tracing::info!(
                                function = function_name,
                                attempt,
                                "service handler recovered, continuing without sleep"
                            );
                            last_error = Some(err);
                            continue;
                        }
                    }

                    if attempt < max_attempts - 1 {
                        let delay = self.strategy.get_delay(attempt, reason);
                        tracing::info!(
                            function = function_name,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying after failure"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        let err = last_error.expect("loop always records an error before exiting without success");
        let ctx_clone = context.clone();
        let message = err.to_string();
        let exception_type = err.exception_type();
        let _ = self
            .reporter
            .report_error(&message, exception_type, ErrorSeverity::High, ctx_clone)
            .await;
        Err(err)
    }
}
