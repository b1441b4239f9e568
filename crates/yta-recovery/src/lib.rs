//! C1: error-recovery core. Pure retry-reason classification, jitter,
//! retry strategies, the `ExecuteWithRetry` driver, and the error reporter.
//! No I/O dependencies beyond the reporter's own log file and the driver's
//! sleep — no HTTP client, no filesystem layout knowledge of other crates.

pub mod driver;
pub mod handler;
pub mod jitter;
pub mod reason;
pub mod reporter;
pub mod strategies;

pub use driver::{ActiveRecovery, ErrorRecoveryManager, RecoverableError};
pub use handler::ServiceErrorHandler;
pub use jitter::apply_jitter;
pub use reason::{determine_retry_reason, ReasonHints};
pub use reporter::{BasicErrorReporter, ErrorReporter, ReporterError};
pub use strategies::{
    shared, AdaptiveStrategy, CircuitBreakerStrategy, CircuitState, ExponentialBackoffStrategy,
    FixedDelayStrategy, RetryStrategy, StrategyCounters,
};
