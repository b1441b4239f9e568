//! Error reporter (spec.md §4.1.2): generates diagnostics for a failure,
//! appends it to a daily log file, and retains a bounded in-memory history.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use yta_models::{ErrorReport, ErrorSeverity, ErrorSummary, ErrorSummaryEntry, RetryContext};

const MAX_HISTORY: usize = 100;

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("io error writing error report: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report_error(
        &self,
        message: &str,
        exception_type: &str,
        severity: ErrorSeverity,
        context: RetryContext,
    ) -> ErrorReport;

    fn error_summary(&self, hours: u32) -> ErrorSummary;
}

pub struct BasicErrorReporter {
    reports_dir: PathBuf,
    history: Mutex<VecDeque<ErrorReport>>,
    sequence: AtomicU32,
}

impl BasicErrorReporter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            history: Mutex::new(VecDeque::with_capacity(MAX_HISTORY)),
            sequence: AtomicU32::new(0),
        }
    }

    fn generate_id(&self, message: &str) -> String {
        let now = Utc::now();
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        message.hash(&mut hasher);
        let hash = (hasher.finish() % 10_000) as u32;
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "ERR_{}_{:04}_{}",
            now.format("%Y%m%d_%H%M%S"),
            hash,
            seq
        )
    }

    fn generate_suggestions(message: &str, exception_type: &str) -> Vec<String> {
        let lower = message.to_lowercase();
        let mut suggestions = Vec::new();

        if lower.contains("network") || lower.contains("connection") {
            suggestions.extend([
                "Check internet connection".to_string(),
                "Verify proxy settings if using a proxy".to_string(),
                "Try again in a few minutes".to_string(),
            ]);
        }
        if lower.contains("timeout") {
            suggestions.push("Increase timeout settings".to_string());
            suggestions.push("Check network stability".to_string());
        }
        if lower.contains("permission") || lower.contains("access") {
            suggestions.push("Check file/directory permissions".to_string());
            suggestions.push("Verify path exists and is accessible".to_string());
        }

        if suggestions.is_empty() {
            match exception_type {
                "ValueError" | "InvalidRequest" => suggestions.extend([
                    "Check input parameters and data format".to_string(),
                    "Verify configuration settings".to_string(),
                    "Review error message for specific details".to_string(),
                ]),
                "ConnectionError" => suggestions.extend([
                    "Check network connectivity".to_string(),
                    "Verify service endpoints are accessible".to_string(),
                ]),
                _ => suggestions.extend([
                    "Review error details and logs".to_string(),
                    "Try the operation again".to_string(),
                    "Check system resources and configuration".to_string(),
                ]),
            }
        }

        suggestions.truncate(5);
        suggestions
    }

    fn is_recovery_possible(message: &str) -> bool {
        const NON_RECOVERABLE: [&str; 5] = [
            "video unavailable",
            "private video",
            "deleted",
            "copyright",
            "authentication failed",
        ];
        let lower = message.to_lowercase();
        !NON_RECOVERABLE.iter().any(|pattern| lower.contains(pattern))
    }

    fn should_retry(message: &str) -> bool {
        if !Self::is_recovery_possible(message) {
            return false;
        }
        const RETRY_PATTERNS: [&str; 5] =
            ["timeout", "temporary", "rate limit", "connection", "server error"];
        let lower = message.to_lowercase();
        RETRY_PATTERNS.iter().any(|pattern| lower.contains(pattern))
    }

    async fn save_report(&self, report: &ErrorReport) -> Result<(), ReporterError> {
        tokio::fs::create_dir_all(&self.reports_dir).await?;
        let date_str = report.timestamp.format("%Y-%m-%d").to_string();
        let log_file = self.reports_dir.join(format!("{date_str}.log"));

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .await?;
        let mut line = serde_json::to_string(report)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl ErrorReporter for BasicErrorReporter {
    async fn report_error(
        &self,
        message: &str,
        exception_type: &str,
        severity: ErrorSeverity,
        context: RetryContext,
    ) -> ErrorReport {
        let id = self.generate_id(message);
        let truncated: String = message.chars().take(100).collect();
        let title = format!("{}: {}", exception_type, truncated);

        let report = ErrorReport {
            id,
            timestamp: Utc::now(),
            severity,
            title,
            message: message.to_string(),
            exception_type: exception_type.to_string(),
            context,
            suggested_actions: Self::generate_suggestions(message, exception_type),
            recovery_possible: Self::is_recovery_possible(message),
            retry_recommended: Self::should_retry(message),
        };

        {
            let mut history = self.history.lock().unwrap();
            if history.len() >= MAX_HISTORY {
                history.pop_front();
            }
            history.push_back(report.clone());
        }

        if let Err(e) = self.save_report(&report).await {
            tracing::warn!(error = %e, "failed to persist error report");
        }

        tracing::event!(
            match report.severity {
                ErrorSeverity::Critical => tracing::Level::ERROR,
                ErrorSeverity::High => tracing::Level::WARN,
                _ => tracing::Level::INFO,
            },
            id = %report.id,
            title = %report.title,
            "error reported"
        );

        report
    }

    fn error_summary(&self, hours: u32) -> ErrorSummary {
        let cutoff = Utc::now() - chrono::Duration::hours(hours as i64);
        let history = self.history.lock().unwrap();
        let recent: Vec<&ErrorReport> = history.iter().filter(|r| r.timestamp > cutoff).collect();

        let mut severity_breakdown: HashMap<String, usize> = HashMap::new();
        for sev in [
            ErrorSeverity::Critical,
            ErrorSeverity::High,
            ErrorSeverity::Medium,
            ErrorSeverity::Low,
            ErrorSeverity::Info,
        ] {
            let count = recent.iter().filter(|r| r.severity == sev).count();
            severity_breakdown.insert(sev.as_str().to_string(), count);
        }

        let recent_errors = recent
            .iter()
            .rev()
            .take(10)
            .rev()
            .map(|r| ErrorSummaryEntry {
                id: r.id.clone(),
                severity: r.severity,
                title: r.title.clone(),
                timestamp: r.timestamp,
            })
            .collect();

        ErrorSummary {
            time_range_hours: hours,
            total_errors: recent.len(),
            severity_breakdown,
            recent_errors,
        }
    }
}
