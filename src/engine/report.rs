//! Error Reporting
//!
//! Tick failures are turned into [`ErrorReport`]s and delivered in the
//! background. Delivery never blocks the frame loop; pending deliveries are
//! drained with a timeout on shutdown.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Serialize, Deserialize};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Project the engine is running
    pub project_id: String,
    /// Error message and its causes, outermost first
    pub error_trace: String,
    /// When the failure was caught
    pub reported_at: DateTime<Utc>,
}

impl ErrorReport {
    /// Build a report from an error and its source chain.
    pub fn from_error(project_id: &str, err: &(dyn StdError + 'static)) -> Self {
        let mut error_trace = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            error_trace.push_str("\ncaused by: ");
            error_trace.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            project_id: project_id.to_string(),
            error_trace,
            reported_at: Utc::now(),
        }
    }
}

/// Transport for error reports.
pub trait ReportSink: Send + Sync {
    /// Deliver one report.
    fn deliver(&self, report: ErrorReport) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// Writes reports to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn deliver(&self, report: ErrorReport) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            let json = serde_json::to_string(&report)?;
            warn!(report = %json, "Error report");
            Ok(())
        })
    }
}

/// Fire-and-forget report delivery.
pub struct ErrorReporter {
    project_id: String,
    sink: Arc<dyn ReportSink>,
    pending: JoinSet<()>,
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("project_id", &self.project_id)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl ErrorReporter {
    /// Reporter delivering to `sink`.
    pub fn new(project_id: impl Into<String>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            project_id: project_id.into(),
            sink,
            pending: JoinSet::new(),
        }
    }

    /// Reporter that logs reports.
    pub fn tracing(project_id: impl Into<String>) -> Self {
        Self::new(project_id, Arc::new(TracingSink))
    }

    /// Start delivering a report for `err`. Must be called inside a tokio
    /// runtime.
    pub fn report(&mut self, err: &(dyn StdError + 'static)) {
        self.reap();
        let report = ErrorReport::from_error(&self.project_id, err);
        let delivery = self.sink.deliver(report);
        self.pending.spawn(async move {
            if let Err(err) = delivery.await {
                error!(error = %err, "Failed to deliver error report");
            }
        });
    }

    /// Deliveries still running.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    // Drop finished deliveries
    fn reap(&mut self) {
        while let Some(result) = self.pending.try_join_next() {
            if let Err(err) = result {
                error!(error = %err, "Error report task failed");
            }
        }
    }

    /// Wait up to `timeout` for pending deliveries, then abort the rest.
    ///
    /// Returns how many were aborted.
    pub async fn drain(&mut self, timeout: Duration) -> usize {
        let waited = tokio::time::timeout(timeout, async {
            while let Some(result) = self.pending.join_next().await {
                if let Err(err) = result {
                    error!(error = %err, "Error report task failed");
                }
            }
        })
        .await;

        if waited.is_ok() {
            debug!("Error reports drained");
            return 0;
        }
        let aborted = self.pending.len();
        warn!(aborted, "Timed out draining error reports");
        self.pending.shutdown().await;
        aborted
    }
}
