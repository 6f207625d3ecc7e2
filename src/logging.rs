//! Logging: global tracing setup plus the per-query log capture.
//!
//! The global subscriber writes to stderr and to a rolling file sink
//! with a bounded file count. Query-scoped records additionally land in
//! a process-wide index keyed by query UUID so they can be returned in
//! the TRAPI response `logs` block.

use crate::config::RuntimeConfig;
use crate::model::LogEntry;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Initialize the global tracing subscriber.
///
/// Returns the non-blocking writer guard; the caller must hold it for
/// the lifetime of the process or buffered records are lost on exit.
pub fn init(runtime: &RuntimeConfig) -> anyhow::Result<WorkerGuard> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("semsim_kp")
        .filename_suffix("log")
        .max_log_files(runtime.log_max_files)
        .build(&runtime.log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create rolling log appender: {}", e))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::new(runtime.log_level.clone()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to init tracing subscriber: {}", e))?;

    Ok(guard)
}

/// Process-wide per-query log index.
///
/// Entries tagged with a query id are captured here in arrival order and
/// forwarded to the tracing sinks; untagged messages are forwarded only.
/// Safe for concurrent append-and-read across request tasks.
#[derive(Debug, Default)]
pub struct QueryLog {
    entries: Mutex<HashMap<Uuid, Vec<LogEntry>>>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&self, query_id: Option<Uuid>, message: &str) {
        tracing::debug!("{}", message);
        self.capture(query_id, "DEBUG", message);
    }

    pub fn info(&self, query_id: Option<Uuid>, message: &str) {
        tracing::info!("{}", message);
        self.capture(query_id, "INFO", message);
    }

    pub fn warning(&self, query_id: Option<Uuid>, message: &str) {
        tracing::warn!("{}", message);
        self.capture(query_id, "WARNING", message);
    }

    pub fn error(&self, query_id: Option<Uuid>, message: &str) {
        tracing::error!("{}", message);
        self.capture(query_id, "ERROR", message);
    }

    fn capture(&self, query_id: Option<Uuid>, level: &str, message: &str) {
        let Some(query_id) = query_id else {
            return;
        };
        let entry = LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: Some(level.to_string()),
            code: None,
            message: message.to_string(),
        };
        let mut entries = self.entries.lock().expect("query log mutex poisoned");
        entries.entry(query_id).or_default().push(entry);
    }

    /// Accumulated entries for one query, in capture order.
    pub fn get_logs(&self, query_id: Uuid) -> Vec<LogEntry> {
        let entries = self.entries.lock().expect("query log mutex poisoned");
        entries.get(&query_id).cloned().unwrap_or_default()
    }

    /// Remove and return the entries for one query. Called when the
    /// response is emitted so the index does not grow without bound.
    pub fn take_logs(&self, query_id: Uuid) -> Vec<LogEntry> {
        let mut entries = self.entries.lock().expect("query log mutex poisoned");
        entries.remove(&query_id).unwrap_or_default()
    }
}
