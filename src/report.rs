//! Read-only view of a configuration-management run report.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;

use crate::error::MetricsError;

/// Anything that can render itself as one line of a report mail.
pub trait LogMessage {
    fn to_report_line(&self) -> String;
}

impl LogMessage for String {
    fn to_report_line(&self) -> String {
        self.clone()
    }
}

impl LogMessage for &str {
    fn to_report_line(&self) -> String {
        (*self).to_string()
    }
}

/// Log severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Err,
    Alert,
    Emerg,
    Crit,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
            LogLevel::Err => "err",
            LogLevel::Alert => "alert",
            LogLevel::Emerg => "emerg",
            LogLevel::Crit => "crit",
        };
        f.write_str(s)
    }
}

/// A single log entry produced during the run.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub source: String,
    pub time: DateTime<FixedOffset>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LogMessage for LogEntry {
    /// `2024-05-01 10:00:00 +0000 /Stage[main]/Ntp/File[/etc/ntp.conf] (notice): content changed`
    fn to_report_line(&self) -> String {
        format!(
            "{} {} ({}): {}",
            self.time.format("%Y-%m-%d %H:%M:%S %z"),
            self.source,
            self.level,
            self.message
        )
    }
}

/// Resource change counters from the report summary.
///
/// A counter is `None` when the summary did not carry it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeMetrics {
    pub out_of_sync: Option<u64>,
    pub changed: Option<u64>,
}

impl ChangeMetrics {
    /// False only when both counters are present and zero.
    pub fn has_changes(&self) -> bool {
        !(self.out_of_sync == Some(0) && self.changed == Some(0))
    }
}

/// The slice of a run report that envmail reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSnapshot {
    pub host: String,
    pub environment: String,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Raw summary mapping, e.g. `{"resources": {"out_of_sync": 0, "changed": 0}}`.
    #[serde(default)]
    pub summary: Option<Value>,
}

impl ReportSnapshot {
    pub fn new(host: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            environment: environment.into(),
            logs: Vec::new(),
            summary: None,
        }
    }

    pub fn with_logs(mut self, logs: Vec<LogEntry>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_summary(mut self, summary: Value) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Extract the `resources` change counters from the summary.
    pub fn change_metrics(&self) -> Result<ChangeMetrics, MetricsError> {
        let summary = self.summary.as_ref().ok_or(MetricsError::Missing)?;
        let summary = summary
            .as_object()
            .ok_or_else(|| MetricsError::Malformed("summary is not a mapping".into()))?;

        let resources = match summary.get("resources") {
            None | Some(Value::Null) => return Ok(ChangeMetrics::default()),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(MetricsError::Malformed("resources is not a mapping".into())),
        };

        let counter = |key: &str| -> Result<Option<u64>, MetricsError> {
            match resources.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => as_count(v)
                    .map(Some)
                    .ok_or_else(|| MetricsError::Malformed(format!("{key} is not a count: {v}"))),
            }
        };

        Ok(ChangeMetrics {
            out_of_sync: counter("out_of_sync")?,
            changed: counter("changed")?,
        })
    }
}

/// A non-negative whole number, whether serialized as `3` or `3.0`.
fn as_count(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}
