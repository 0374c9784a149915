//! Matching config entries against the current report.

use tracing::info;

use crate::envlist::ConfigEntry;
use crate::report::LogMessage;

/// One mail to send: who gets it and the rendered log body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipients: Vec<String>,
    pub body: String,
}

/// Build one delivery per entry subscribed to `current_env`.
///
/// Environment names compare exactly. When the run produced no log lines a
/// matching entry is skipped with an informational log instead.
pub fn match_deliveries<M: LogMessage>(
    entries: &[ConfigEntry],
    current_env: &str,
    logs: &[M],
) -> Vec<Delivery> {
    let mut deliveries = Vec::new();

    for entry in entries.iter().filter(|e| e.environment == current_env) {
        if logs.is_empty() {
            info!(
                recipients = %entry.recipients.join(","),
                "No messages to report to {}",
                entry.recipients.join(",")
            );
            continue;
        }

        let body = logs
            .iter()
            .map(LogMessage::to_report_line)
            .collect::<Vec<_>>()
            .join("\n");

        deliveries.push(Delivery {
            recipients: entry.recipients.clone(),
            body,
        });
    }

    deliveries
}
