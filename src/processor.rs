//! Report processing: load subscriptions, check for changes, match, dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Settings;
use crate::dispatch::{DeliveryTask, Dispatcher, MailTransport};
use crate::envlist;
use crate::error::{ConfigError, Result};
use crate::matcher::match_deliveries;
use crate::report::{ChangeMetrics, ReportSnapshot};

/// What happened to one report.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// No `envmail.conf` at the given path; nothing was done.
    MissingConfig(PathBuf),
    /// The run changed nothing, so no mail goes out.
    NoChanges,
    /// No subscriber wanted this report, or it had no log lines.
    NothingToSend,
    /// Deliveries were handed to a detached task.
    Dispatched(DeliveryTask),
}

/// Turns run reports into subscriber mails.
#[derive(Clone)]
pub struct ReportProcessor {
    settings: Settings,
    dispatcher: Dispatcher,
}

impl ReportProcessor {
    pub fn new(settings: Settings) -> Self {
        let dispatcher = Dispatcher::new(settings.clone());
        Self {
            settings,
            dispatcher,
        }
    }

    /// Send through `transport` instead of SMTP/sendmail.
    pub fn with_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.dispatcher = self.dispatcher.with_transport(transport);
        self
    }

    /// Process one report.
    ///
    /// Config read and parse failures are returned. Delivery failures are
    /// not: they stay inside the spawned task.
    pub async fn process(&self, report: &ReportSnapshot) -> Result<ProcessOutcome> {
        let path = self.settings.config_path();
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "Cannot send envmail report; no envmail.conf file {}",
                    path.display()
                );
                return Ok(ProcessOutcome::MissingConfig(path));
            }
            Err(e) => return Err(ConfigError::from(e).into()),
        };

        let entries = envlist::parse(&text)?;

        let metrics = report.change_metrics().unwrap_or_else(|e| {
            debug!(error = %e, "Treating report metrics as empty");
            ChangeMetrics::default()
        });
        if !metrics.has_changes() {
            info!(host = %report.host, "Not sending envmail report; no changes");
            return Ok(ProcessOutcome::NoChanges);
        }

        let deliveries = match_deliveries(&entries, &report.environment, &report.logs);
        if deliveries.is_empty() {
            debug!(environment = %report.environment, "No envmail subscribers to notify");
            return Ok(ProcessOutcome::NothingToSend);
        }

        info!(
            environment = %report.environment,
            host = %report.host,
            mails = deliveries.len(),
            "Dispatching envmail report"
        );
        let task = self.dispatcher.spawn(report.host.clone(), deliveries);
        Ok(ProcessOutcome::Dispatched(task))
    }
}
