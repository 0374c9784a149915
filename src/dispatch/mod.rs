//! Report mail delivery.
//!
//! The dispatcher renders each [`Delivery`] as a plain-text mail and hands
//! the batch to one transport:
//!
//! - **SMTP** when an SMTP server is configured: one session for every mail
//! - **sendmail** otherwise: one process per mail, recipients as arguments
//!
//! Delivery runs on a detached task. The caller never sees the outcome;
//! failures are logged from inside the task and end it.

pub mod sendmail;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{Settings, TransportKind};
use crate::error::DeliveryError;
use crate::matcher::Delivery;

pub use sendmail::SendmailMailer;
pub use smtp::SmtpMailer;

/// Headers shared by every mail of one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub from: String,
    pub subject: String,
}

impl MessageHeader {
    /// Header for a report produced on `host`.
    pub fn for_report(from: impl Into<String>, host: &str) -> Self {
        Self {
            from: from.into(),
            subject: format!("Puppet Report for {host}"),
        }
    }

    /// Header block including the terminating blank line.
    ///
    /// `Date` is written only when a timestamp is supplied.
    pub fn render(&self, recipients: &[String], date: Option<DateTime<Local>>) -> String {
        let mut out = format!(
            "From: {}\nSubject: {}\nTo: {}\n",
            self.from,
            self.subject,
            recipients.join(", ")
        );
        if let Some(date) = date {
            out.push_str(&format!("Date: {}\n", date.to_rfc2822()));
        }
        out.push('\n');
        out
    }
}

/// Full message text: header block, then the body.
pub fn render_message(
    header: &MessageHeader,
    delivery: &Delivery,
    date: Option<DateTime<Local>>,
) -> String {
    let mut out = header.render(&delivery.recipients, date);
    out.push_str(&delivery.body);
    out.push('\n');
    out
}

/// A way of getting a batch of report mails out of the machine.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Send every delivery, strictly in order. Stops at the first failure.
    async fn send_all(
        &self,
        header: &MessageHeader,
        deliveries: &[Delivery],
    ) -> Result<(), DeliveryError>;
}

/// Chooses a transport and runs deliveries.
#[derive(Clone)]
pub struct Dispatcher {
    settings: Settings,
    transport: Option<Arc<dyn MailTransport>>,
}

impl Dispatcher {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            transport: None,
        }
    }

    /// Use `transport` instead of the one the settings would select.
    pub fn with_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    fn select_transport(&self) -> Result<Arc<dyn MailTransport>, DeliveryError> {
        if let Some(transport) = &self.transport {
            return Ok(Arc::clone(transport));
        }
        match self.settings.transport() {
            TransportKind::Smtp => Ok(Arc::new(SmtpMailer::from_settings(&self.settings))),
            TransportKind::Sendmail => Ok(Arc::new(SendmailMailer::from_settings(&self.settings))),
            TransportKind::Unconfigured => Err(DeliveryError::Unconfigured),
        }
    }

    /// Deliver the report mails for `host` and wait for the transport to finish.
    pub async fn send(&self, host: &str, deliveries: &[Delivery]) -> Result<(), DeliveryError> {
        let transport = self.select_transport()?;
        let header = MessageHeader::for_report(self.settings.report_from.clone(), host);

        debug!(
            transport = transport.name(),
            count = deliveries.len(),
            "Sending envmail report"
        );
        transport.send_all(&header, deliveries).await?;
        info!(
            transport = transport.name(),
            count = deliveries.len(),
            host,
            "Sent envmail report"
        );
        Ok(())
    }

    /// Run [`Dispatcher::send`] on a detached task.
    ///
    /// The returned handle may be dropped; the task keeps running.
    pub fn spawn(&self, host: String, deliveries: Vec<Delivery>) -> DeliveryTask {
        let dispatcher = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = dispatcher.send(&host, &deliveries).await {
                error!(error = %e, detail = ?e, host = %host, "{e}");
            }
        });
        DeliveryTask { handle }
    }
}

/// Handle to a detached delivery task.
///
/// Carries no result. Dropping it leaves the task running.
#[derive(Debug)]
pub struct DeliveryTask {
    handle: JoinHandle<()>,
}

impl DeliveryTask {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the task is done, for hosts that exit right after processing.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "envmail delivery task ended abnormally");
        }
    }
}
