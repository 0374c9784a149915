//! Local MTA transport.
//!
//! Each delivery gets its own sendmail process with the recipients passed as
//! arguments, since recipient lists cannot be mixed within one invocation.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{MailTransport, MessageHeader, render_message};
use crate::config::Settings;
use crate::error::DeliveryError;
use crate::matcher::Delivery;

/// Pipes report mails into a sendmail-compatible command.
#[derive(Debug, Clone)]
pub struct SendmailMailer {
    program: String,
    args: Vec<String>,
}

impl SendmailMailer {
    /// `command` is the program optionally followed by fixed arguments,
    /// e.g. `/usr/sbin/sendmail -oi`.
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.sendmail)
    }

    async fn send_one(
        &self,
        header: &MessageHeader,
        delivery: &Delivery,
    ) -> Result<(), DeliveryError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(&delivery.recipients)
            .stdin(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("sendmail stdin was not captured"))?;
        stdin
            .write_all(render_message(header, delivery, None).as_bytes())
            .await?;
        stdin.shutdown().await?;
        drop(stdin);

        let status = child.wait().await?;
        if !status.success() {
            return Err(DeliveryError::SendmailStatus {
                program: self.program.clone(),
                status,
            });
        }

        debug!(
            program = %self.program,
            recipients = %delivery.recipients.join(", "),
            "sendmail accepted report mail"
        );
        Ok(())
    }
}

#[async_trait]
impl MailTransport for SendmailMailer {
    fn name(&self) -> &str {
        "sendmail"
    }

    async fn send_all(
        &self,
        header: &MessageHeader,
        deliveries: &[Delivery],
    ) -> Result<(), DeliveryError> {
        for delivery in deliveries {
            self.send_one(header, delivery).await?;
        }
        Ok(())
    }
}
