//! SMTP transport.
//!
//! Opens a single plain SMTP session with lettre's `SmtpConnection` and
//! pushes every mail through it before quitting. The session is blocking,
//! so it runs on the blocking pool.

use async_trait::async_trait;
use chrono::Local;
use lettre::address::{Address, Envelope};
use lettre::transport::smtp::client::SmtpConnection;
use lettre::transport::smtp::extension::ClientId;
use tracing::debug;

use super::{MailTransport, MessageHeader, render_message};
use crate::config::Settings;
use crate::error::DeliveryError;
use crate::matcher::Delivery;

/// Sends report mails over one SMTP session.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    server: String,
    port: u16,
    helo: String,
}

impl SmtpMailer {
    pub fn new(server: impl Into<String>, port: u16, helo: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port,
            helo: helo.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.smtp_server.clone(),
            settings.smtp_port,
            settings.smtp_helo.clone(),
        )
    }

    /// Blocking session: connect, send each mail, quit.
    fn send_blocking(
        &self,
        header: &MessageHeader,
        deliveries: &[Delivery],
    ) -> Result<(), DeliveryError> {
        let sender = parse_address(&header.from)?;
        let envelopes = deliveries
            .iter()
            .map(|d| {
                let to = d
                    .recipients
                    .iter()
                    .map(|r| parse_address(r))
                    .collect::<Result<Vec<_>, _>>()?;
                Envelope::new(Some(sender.clone()), to).map_err(|e| {
                    DeliveryError::InvalidAddress {
                        address: d.recipients.join(", "),
                        reason: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut conn = SmtpConnection::connect(
            (self.server.as_str(), self.port),
            None,
            &ClientId::Domain(self.helo.clone()),
            None,
            None,
        )?;

        for (delivery, envelope) in deliveries.iter().zip(&envelopes) {
            let message = render_message(header, delivery, Some(Local::now()));
            let response = conn.send(envelope, to_crlf(&message).as_bytes())?;
            debug!(
                recipients = %delivery.recipients.join(", "),
                code = %response.code(),
                "SMTP accepted report mail"
            );
        }

        conn.quit()?;
        Ok(())
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send_all(
        &self,
        header: &MessageHeader,
        deliveries: &[Delivery],
    ) -> Result<(), DeliveryError> {
        let mailer = self.clone();
        let header = header.clone();
        let deliveries = deliveries.to_vec();
        tokio::task::spawn_blocking(move || mailer.send_blocking(&header, &deliveries)).await?
    }
}

fn parse_address(address: &str) -> Result<Address, DeliveryError> {
    address
        .parse::<Address>()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// SMTP DATA lines must end in CRLF.
fn to_crlf(text: &str) -> String {
    text.lines().map(|l| format!("{l}\r\n")).collect()
}
