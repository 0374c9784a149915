//! Runtime settings for report delivery.
//!
//! These stand in for the configuration-management engine's settings
//! registry and are passed explicitly to the processor and dispatcher.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Name of the environment-to-recipients file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "envmail.conf";

/// Sentinel SMTP server value meaning "SMTP disabled".
pub const SMTP_DISABLED: &str = "none";

/// Locations searched for a sendmail binary when none is configured.
const SENDMAIL_CANDIDATES: &[&str] = &["/usr/sbin/sendmail", "/usr/lib/sendmail"];

/// Which transport the dispatcher will use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Smtp,
    Sendmail,
    Unconfigured,
}

/// Delivery settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding the engine's main config file (and `envmail.conf`).
    pub confdir: PathBuf,
    /// SMTP server host, or [`SMTP_DISABLED`].
    pub smtp_server: String,
    pub smtp_port: u16,
    /// Name announced in EHLO.
    pub smtp_helo: String,
    /// Sendmail command line (program plus optional arguments). Empty disables it.
    pub sendmail: String,
    /// Envelope and `From:` address of report mails.
    pub report_from: String,
}

impl Default for Settings {
    fn default() -> Self {
        let host = local_hostname();
        Self {
            confdir: PathBuf::from("/etc/puppetlabs/puppet"),
            smtp_server: SMTP_DISABLED.to_string(),
            smtp_port: 25,
            smtp_helo: host.clone(),
            sendmail: default_sendmail(),
            report_from: format!("report@{host}"),
        }
    }
}

impl Settings {
    /// Build settings from `ENVMAIL_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Ok(dir) = std::env::var("ENVMAIL_CONFDIR") {
            settings.confdir = PathBuf::from(dir);
        }
        if let Ok(server) = std::env::var("ENVMAIL_SMTP_SERVER") {
            settings.smtp_server = server;
        }
        if let Ok(port) = std::env::var("ENVMAIL_SMTP_PORT") {
            settings.smtp_port = port.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "ENVMAIL_SMTP_PORT".into(),
                message: format!("{port:?}: {e}"),
            })?;
        }
        if let Ok(helo) = std::env::var("ENVMAIL_SMTP_HELO") {
            settings.smtp_helo = helo;
        }
        if let Ok(sendmail) = std::env::var("ENVMAIL_SENDMAIL") {
            settings.sendmail = sendmail;
        }
        if let Ok(from) = std::env::var("ENVMAIL_REPORT_FROM") {
            settings.report_from = from;
        }

        Ok(settings)
    }

    /// Full path of `envmail.conf`.
    pub fn config_path(&self) -> PathBuf {
        self.confdir.join(CONFIG_FILE_NAME)
    }

    /// Transport selection: SMTP wins over sendmail; neither is an error at send time.
    pub fn transport(&self) -> TransportKind {
        if self.smtp_server != SMTP_DISABLED {
            TransportKind::Smtp
        } else if !self.sendmail.trim().is_empty() {
            TransportKind::Sendmail
        } else {
            TransportKind::Unconfigured
        }
    }
}

fn default_sendmail() -> String {
    SENDMAIL_CANDIDATES
        .iter()
        .find(|p| Path::new(p).exists())
        .map(|p| p.to_string())
        .unwrap_or_default()
}

fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}
