//! Error types for envmail.

/// Errors loading settings or the `envmail.conf` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid envmail config file: line {line}: {content:?}")]
    Format { line: usize, content: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems reading the change metrics out of a report summary.
///
/// Never fatal: the processor treats these as an empty metrics mapping.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Report has no summary")]
    Missing,

    #[error("Malformed report summary: {0}")]
    Malformed(String),
}

/// Mail transport failures. Only ever raised inside the delivery task.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Could not send report emails through smtp: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Could not send report emails via sendmail: {0}")]
    Sendmail(#[from] std::io::Error),

    #[error("Could not send report emails via sendmail: {program} exited with {status}")]
    SendmailStatus {
        program: String,
        status: std::process::ExitStatus,
    },

    #[error("Invalid email address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("SMTP server is unset and could not find sendmail")]
    Unconfigured,

    #[error("Delivery worker did not complete: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Any envmail failure, for callers that handle them uniformly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

pub type Result<T> = std::result::Result<T, Error>;
