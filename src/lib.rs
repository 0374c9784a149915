//! envmail — per-environment email notifications for configuration-management run reports.

pub mod config;
pub mod dispatch;
pub mod envlist;
pub mod error;
pub mod matcher;
pub mod processor;
pub mod report;

#[cfg(test)]
mod test_support;

pub use config::Settings;
pub use dispatch::{DeliveryTask, Dispatcher, MailTransport};
pub use envlist::ConfigEntry;
pub use error::{Error, Result};
pub use matcher::Delivery;
pub use processor::{ProcessOutcome, ReportProcessor};
pub use report::{LogEntry, LogMessage, ReportSnapshot};
