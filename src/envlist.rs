//! `envmail.conf` parsing.
//!
//! Each meaningful line maps one environment to a comma-separated list of
//! recipients:
//!
//! ```text
//! # comment
//! development: devs@example.com, leads@example.com
//! uat: uat@example.com   # trailing comments are ignored
//! ```
//!
//! Blank lines and `#` comment lines are skipped. Any other line that does
//! not fit the `<environment>: <address>[, <address>...]` shape fails the
//! whole file.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;

static COMMENT_OR_BLANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(#.*)?$").unwrap());

static ENTRY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*([^:\s][^:]*?)\s*:\s*(.+)$").unwrap());

static ADDRESS_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,\s*").unwrap());

/// One environment subscription line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    /// Recipients in file order. Never empty.
    pub recipients: Vec<String>,
    pub environment: String,
}

impl ConfigEntry {
    pub fn new(environment: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            recipients,
            environment: environment.into(),
        }
    }
}

/// Parse the full text of an `envmail.conf` file.
///
/// Entries come back in file order; repeated environments are kept as
/// separate entries.
pub fn parse(text: &str) -> Result<Vec<ConfigEntry>, ConfigError> {
    let mut entries = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        if COMMENT_OR_BLANK.is_match(raw) {
            continue;
        }

        let format_error = || ConfigError::Format {
            line: idx + 1,
            content: raw.to_string(),
        };

        let caps = ENTRY.captures(raw).ok_or_else(format_error)?;
        let environment = caps[1].to_string();
        let recipients = split_addresses(&caps[2]).ok_or_else(format_error)?;

        entries.push(ConfigEntry {
            recipients,
            environment,
        });
    }

    Ok(entries)
}

/// Split an address list, dropping any inline `#` comment first.
///
/// `None` when any item is empty (`a,,b`, `a,`, or nothing at all).
fn split_addresses(list: &str) -> Option<Vec<String>> {
    let list = match list.find('#') {
        Some(pos) => &list[..pos],
        None => list,
    };

    ADDRESS_SEPARATOR
        .split(list.trim())
        .map(|a| (!a.is_empty()).then(|| a.to_string()))
        .collect()
}
