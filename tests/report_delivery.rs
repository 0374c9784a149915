//! End-to-end tests: config file on disk, JSON report in, mail out.
//!
//! Delivery goes through a fake sendmail script so every byte handed to the
//! local MTA can be inspected.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::time::timeout;

use envmail::config::SMTP_DISABLED;
use envmail::{ProcessOutcome, ReportProcessor, ReportSnapshot, Settings};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lay out a confdir holding `envmail.conf` and a fake sendmail logging to `mail.log`.
fn setup(conf: &str) -> (TempDir, Settings, PathBuf) {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("envmail.conf"), conf).unwrap();

    let log = tmp.path().join("mail.log");
    let script = tmp.path().join("sendmail");
    std::fs::write(
        &script,
        format!(
            "#!/bin/sh\necho \"ARGS: $*\" >> '{log}'\ncat >> '{log}'\n",
            log = log.display()
        ),
    )
    .unwrap();

    let settings = Settings {
        confdir: tmp.path().to_path_buf(),
        smtp_server: SMTP_DISABLED.into(),
        smtp_port: 25,
        smtp_helo: "agent.example.com".into(),
        sendmail: format!("/bin/sh {}", script.display()),
        report_from: "puppet@example.com".into(),
    };
    (tmp, settings, log)
}

fn report(environment: &str, out_of_sync: u64, changed: u64) -> ReportSnapshot {
    serde_json::from_value(json!({
        "host": "web01.example.com",
        "environment": environment,
        "logs": [
            {
                "level": "notice",
                "message": "content changed '{md5}aaa' to '{md5}bbb'",
                "source": "/Stage[main]/Ntp/File[/etc/ntp.conf]/content",
                "time": "2024-05-01T10:00:00+00:00",
            },
            {
                "level": "notice",
                "message": "Applied catalog in 1.20 seconds",
                "source": "Puppet",
                "time": "2024-05-01T10:00:01+00:00",
            }
        ],
        "summary": {"resources": {"out_of_sync": out_of_sync, "changed": changed}},
    }))
    .unwrap()
}

/// Process a report and wait out any delivery. `None` means mail was dispatched.
async fn run(settings: Settings, report: &ReportSnapshot) -> Option<ProcessOutcome> {
    match ReportProcessor::new(settings).process(report).await.unwrap() {
        ProcessOutcome::Dispatched(task) => {
            timeout(TEST_TIMEOUT, task.wait()).await.expect("delivery hung");
            None
        }
        other => Some(other),
    }
}

fn read_log(log: &Path) -> String {
    std::fs::read_to_string(log).unwrap_or_default()
}

#[tokio::test]
async fn subscribed_environment_gets_mail() {
    let (_tmp, settings, log) = setup(
        "# who hears about what\n\
         production: ops@example.com, oncall@example.com\n\
         development: devs@example.com\n",
    );

    assert!(run(settings, &report("production", 1, 1)).await.is_none());

    assert_eq!(
        read_log(&log),
        "ARGS: ops@example.com oncall@example.com\n\
         From: puppet@example.com\n\
         Subject: Puppet Report for web01.example.com\n\
         To: ops@example.com, oncall@example.com\n\
         \n\
         2024-05-01 10:00:00 +0000 /Stage[main]/Ntp/File[/etc/ntp.conf]/content (notice): content changed '{md5}aaa' to '{md5}bbb'\n\
         2024-05-01 10:00:01 +0000 Puppet (notice): Applied catalog in 1.20 seconds\n"
    );
}

#[tokio::test]
async fn each_subscription_line_is_a_separate_mail() {
    let (_tmp, settings, log) = setup(
        "development: a@example.com\n\
         development: b@example.com, c@example.com\n",
    );

    assert!(run(settings, &report("development", 0, 2)).await.is_none());

    let logged = read_log(&log);
    let args: Vec<_> = logged.lines().filter(|l| l.starts_with("ARGS:")).collect();
    assert_eq!(
        args,
        vec!["ARGS: a@example.com", "ARGS: b@example.com c@example.com"]
    );
}

#[tokio::test]
async fn unchanged_run_sends_nothing() {
    let (_tmp, settings, log) = setup("production: ops@example.com\n");

    let outcome = run(settings, &report("production", 0, 0)).await;

    assert!(matches!(outcome, Some(ProcessOutcome::NoChanges)));
    assert!(read_log(&log).is_empty());
}

#[tokio::test]
async fn other_environment_sends_nothing() {
    let (_tmp, settings, log) = setup("production: ops@example.com\n");

    let outcome = run(settings, &report("staging", 3, 3)).await;

    assert!(matches!(outcome, Some(ProcessOutcome::NothingToSend)));
    assert!(read_log(&log).is_empty());
}

#[tokio::test]
async fn missing_config_file_is_skipped() {
    let (tmp, settings, log) = setup("production: ops@example.com\n");
    std::fs::remove_file(tmp.path().join("envmail.conf")).unwrap();

    let outcome = run(settings, &report("production", 1, 1)).await;

    assert!(matches!(outcome, Some(ProcessOutcome::MissingConfig(_))));
    assert!(read_log(&log).is_empty());
}

#[tokio::test]
async fn broken_config_fails_before_sending() {
    let (_tmp, settings, log) = setup("production ops@example.com\n");

    let result = ReportProcessor::new(settings)
        .process(&report("production", 1, 1))
        .await;

    assert!(result.is_err());
    assert!(read_log(&log).is_empty());
}
