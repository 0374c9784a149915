use std::io::Read;

use anyhow::Context;

use envmail::{ProcessOutcome, ReportProcessor, ReportSnapshot, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Report JSON comes from the first argument, or stdin when absent or "-".
    let raw = match std::env::args().nth(1).filter(|a| a != "-") {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read report {path}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read report from stdin")?;
            buf
        }
    };

    let report: ReportSnapshot =
        serde_json::from_str(&raw).context("Failed to parse report JSON")?;
    let settings = Settings::from_env().context("Invalid envmail settings")?;

    let processor = ReportProcessor::new(settings);
    let outcome = processor
        .process(&report)
        .await
        .context("envmail report processing failed")?;

    // The process exits once main returns, so keep it alive for delivery.
    if let ProcessOutcome::Dispatched(task) = outcome {
        task.wait().await;
    }

    Ok(())
}
