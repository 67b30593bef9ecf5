//! Sync command implementation.

use super::{emit, CliResult, OutputFormat, Service};
use clap::ValueEnum;
use serde::Serialize;
use std::future::Future;
use stockroom_core::SnapshotDiff;
use stockroom_sync_engine::{
    PushReport, RetryConfig, SyncError, SyncOutcome, SyncReport, SyncResult,
};
use tracing::warn;

/// Which side wins a divergent sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Resolution {
    /// Push local records to the remote
    Local,
    /// Replace local records with the remote copy
    Remote,
}

/// Sync result as reported to the user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// `identical`, `divergent` or `unavailable`.
    pub outcome: &'static str,
    /// What differs, for a divergent sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
    /// The direction applied, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<&'static str>,
    /// Push counts for a local-wins resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pushed: Option<PushReport>,
    /// Error message for an unavailable remote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Runs the sync command.
///
/// Without `resolve` nothing is written on either side.
pub async fn run(
    service: &Service,
    format: OutputFormat,
    resolve: Option<Resolution>,
    retry: &RetryConfig,
) -> CliResult<()> {
    let outcome = match retrying(retry, "sync", || service.sync()).await {
        Ok(outcome) => outcome,
        Err(e @ SyncError::Unavailable { .. }) => {
            let summary = SyncSummary {
                outcome: "unavailable",
                report: None,
                resolved: None,
                pushed: None,
                message: Some(e.to_string()),
            };
            emit(format, &summary, print_summary)?;
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let mut summary = SyncSummary {
        outcome: "identical",
        report: None,
        resolved: None,
        pushed: None,
        message: None,
    };

    if let SyncOutcome::Divergent { remote, report } = outcome {
        summary.outcome = "divergent";
        summary.report = Some(report);

        match resolve {
            Some(Resolution::Local) => {
                let pushed = retrying(retry, "resolve-local-wins", || {
                    service.resolve_local_wins()
                })
                .await?;
                summary.resolved = Some("local");
                summary.pushed = Some(pushed);
            }
            Some(Resolution::Remote) => {
                service.resolve_remote_wins(remote).await?;
                summary.resolved = Some("remote");
            }
            None => {}
        }
    }

    emit(format, &summary, print_summary)
}

/// Re-runs `op` while it fails with a retryable error, up to the configured
/// number of attempts. A retried local-wins push resumes where it stopped.
async fn retrying<T, F, Fut>(retry: &RetryConfig, operation: &str, mut op: F) -> SyncResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt + 1 < retry.max_attempts => {
                attempt += 1;
                let delay = retry.delay_for_attempt(attempt);
                warn!(operation, attempt, error = %e, ?delay, "retrying");
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}

fn print_summary(summary: &SyncSummary) {
    match summary.outcome {
        "unavailable" => {
            println!("Remote unavailable");
            if let Some(message) = &summary.message {
                println!("  {}", message);
            }
            return;
        }
        "identical" => {
            println!("Local and remote are identical");
            return;
        }
        _ => println!("Local and remote have diverged"),
    }

    if let Some(report) = &summary.report {
        print_diff("Storage items", &report.storage);
        print_diff("Taken-out items", &report.taken_out);
    }

    match summary.resolved {
        Some("local") => {
            if let Some(pushed) = &summary.pushed {
                println!(
                    "Local wins: pushed {} records ({} already pushed)",
                    pushed.pushed(),
                    pushed.skipped
                );
            }
        }
        Some(_) => println!("Remote wins: local records replaced"),
        None => println!("Re-run with --resolve local or --resolve remote to pick a side"),
    }
}

fn print_diff(label: &str, diff: &SnapshotDiff) {
    if diff.is_identical() {
        println!("{}: identical", label);
        return;
    }
    println!(
        "{}: {} local, {} remote",
        label, diff.local_len, diff.remote_len
    );
    for (what, ids) in [
        ("only local", &diff.only_local),
        ("only remote", &diff.only_remote),
        ("changed", &diff.changed),
        ("duplicate ids", &diff.duplicate_ids),
    ] {
        if !ids.is_empty() {
            let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
            println!("  {}: {}", what, ids.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn quick_retry(attempts: u32) -> RetryConfig {
        RetryConfig::new(attempts)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn retrying_stops_on_success() {
        let calls = AtomicU32::new(0);
        let result = retrying(&quick_retry(5), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SyncError::unavailable("down"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retrying_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: SyncResult<()> = retrying(&quick_retry(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SyncError::unavailable("down")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retrying_skips_non_retryable_errors() {
        let calls = AtomicU32::new(0);
        let result: SyncResult<()> = retrying(&quick_retry(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SyncError::Protocol("bad".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn summary_json_omits_empty_fields() {
        let summary = SyncSummary {
            outcome: "identical",
            report: None,
            resolved: None,
            pushed: None,
            message: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "identical"}));
    }
}
