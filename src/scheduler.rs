// src/scheduler.rs
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::pipeline::Pipeline;

/// Drive `pipeline` every `period` until `shutdown` becomes true (or its sender is dropped).
///
/// Each run is awaited inside the loop, so a slow run delays the next tick instead of
/// overlapping it. Returns the number of runs started.
pub async fn run_scheduler(
    pipeline: &Pipeline,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs: u64 = 0;

    tracing::info!(interval_secs = period.as_secs(), "starting news relay scheduler");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                runs += 1;
                match pipeline.run_once_with_shutdown(&shutdown).await {
                    Ok(report) => tracing::debug!(
                        run = runs,
                        delivered = report.delivered(),
                        stop = report.stop.as_str(),
                        "scheduled run complete"
                    ),
                    Err(e) => {
                        tracing::error!(error = %e, run = runs, "error processing articles");
                        pipeline.notify_failure(&e).await;
                    }
                }
            }
        }
    }

    tracing::info!(runs, "scheduler stopped");
    runs
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
