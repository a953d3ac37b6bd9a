//! Pull-based status resync, active only while the run is non-terminal.

use std::time::Duration;

use helm_api::RunsClient;
use tokio::time::sleep;
use tracing::debug;

use crate::state::{Applied, RunSignal, SharedRunState};

/// Fetches the run status once per interval and applies it to the shared
/// state. Poll failures are never fatal; the next tick retries. The loop
/// ends when the state turns terminal or the session closes.
pub(crate) async fn poll_worker(
    runs: RunsClient,
    run_id: String,
    token: String,
    interval: Duration,
    state: SharedRunState,
) {
    let mut stop_rx = state.stop_signal();

    loop {
        tokio::select! {
            _ = stop_rx.changed() => return,
            _ = sleep(interval) => {}
        }
        if state.is_stopped() {
            return;
        }

        match runs.fetch_status(&run_id, &token).await {
            Ok(report) => {
                if let Some(message) = &report.error_message {
                    debug!(run_id = %run_id, %message, "run reported an execution error");
                }
                match state.apply(RunSignal::StatusReport {
                    status: report.status,
                }) {
                    Applied::ReachedTerminal(status) => {
                        debug!(run_id = %run_id, %status, "status poll observed terminal state");
                        return;
                    }
                    Applied::Ignored => return,
                    Applied::Accepted => {}
                }
            }
            // Best-effort resync; the stream remains the primary source.
            Err(error) => {
                debug!(run_id = %run_id, %error, "status poll failed, retrying next tick");
            }
        }
    }
}
