//! Push-feed worker: opens the run event stream, parses frames, and feeds
//! the shared state until a terminal status, a fatal failure, or close.

use chrono::Utc;
use futures_util::StreamExt;
use helm_api::{RunsClient, StreamEvent};
use reqwest::StatusCode;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::WatchConfig;
use crate::entry::{LogEntry, LogKind};
use crate::observer::NOT_AUTHENTICATED_ERROR;
use crate::reconnect::ReconnectPolicy;
use crate::state::{Applied, RunSignal, SharedRunState};

/// Surfaced in `last_error` once the reconnect budget is spent.
pub const CONNECTION_LOST_ERROR: &str = "Connection lost";

enum FeedError {
    /// Credential rejected; retrying cannot succeed without a new token.
    Auth,
    Transport(String),
}

enum FeedOutcome {
    /// Terminal status delivered, or the session stopped underneath us.
    Finished,
    Dropped(String),
}

enum LineStep {
    Continue,
    Finished,
}

pub(crate) async fn stream_worker(
    runs: RunsClient,
    run_id: String,
    token: String,
    config: WatchConfig,
    state: SharedRunState,
) {
    let mut stop_rx = state.stop_signal();
    let mut policy = ReconnectPolicy::new(config.max_reconnect_attempts, config.reconnect_backoff);

    loop {
        if state.is_stopped() {
            return;
        }
        state.apply(RunSignal::Connecting);

        let drop_reason = match open_feed(&runs, &run_id, &token).await {
            Ok(response) => {
                state.apply(RunSignal::Connected);
                match consume_feed(response, &state, &mut policy, &mut stop_rx).await {
                    FeedOutcome::Finished => return,
                    FeedOutcome::Dropped(reason) => reason,
                }
            }
            Err(FeedError::Auth) => {
                warn!(run_id = %run_id, "stream credential rejected");
                state.apply(RunSignal::AuthFailed {
                    message: NOT_AUTHENTICATED_ERROR.to_string(),
                });
                return;
            }
            Err(FeedError::Transport(reason)) => reason,
        };

        debug!(run_id = %run_id, reason = %drop_reason, "run event feed dropped");
        state.apply(RunSignal::StreamError {
            message: drop_reason,
            fatal: false,
        });

        match policy.next_delay() {
            Some(delay) => {
                let stopped = tokio::select! {
                    _ = stop_rx.changed() => true,
                    _ = sleep(delay) => false,
                };
                if stopped {
                    return;
                }
            }
            None => {
                warn!(
                    run_id = %run_id,
                    attempts = policy.attempts(),
                    "giving up on run event feed"
                );
                state.apply(RunSignal::StreamError {
                    message: CONNECTION_LOST_ERROR.to_string(),
                    fatal: true,
                });
                return;
            }
        }
    }
}

async fn open_feed(
    runs: &RunsClient,
    run_id: &str,
    token: &str,
) -> Result<reqwest::Response, FeedError> {
    let response = runs
        .stream_request(run_id, token)
        .send()
        .await
        .map_err(|error| FeedError::Transport(format!("stream connect failed: {error}")))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FeedError::Auth);
    }
    if !status.is_success() {
        return Err(FeedError::Transport(format!(
            "stream endpoint returned status {}",
            status.as_u16()
        )));
    }
    Ok(response)
}

async fn consume_feed(
    response: reqwest::Response,
    state: &SharedRunState,
    policy: &mut ReconnectPolicy,
    stop_rx: &mut watch::Receiver<bool>,
) -> FeedOutcome {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    loop {
        let next = tokio::select! {
            _ = stop_rx.changed() => return FeedOutcome::Finished,
            next = stream.next() => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(error)) => {
                return FeedOutcome::Dropped(format!("stream read failed: {error}"));
            }
            None => {
                let trailing = buffer.trim();
                if !trailing.is_empty() {
                    if let LineStep::Finished = handle_frame(trailing, state, policy) {
                        return FeedOutcome::Finished;
                    }
                }
                return FeedOutcome::Dropped("stream closed before a terminal status".to_string());
            }
        };

        let Ok(fragment) = std::str::from_utf8(chunk.as_ref()) else {
            warn!("dropping non-UTF-8 stream chunk");
            continue;
        };
        buffer.push_str(fragment);

        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim().to_string();
            buffer.drain(..=pos);
            if line.is_empty() {
                continue;
            }
            if let LineStep::Finished = handle_frame(&line, state, policy) {
                return FeedOutcome::Finished;
            }
        }
    }
}

/// Applies one SSE line. Malformed frames are dropped without closing the
/// feed; a status frame with a terminal value is appended and reported in
/// the same reconciliation step, after which the feed self-closes.
fn handle_frame(line: &str, state: &SharedRunState, policy: &mut ReconnectPolicy) -> LineStep {
    let Some(data) = line.strip_prefix("data:") else {
        // SSE comments and event/id fields are not used by this feed.
        return LineStep::Continue;
    };
    let data = data.trim();
    if data.is_empty() {
        return LineStep::Continue;
    }

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => {
            policy.record_success();
            let entry = LogEntry::from_event(&event, Utc::now());
            let status = match entry.kind {
                LogKind::Status => event.status,
                _ => None,
            };
            match state.apply(RunSignal::Event { entry, status }) {
                Applied::ReachedTerminal(_) | Applied::Ignored => LineStep::Finished,
                Applied::Accepted => LineStep::Continue,
            }
        }
        Err(error) => {
            warn!(%error, "dropping malformed stream frame");
            LineStep::Continue
        }
    }
}
