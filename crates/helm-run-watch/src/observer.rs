//! Public facade over one run observation session.

use std::sync::{Arc, Mutex};

use helm_api::{ApiError, RunsClient, TokenProvider};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::WatchConfig;
use crate::entry::LogEntry;
use crate::poller::poll_worker;
use crate::state::{RunSignal, RunSnapshot, SharedRunState};
use crate::stream::stream_worker;

/// Surfaced in `last_error` when token provisioning fails.
pub const NOT_AUTHENTICATED_ERROR: &str = "Not authenticated";

struct ActiveSession {
    run_id: String,
    state: SharedRunState,
    stream_task: Option<JoinHandle<()>>,
    poll_task: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn teardown(&mut self) {
        self.state.close();
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

/// Observes one agent run at a time: a stream worker and a status poller
/// feed a single-writer state shared with this facade. Each `connect`
/// builds a fresh session object, so callbacks of a torn-down session can
/// never touch a newer one.
pub struct RunObserver {
    runs: RunsClient,
    tokens: Arc<dyn TokenProvider>,
    config: WatchConfig,
    session: Mutex<Option<ActiveSession>>,
}

impl RunObserver {
    pub fn new(runs: RunsClient, tokens: Arc<dyn TokenProvider>, config: WatchConfig) -> Self {
        Self {
            runs,
            tokens,
            config,
            session: Mutex::new(None),
        }
    }

    /// Starts observing `run_id`. Re-entrant: already observing the same
    /// run is a no-op. Any previous session is torn down first; token
    /// failure surfaces `Not authenticated` and starts neither source.
    pub async fn connect(&self, run_id: &str) -> Result<(), ApiError> {
        let state = {
            let mut session = self.session.lock().expect("observer session lock poisoned");
            if let Some(active) = session.as_ref() {
                // Re-entrancy stops at a healthy session; a session whose
                // stream died fatally is rebuilt, making connect the manual
                // retry path.
                if active.run_id == run_id
                    && !active.state.is_stopped()
                    && active.state.last_error().is_none()
                {
                    debug!(run_id = %run_id, "already observing run");
                    return Ok(());
                }
            }
            if let Some(active) = session.as_mut() {
                active.teardown();
            }

            let state = SharedRunState::new(run_id);
            state.apply(RunSignal::Connecting);
            *session = Some(ActiveSession {
                run_id: run_id.to_string(),
                state: state.clone(),
                stream_task: None,
                poll_task: None,
            });
            state
        };

        info!(run_id = %run_id, "starting run observation");
        let token = match self.tokens.bearer_token().await {
            Ok(token) => token,
            Err(error) => {
                state.apply(RunSignal::AuthFailed {
                    message: NOT_AUTHENTICATED_ERROR.to_string(),
                });
                // Closing marks the session dead so a later connect retries.
                state.close();
                debug!(run_id = %run_id, %error, "token provisioning failed");
                return Err(ApiError::NotAuthenticated);
            }
        };

        if state.is_stopped() {
            // disconnect() raced the token fetch; discard the result.
            return Ok(());
        }

        let stream_task = tokio::spawn(stream_worker(
            self.runs.clone(),
            run_id.to_string(),
            token.clone(),
            self.config.clone(),
            state.clone(),
        ));
        let poll_task = tokio::spawn(poll_worker(
            self.runs.clone(),
            run_id.to_string(),
            token,
            self.config.poll_interval,
            state.clone(),
        ));

        let mut session = self.session.lock().expect("observer session lock poisoned");
        match session.as_mut() {
            Some(active) if active.state.ptr_eq(&state) && !state.is_stopped() => {
                active.stream_task = Some(stream_task);
                active.poll_task = Some(poll_task);
            }
            _ => {
                // Session replaced or closed while spawning.
                stream_task.abort();
                poll_task.abort();
            }
        }
        Ok(())
    }

    /// Stops both sources immediately. Logs and the final status stay
    /// readable until the next `connect`. Safe to call repeatedly or when
    /// never connected.
    pub fn disconnect(&self) {
        let mut session = self.session.lock().expect("observer session lock poisoned");
        if let Some(active) = session.as_mut() {
            info!(run_id = %active.run_id, "stopping run observation");
            active.teardown();
        }
    }

    /// Resets the log buffer only; connection state is untouched.
    pub fn clear_logs(&self) {
        let session = self.session.lock().expect("observer session lock poisoned");
        if let Some(active) = session.as_ref() {
            active.state.clear_logs();
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let session = self.session.lock().expect("observer session lock poisoned");
        match session.as_ref() {
            Some(active) => active.state.snapshot(),
            None => RunSnapshot::idle(),
        }
    }

    pub fn run_id(&self) -> Option<String> {
        let session = self.session.lock().expect("observer session lock poisoned");
        session.as_ref().map(|active| active.run_id.clone())
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.snapshot().logs
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot().is_connected()
    }

    pub fn last_error(&self) -> Option<String> {
        self.snapshot().last_error
    }
}

impl Drop for RunObserver {
    fn drop(&mut self) {
        if let Ok(mut session) = self.session.lock() {
            if let Some(active) = session.as_mut() {
                active.teardown();
            }
        }
    }
}
