//! Single-writer reconciliation of stream and poll signals.
//!
//! Both sources funnel every mutation through `SharedRunState::apply`, so
//! the observed run has exactly one logical writer. The first terminal
//! status from either source wins; everything after it is ignored, and a
//! closed session drops stale in-flight signals on the floor.

use std::sync::{Arc, Mutex};

use helm_api::RunStatus;
use tokio::sync::watch;
use tracing::debug;

use crate::buffer::LogBuffer;
use crate::entry::LogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Transport condition of the push feed.
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Erroring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Observing,
    Terminal,
}

#[derive(Debug)]
struct ObservedRun {
    run_id: String,
    status: Option<RunStatus>,
    logs: LogBuffer,
    connection: ConnectionState,
    last_error: Option<String>,
}

#[derive(Debug, Clone)]
/// Read-only view handed to callers.
pub struct RunSnapshot {
    pub run_id: Option<String>,
    pub status: Option<RunStatus>,
    pub logs: Vec<LogEntry>,
    pub connection: ConnectionState,
    pub last_error: Option<String>,
}

impl RunSnapshot {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(RunStatus::is_terminal)
    }

    /// Snapshot of a controller that has never connected.
    pub(crate) fn idle() -> Self {
        Self {
            run_id: None,
            status: None,
            logs: Vec::new(),
            connection: ConnectionState::Disconnected,
            last_error: None,
        }
    }
}

#[derive(Debug)]
/// Mutation vocabulary fed by the stream worker, the poller, and connect.
pub(crate) enum RunSignal {
    Connecting,
    Connected,
    /// Parsed stream frame; `status` is set for status-kind frames.
    Event {
        entry: LogEntry,
        status: Option<RunStatus>,
    },
    /// Poller report.
    StatusReport { status: RunStatus },
    StreamError { message: String, fatal: bool },
    AuthFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Accepted,
    /// This signal performed the one observing-to-terminal transition.
    ReachedTerminal(RunStatus),
    /// Dropped: the session is closed or already terminal.
    Ignored,
}

#[derive(Debug)]
struct RunStateMachine {
    run: ObservedRun,
    phase: Phase,
    closed: bool,
}

impl RunStateMachine {
    fn new(run_id: &str) -> Self {
        Self {
            run: ObservedRun {
                run_id: run_id.to_string(),
                status: None,
                logs: LogBuffer::new(),
                connection: ConnectionState::Disconnected,
                last_error: None,
            },
            phase: Phase::Idle,
            closed: false,
        }
    }

    fn apply(&mut self, signal: RunSignal) -> Applied {
        if self.closed || self.phase == Phase::Terminal {
            return Applied::Ignored;
        }

        match signal {
            RunSignal::Connecting => {
                self.phase = Phase::Observing;
                self.run.connection = ConnectionState::Connecting;
                Applied::Accepted
            }
            RunSignal::Connected => {
                self.run.connection = ConnectionState::Connected;
                self.run.last_error = None;
                Applied::Accepted
            }
            RunSignal::Event { entry, status } => {
                self.run.logs.append(entry);
                match status {
                    Some(status) => self.record_status(status),
                    None => Applied::Accepted,
                }
            }
            RunSignal::StatusReport { status } => self.record_status(status),
            RunSignal::StreamError { message, fatal } => {
                if fatal {
                    self.run.connection = ConnectionState::Disconnected;
                    self.run.last_error = Some(message);
                } else {
                    self.run.connection = ConnectionState::Erroring;
                }
                Applied::Accepted
            }
            RunSignal::AuthFailed { message } => {
                self.run.connection = ConnectionState::Disconnected;
                self.run.last_error = Some(message);
                Applied::Accepted
            }
        }
    }

    /// Non-terminal statuses are last-write-wins progress. The first
    /// terminal status freezes the run and closes observation.
    fn record_status(&mut self, status: RunStatus) -> Applied {
        self.run.status = Some(status);
        if !status.is_terminal() {
            return Applied::Accepted;
        }
        self.phase = Phase::Terminal;
        self.run.connection = ConnectionState::Disconnected;
        Applied::ReachedTerminal(status)
    }

    fn close(&mut self) {
        self.closed = true;
        self.run.connection = ConnectionState::Disconnected;
    }

    fn clear_logs(&mut self) {
        self.run.logs.clear();
    }

    fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: Some(self.run.run_id.clone()),
            status: self.run.status,
            logs: self.run.logs.snapshot(),
            connection: self.run.connection,
            last_error: self.run.last_error.clone(),
        }
    }
}

#[derive(Clone)]
/// Handle to one session's state: a mutex around the machine as the single
/// update entry point, plus a watch channel that flips to `true` exactly
/// once observation should stop (terminal transition or close).
pub(crate) struct SharedRunState {
    inner: Arc<StateInner>,
}

struct StateInner {
    machine: Mutex<RunStateMachine>,
    stop_tx: watch::Sender<bool>,
}

impl SharedRunState {
    pub(crate) fn new(run_id: &str) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(StateInner {
                machine: Mutex::new(RunStateMachine::new(run_id)),
                stop_tx,
            }),
        }
    }

    pub(crate) fn apply(&self, signal: RunSignal) -> Applied {
        let applied = {
            let mut machine = self.inner.machine.lock().expect("run state lock poisoned");
            machine.apply(signal)
        };
        if let Applied::ReachedTerminal(status) = applied {
            debug!(status = %status, "run observation reached terminal status");
            self.inner.stop_tx.send_replace(true);
        }
        applied
    }

    pub(crate) fn close(&self) {
        {
            let mut machine = self.inner.machine.lock().expect("run state lock poisoned");
            machine.close();
        }
        self.inner.stop_tx.send_replace(true);
    }

    pub(crate) fn clear_logs(&self) {
        let mut machine = self.inner.machine.lock().expect("run state lock poisoned");
        machine.clear_logs();
    }

    pub(crate) fn snapshot(&self) -> RunSnapshot {
        let machine = self.inner.machine.lock().expect("run state lock poisoned");
        machine.snapshot()
    }

    /// True once the session is terminal or closed.
    pub(crate) fn is_stopped(&self) -> bool {
        *self.inner.stop_tx.borrow()
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        let machine = self.inner.machine.lock().expect("run state lock poisoned");
        machine.run.last_error.clone()
    }

    pub(crate) fn stop_signal(&self) -> watch::Receiver<bool> {
        self.inner.stop_tx.subscribe()
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
