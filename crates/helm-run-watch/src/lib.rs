//! Run observation subsystem for the helm dashboard.
//!
//! Watches one server-executed agent run to completion by merging the
//! push-based event stream with a pull-based status poll. The stream is the
//! primary source; the poller resynchronizes when frames go missing; a
//! single-writer state machine reconciles both into one snapshot and
//! applies a first-terminal-wins transition that stops both sources.

mod buffer;
mod config;
mod entry;
mod observer;
mod poller;
mod query;
mod reconnect;
mod state;
mod stream;

pub use buffer::LogBuffer;
pub use config::WatchConfig;
pub use entry::{LogEntry, LogKind};
pub use observer::{RunObserver, NOT_AUTHENTICATED_ERROR};
pub use query::RunStatusQuery;
pub use state::{ConnectionState, RunSnapshot};
pub use stream::CONNECTION_LOST_ERROR;
