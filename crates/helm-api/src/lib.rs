//! Typed HTTP client for the helm dashboard backend.
//!
//! Covers bearer-token provisioning, agent-run status reads, stop requests,
//! and the long-lived run event stream request consumed by `helm-run-watch`.

mod auth;
mod config;
mod error;
mod runs;

pub use auth::{StaticTokenProvider, TokenProvider};
pub use config::ApiConfig;
pub use error::ApiError;
pub use runs::{RunStatus, RunStatusReport, RunsClient, StreamEvent};
