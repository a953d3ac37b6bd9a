use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_RECONNECT_BACKOFF_MS: u64 = 3_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
/// Tuning knobs for one run observation session.
pub struct WatchConfig {
    /// Cadence of the pull-based status resync.
    pub poll_interval: Duration,
    /// Fixed delay between stream reconnect attempts.
    pub reconnect_backoff: Duration,
    /// Connect attempts tolerated without an intervening parsed frame.
    pub max_reconnect_attempts: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            reconnect_backoff: Duration::from_millis(DEFAULT_RECONNECT_BACKOFF_MS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}
