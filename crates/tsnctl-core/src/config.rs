// ── Runtime core configuration ──
//
// Tuning knobs for the service object. The config crate builds this from
// TOML and environment; core itself never touches disk.

use std::time::Duration;

/// Undo/redo depth kept per project.
pub const HISTORY_LIMIT: usize = 16;

/// Token pool size; the listener cap is three connections per token.
pub const TOKEN_MAX_SIZE: usize = 10;

/// Runtime configuration for a [`Controller`](crate::Controller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Maximum undo entries per project. Oldest entries are discarded.
    pub history_limit: usize,
    /// Job status poll cadence. Also bounds how long a stop request waits
    /// before the worker notices it.
    pub poll_interval: Duration,
    /// Maximum number of registered listener connections.
    pub max_listeners: usize,
    /// Per-listener outbound queue depth.
    pub listener_queue: usize,
    /// Command channel depth between callers and the processor task.
    pub command_channel_size: usize,
    /// Pending transaction snapshots above this count log a warning.
    pub transaction_warn_size: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_LIMIT,
            poll_interval: Duration::from_secs(1),
            max_listeners: TOKEN_MAX_SIZE * 3,
            listener_queue: 256,
            command_channel_size: 64,
            transaction_warn_size: 100,
        }
    }
}
