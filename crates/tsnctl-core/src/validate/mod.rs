// ── Feasibility checks ──
//
// Pure functions over an already-fetched project. Nothing here mutates
// the store; callers validate first and write after.

pub mod cycle;
pub mod gcl;
pub mod stream;

use tracing::debug;

use crate::error::CoreError;

pub use cycle::check_cycle_setting;
pub use gcl::{
    apply_gcl_settings, decode_gcl_settings, encode_gcl_setting, gate_states_to_queue_set,
    queue_set_to_gate_states,
};
pub use stream::{check_stream, transmission_duration};

/// Log a rejection and build the matching error.
fn reject(message: String) -> CoreError {
    debug!(reason = %message, "validation rejected");
    CoreError::bad_request(message)
}

fn reject_infeasible(message: String) -> CoreError {
    debug!(reason = %message, "feasibility check failed");
    CoreError::infeasible(message)
}
