// ── Protocol-wide bounds ──
//
// Inclusive ranges shared by the feasibility checks. Times are in
// nanoseconds unless the name says otherwise.

pub const STRING_LENGTH_MIN: usize = 1;
pub const STRING_LENGTH_MAX: usize = 64;

pub const VLAN_MIN: u16 = 2;
pub const VLAN_MAX: u16 = 4094;
pub const VLAN_INIT_PVID: u16 = 1;

pub const PERIOD_MIN: u64 = 1;
pub const PERIOD_MAX: u64 = 999_999_999;

pub const INTERVAL_MIN: u64 = 30_000;
pub const INTERVAL_MAX: u64 = 999_999_999;

pub const FRAME_PER_INTERVAL_MIN: u32 = 1;
pub const FRAME_PER_INTERVAL_MAX: u32 = 65_535;

pub const FRAME_SIZE_MIN: u32 = 46;
pub const FRAME_SIZE_MAX: u32 = 1500;

pub const JITTER_MIN: u64 = 0;
pub const JITTER_MAX: u64 = 999_999_999;

pub const TIME_AWARE_MIN: u64 = 0;
pub const TIME_AWARE_MAX: u64 = 999_999_999;

pub const LATENCY_MIN: u64 = 1000;
pub const LATENCY_MAX: u64 = 999_999_999;

pub const RECEIVE_OFFSET_MIN: f64 = 1.0;
pub const RECEIVE_OFFSET_MAX: f64 = 999_999.999;

/// Gate interval and cycle time bounds, in microseconds.
pub const GATE_TIME_MIN_US: f64 = 0.001;
pub const GATE_TIME_MAX_US: f64 = 999_999.999;

/// Denominator of an admin cycle time expressed in seconds.
pub const CYCLE_TIME_DENOMINATOR: u64 = 1_000_000_000;

/// Largest queue index a gate-state byte can address.
pub const QUEUE_MAX: u8 = 7;

/// Link speed multiplier from Mbit/s to bit/s, applied twice.
pub const TRANSFER_RATE: u64 = 1000;
