// ── Cycle setting types ──

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::limits::CYCLE_TIME_DENOMINATOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum SlotTrafficType {
    BestEffort,
    TimeSync,
    Cyclic,
    #[serde(rename = "NA")]
    #[strum(serialize = "N/A")]
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub index: u32,
    pub traffic_type: SlotTrafficType,
    /// Slot length in ns. Must be 0 for N/A slots.
    pub period: u64,
}

/// Fixed-point cycle time: `numerator / denominator` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCycleTime {
    pub numerator: u64,
    pub denominator: u64,
}

impl AdminCycleTime {
    pub fn from_nanoseconds(ns: u64) -> Self {
        Self {
            numerator: ns,
            denominator: CYCLE_TIME_DENOMINATOR,
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn to_microseconds(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64 * 1_000_000.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminBaseTime {
    pub seconds: u64,
    #[serde(default)]
    pub fractional_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSetting {
    #[serde(default)]
    pub admin_base_time: AdminBaseTime,
    pub admin_cycle_time: AdminCycleTime,
    pub time_slots: Vec<TimeSlot>,
}

impl Default for CycleSetting {
    /// 1 ms cycle: 900 µs best effort, 100 µs time sync.
    fn default() -> Self {
        Self {
            admin_base_time: AdminBaseTime::default(),
            admin_cycle_time: AdminCycleTime::from_nanoseconds(1_000_000),
            time_slots: vec![
                TimeSlot {
                    index: 0,
                    traffic_type: SlotTrafficType::BestEffort,
                    period: 900_000,
                },
                TimeSlot {
                    index: 1,
                    traffic_type: SlotTrafficType::TimeSync,
                    period: 100_000,
                },
            ],
        }
    }
}
