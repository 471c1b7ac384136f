// ── Gate control list types ──
//
// Two shapes of the same 802.1Qbv schedule: the admin form stored in
// DeviceConfig (ns, gate-state bytes) and the per-port form exchanged with
// users (µs with 3 decimals, queue sets).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::cycle::AdminCycleTime;
use super::ids::{DeviceId, InterfaceId};

pub const SET_GATE_STATES: &str = "set-gate-states";

// ── Admin form ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminControl {
    pub index: u32,
    pub operation_name: String,
    /// Bit `n` set means queue `n` is open.
    pub gate_states_value: u8,
    /// Slot length in ns.
    pub time_interval_value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateParameters {
    pub gate_enabled: bool,
    pub admin_cycle_time: AdminCycleTime,
    pub admin_control_list: Vec<AdminControl>,
}

impl GateParameters {
    pub fn admin_control_list_length(&self) -> usize {
        self.admin_control_list.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceGateParameters {
    pub interface_id: InterfaceId,
    pub gate_parameters: GateParameters,
}

/// Per-device GCL table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GclTable {
    pub device_id: DeviceId,
    #[serde(default)]
    pub interfaces: Vec<InterfaceGateParameters>,
}

impl GclTable {
    pub fn empty(device_id: DeviceId) -> Self {
        Self {
            device_id,
            interfaces: Vec::new(),
        }
    }
}

// ── User form ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTimeSlot {
    pub slot_id: u32,
    /// Slot length in µs.
    pub interval: f64,
    pub queue_set: BTreeSet<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortTimeSlotEntry {
    pub port_id: InterfaceId,
    #[serde(default)]
    pub port_name: String,
    pub active: bool,
    /// Cycle time in µs.
    pub cycle_time: f64,
    pub gate_control_list: Vec<DeviceTimeSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTimeSlotSetting {
    pub device_id: DeviceId,
    #[serde(default)]
    pub device_name: String,
    pub port_list: Vec<PortTimeSlotEntry>,
}
