// ── Gate control list codec ──
//
// Users edit per-port slot lists in µs with 3-decimal precision; devices
// take an admin control list in ns with gate-state bytes.

use std::collections::{BTreeMap, BTreeSet};

use super::reject;
use crate::error::CoreError;
use crate::limits::{GATE_TIME_MAX_US, GATE_TIME_MIN_US, QUEUE_MAX};
use crate::model::gcl::SET_GATE_STATES;
use crate::model::{
    AdminControl, AdminCycleTime, Device, DeviceProfile, DeviceTimeSlot, DeviceTimeSlotSetting,
    GateParameters, GclTable, InterfaceGateParameters, PortTimeSlotEntry, Project,
};

// ── Queue sets ──────────────────────────────────────────────────────

pub fn queue_set_to_gate_states(queues: &BTreeSet<u8>) -> Result<u8, CoreError> {
    queues.iter().try_fold(0u8, |gates, &queue| {
        if queue > QUEUE_MAX {
            Err(CoreError::Internal(format!(
                "queue {queue} does not fit a gate-state byte"
            )))
        } else {
            Ok(gates | (1u8 << queue))
        }
    })
}

pub fn gate_states_to_queue_set(gates: u8) -> BTreeSet<u8> {
    (0..=QUEUE_MAX).filter(|&q| gates & (1u8 << q) != 0).collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn ns_to_us(ns: u64) -> f64 {
    round3(ns as f64 / 1000.0)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
fn us_to_ns(us: f64) -> u64 {
    (us * 1000.0).round() as u64
}

fn in_gate_range(us: f64) -> bool {
    (GATE_TIME_MIN_US..=GATE_TIME_MAX_US).contains(&us)
}

// ── Decode ──────────────────────────────────────────────────────────

fn decode_table(device: &Device, table: &GclTable) -> DeviceTimeSlotSetting {
    let mut ports: Vec<&InterfaceGateParameters> = table.interfaces.iter().collect();
    ports.sort_by_key(|p| p.interface_id);

    let port_list = ports
        .into_iter()
        .map(|port| {
            let params = &port.gate_parameters;
            PortTimeSlotEntry {
                port_id: port.interface_id,
                port_name: device
                    .interface(port.interface_id)
                    .map(|i| i.name.clone())
                    .unwrap_or_default(),
                active: params.gate_enabled,
                cycle_time: round3(params.admin_cycle_time.to_microseconds()),
                gate_control_list: params
                    .admin_control_list
                    .iter()
                    .map(|entry| DeviceTimeSlot {
                        slot_id: entry.index,
                        interval: ns_to_us(entry.time_interval_value),
                        queue_set: gate_states_to_queue_set(entry.gate_states_value),
                    })
                    .collect(),
            }
        })
        .collect();

    DeviceTimeSlotSetting {
        device_id: device.id,
        device_name: device.name.clone(),
        port_list,
    }
}

/// Per-port GCL view of every gate-capable device in the project.
///
/// Devices without a configured table fall back to their profile's
/// default GCL, then to an empty port list.
pub fn decode_gcl_settings(
    project: &Project,
    profiles: &BTreeMap<i64, DeviceProfile>,
) -> Vec<DeviceTimeSlotSetting> {
    project
        .devices
        .values()
        .filter(|d| d.device_type.has_gate_control())
        .map(|device| {
            let fallback = profiles
                .get(&device.device_profile_id)
                .and_then(|p| p.default_gcl.as_ref());
            match project.device_config.gcl_tables.get(&device.id).or(fallback) {
                Some(table) => decode_table(device, table),
                None => decode_table(device, &GclTable::empty(device.id)),
            }
        })
        .collect()
}

// ── Encode ──────────────────────────────────────────────────────────

pub fn encode_gcl_setting(setting: &DeviceTimeSlotSetting) -> Result<GclTable, CoreError> {
    let device_id = setting.device_id;
    let mut interfaces = Vec::with_capacity(setting.port_list.len());

    for port in &setting.port_list {
        if !in_gate_range(port.cycle_time) {
            return Err(reject(format!(
                "cycle time of device id {device_id} out of range: {}",
                port.cycle_time
            )));
        }

        let mut admin_control_list = Vec::with_capacity(port.gate_control_list.len());
        for slot in &port.gate_control_list {
            if !in_gate_range(slot.interval) {
                return Err(reject(format!(
                    "interval of device id {device_id} out of range: {}",
                    slot.interval
                )));
            }
            admin_control_list.push(AdminControl {
                index: slot.slot_id,
                operation_name: SET_GATE_STATES.to_owned(),
                gate_states_value: queue_set_to_gate_states(&slot.queue_set)?,
                time_interval_value: us_to_ns(slot.interval),
            });
        }

        interfaces.push(InterfaceGateParameters {
            interface_id: port.port_id,
            gate_parameters: GateParameters {
                gate_enabled: port.active,
                admin_cycle_time: AdminCycleTime::from_nanoseconds(us_to_ns(port.cycle_time)),
                admin_control_list,
            },
        });
    }

    Ok(GclTable {
        device_id,
        interfaces,
    })
}

/// Encode `settings` into the project's device config.
pub fn apply_gcl_settings(
    project: &mut Project,
    settings: &[DeviceTimeSlotSetting],
) -> Result<(), CoreError> {
    if settings.is_empty() {
        return Err(reject("Device GCL setting list is empty".to_owned()));
    }

    let mut encoded = Vec::with_capacity(settings.len());
    for setting in settings {
        let device = project
            .devices
            .get(&setting.device_id)
            .ok_or_else(|| CoreError::not_found("Device", setting.device_id))?;
        if !device.device_type.has_gate_control() {
            return Err(reject(format!(
                "Device {} does not support gate control",
                device.name
            )));
        }
        encoded.push(encode_gcl_setting(setting)?);
    }

    for table in encoded {
        project.device_config.gcl_tables.insert(table.device_id, table);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::fixtures::project;
    use pretty_assertions::assert_eq;

    fn setting(cycle_time: f64, intervals: &[(f64, Vec<u8>)]) -> DeviceTimeSlotSetting {
        DeviceTimeSlotSetting {
            device_id: 2,
            device_name: String::new(),
            port_list: vec![PortTimeSlotEntry {
                port_id: 1,
                port_name: String::new(),
                active: true,
                cycle_time,
                gate_control_list: intervals
                    .iter()
                    .enumerate()
                    .map(|(i, (interval, queues))| DeviceTimeSlot {
                        slot_id: u32::try_from(i).unwrap(),
                        interval: *interval,
                        queue_set: queues.iter().copied().collect(),
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn queue_seven_is_high_bit() {
        let gates = queue_set_to_gate_states(&BTreeSet::from([7])).unwrap();
        assert_eq!(gates, 0b1000_0000);
        assert_eq!(gate_states_to_queue_set(0b1000_0001), BTreeSet::from([0, 7]));
    }

    #[test]
    fn queue_above_seven_is_internal() {
        let err = queue_set_to_gate_states(&BTreeSet::from([8])).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn encode_converts_microseconds() {
        let table = encode_gcl_setting(&setting(1000.0, &[(900.5, vec![0, 1]), (99.5, vec![7])])).unwrap();
        let params = &table.interfaces[0].gate_parameters;
        assert_eq!(params.admin_cycle_time.numerator, 1_000_000);
        assert_eq!(params.admin_cycle_time.denominator, 1_000_000_000);
        assert_eq!(params.admin_control_list[0].time_interval_value, 900_500);
        assert_eq!(params.admin_control_list[0].gate_states_value, 0b0000_0011);
        assert_eq!(params.admin_control_list[1].operation_name, "set-gate-states");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = encode_gcl_setting(&setting(1_000_000.0, &[])).unwrap_err();
        assert_eq!(err.to_string(), "cycle time of device id 2 out of range: 1000000");

        let err = encode_gcl_setting(&setting(1000.0, &[(0.0, vec![0])])).unwrap_err();
        assert_eq!(err.to_string(), "interval of device id 2 out of range: 0");
    }

    #[test]
    fn decode_reverses_encode_and_names_ports() {
        let mut p = project();
        apply_gcl_settings(&mut p, &[setting(1000.0, &[(900.123, vec![0]), (99.877, vec![7])])]).unwrap();

        let decoded = decode_gcl_settings(&p, &BTreeMap::new());
        // Only the switch carries a GCL
        assert_eq!(decoded.len(), 1);
        let port = &decoded[0].port_list[0];
        assert_eq!(port.port_name, "eth1");
        assert_eq!(port.cycle_time, 1000.0);
        assert_eq!(port.gate_control_list[0].interval, 900.123);
        assert_eq!(port.gate_control_list[1].queue_set, BTreeSet::from([7]));
    }

    #[test]
    fn slot_ids_survive_encode_and_decode() {
        let mut input = setting(1000.0, &[(400.0, vec![0]), (600.0, vec![5])]);
        for (slot, id) in input.port_list[0].gate_control_list.iter_mut().zip([5, 9]) {
            slot.slot_id = id;
        }
        let table = encode_gcl_setting(&input).unwrap();
        let indexes: Vec<u32> = table.interfaces[0]
            .gate_parameters
            .admin_control_list
            .iter()
            .map(|c| c.index)
            .collect();
        assert_eq!(indexes, vec![5, 9]);

        let mut p = project();
        apply_gcl_settings(&mut p, &[input]).unwrap();
        let decoded = decode_gcl_settings(&p, &BTreeMap::new());
        let slot_ids: Vec<u32> = decoded[0].port_list[0]
            .gate_control_list
            .iter()
            .map(|s| s.slot_id)
            .collect();
        assert_eq!(slot_ids, vec![5, 9]);
    }

    #[test]
    fn decode_falls_back_to_profile_default() {
        let mut p = project();
        p.devices.get_mut(&2).unwrap().device_profile_id = 9;
        let default = encode_gcl_setting(&setting(500.0, &[(500.0, vec![0])])).unwrap();
        let profiles = BTreeMap::from([(
            9,
            DeviceProfile {
                id: 9,
                model_name: "TSN-G5008".into(),
                default_gcl: Some(default),
            },
        )]);

        let decoded = decode_gcl_settings(&p, &profiles);
        assert_eq!(decoded[0].port_list[0].cycle_time, 500.0);
    }

    #[test]
    fn empty_setting_list_is_rejected() {
        let mut p = project();
        let err = apply_gcl_settings(&mut p, &[]).unwrap_err();
        assert_eq!(err.to_string(), "Device GCL setting list is empty");
    }

    #[test]
    fn end_stations_have_no_gcl() {
        let mut p = project();
        let mut s = setting(1000.0, &[]);
        s.device_id = 1;
        let err = apply_gcl_settings(&mut p, &[s]).unwrap_err();
        assert!(err.is_bad_request());
    }
}
