//! `tsnctl gcl`: per-port gate control lists of a project file.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tabled::Tabled;
use tsnctl_core::model::PortTimeSlotEntry;
use tsnctl_core::validate::decode_gcl_settings;

use crate::cli::{GlobalOpts, ProjectArgs};
use crate::commands::load_project;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Active")]
    active: bool,
    #[tabled(rename = "Cycle (µs)")]
    cycle_time: String,
    #[tabled(rename = "Slots")]
    slots: String,
}

/// One line per slot: `#<id> <interval>µs q<queues>`.
fn describe_slots(port: &PortTimeSlotEntry) -> String {
    let mut out = String::new();
    for slot in &port.gate_control_list {
        let queues: Vec<String> = slot.queue_set.iter().map(ToString::to_string).collect();
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(
            out,
            "#{} {:.3}µs q{{{}}}",
            slot.slot_id,
            slot.interval,
            queues.join(",")
        );
    }
    out
}

pub fn handle(args: &ProjectArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let project = load_project(&args.project)?;
    // Profiles live in the running service; an offline file has none.
    let settings = decode_gcl_settings(&project, &BTreeMap::new());

    let rendered = output::render(global.output, &settings, || {
        settings
            .iter()
            .flat_map(|device| {
                device.port_list.iter().map(move |port| PortRow {
                    device: device.device_name.clone(),
                    port: port.port_name.clone(),
                    active: port.active,
                    cycle_time: format!("{:.3}", port.cycle_time),
                    slots: describe_slots(port),
                })
            })
            .collect()
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
