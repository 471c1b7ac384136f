// ── Cycle setting check ──

use super::reject;
use crate::error::CoreError;
use crate::limits::{PERIOD_MAX, PERIOD_MIN};
use crate::model::{CycleSetting, SlotTrafficType};

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn micros(ns: u64) -> f64 {
    ns as f64 / 1000.0
}

/// Validate a cycle setting for the named project.
///
/// Slots are walked in declared order. There must be exactly one
/// BestEffort and one TimeSync slot, N/A slots only at the tail, and the
/// period sum must equal the admin cycle time numerator.
pub fn check_cycle_setting(project_name: &str, setting: &CycleSetting) -> Result<(), CoreError> {
    if setting.admin_base_time.seconds != 0 {
        return Err(reject(format!(
            "Project ({project_name}) - The admin base time {} should be zero in the current version",
            setting.admin_base_time.seconds
        )));
    }

    let mut sum: u64 = 0;
    let mut best_effort_found = false;
    let mut time_sync_found = false;
    let mut na_found = false;

    for slot in &setting.time_slots {
        if na_found && slot.traffic_type != SlotTrafficType::NotApplicable {
            return Err(reject(format!(
                "Project ({project_name}) - The N/A time slot shouldn't be put in front of others"
            )));
        }

        match slot.traffic_type {
            SlotTrafficType::BestEffort => {
                if best_effort_found {
                    return Err(reject(format!(
                        "Project ({project_name}) - There should be just one Best Effort time slot in the system"
                    )));
                }
                check_period(project_name, "Best Effort", slot.period)?;
                best_effort_found = true;
            }
            SlotTrafficType::TimeSync => {
                if time_sync_found {
                    return Err(reject(format!(
                        "Project ({project_name}) - There should be just one Time Sync time slot in the system"
                    )));
                }
                check_period(project_name, "Time Sync", slot.period)?;
                time_sync_found = true;
            }
            SlotTrafficType::Cyclic => check_period(project_name, "Cyclic", slot.period)?,
            SlotTrafficType::NotApplicable => {
                if slot.period != 0 {
                    return Err(reject(format!(
                        "Project ({project_name}) - The period in N/A should be 0 ns"
                    )));
                }
                na_found = true;
            }
        }

        sum = sum.saturating_add(slot.period);
    }

    if sum > PERIOD_MAX {
        return Err(reject(format!(
            "Project ({project_name}) - Cycle Time {:.3} should be less than {:.3} µs",
            micros(sum),
            micros(PERIOD_MAX)
        )));
    }

    if sum != setting.admin_cycle_time.numerator {
        return Err(reject(format!(
            "Project ({project_name}) - Cycle Time {:.3} should be equal to admin cycle time {:.3}",
            micros(sum),
            micros(setting.admin_cycle_time.numerator)
        )));
    }

    if !best_effort_found {
        return Err(reject(format!(
            "Project ({project_name}) - There should be just one Best Effort time slot in the system"
        )));
    }
    if !time_sync_found {
        return Err(reject(format!(
            "Project ({project_name}) - There should be just one Time Sync time slot in the system"
        )));
    }

    Ok(())
}

fn check_period(project_name: &str, label: &str, period: u64) -> Result<(), CoreError> {
    if (PERIOD_MIN..=PERIOD_MAX).contains(&period) {
        Ok(())
    } else {
        Err(reject(format!(
            "Project ({project_name}) - The period in the {label} should be {PERIOD_MIN} ~ {PERIOD_MAX} ns"
        )))
    }
}
