// ── Stream admission check ──
//
// Field bounds, talker/listener resolution, transmission window
// feasibility and pairwise conflicts against the rest of the project.

use super::{reject, reject_infeasible};
use crate::error::CoreError;
use crate::limits::{
    FRAME_PER_INTERVAL_MAX, FRAME_PER_INTERVAL_MIN, FRAME_SIZE_MAX, FRAME_SIZE_MIN, INTERVAL_MAX,
    INTERVAL_MIN, JITTER_MAX, JITTER_MIN, LATENCY_MAX, LATENCY_MIN, RECEIVE_OFFSET_MAX,
    RECEIVE_OFFSET_MIN, STRING_LENGTH_MAX, STRING_LENGTH_MIN, TIME_AWARE_MAX, TIME_AWARE_MIN,
};
use crate::model::{
    Device, EndStationInterface, Interface, MacAddress, Project, QosType, Stream,
    StreamTrafficType,
};

/// Time in ns to put `payload_bits` on a link of `bandwidth` bit/s,
/// rounded up.
pub fn transmission_duration(payload_bits: u64, bandwidth: u64) -> u64 {
    if bandwidth == 0 {
        return u64::MAX;
    }
    let scaled = u128::from(payload_bits) * 1_000_000_000;
    u64::try_from(scaled.div_ceil(u128::from(bandwidth))).unwrap_or(u64::MAX)
}

/// Validate `stream` for admission into `project`.
///
/// `stream` may already be present in the project (update path); it is
/// skipped by id during conflict detection. With `check_feasibility`
/// off, the fixed-offset overlap test is skipped.
pub fn check_stream(
    project: &Project,
    stream: &Stream,
    check_feasibility: bool,
) -> Result<(), CoreError> {
    let name = &stream.name;

    if stream.traffic_type != StreamTrafficType::Cyclic {
        return Err(reject(format!("Stream ({name}) - Only support cyclic stream")));
    }

    let name_len = name.chars().count();
    if !(STRING_LENGTH_MIN..=STRING_LENGTH_MAX).contains(&name_len) {
        return Err(reject(format!(
            "Stream ({name}) - The length of stream name should be {STRING_LENGTH_MIN} ~ {STRING_LENGTH_MAX} characters"
        )));
    }

    check_user_defined_vlan(project, stream)?;

    let (talker_dev, talker_intf) =
        resolve_end_station(project, stream, stream.talker.end_station_interface, "Talker")?;

    let duration = check_traffic(project, stream, talker_dev, talker_intf)?;
    check_listeners(project, stream)?;
    let destination = check_destination(stream)?;
    check_conflicts(project, stream, destination, duration, check_feasibility)
}

fn check_user_defined_vlan(project: &Project, stream: &Stream) -> Result<(), CoreError> {
    if !stream.user_defined_vlan {
        return Ok(());
    }
    let name = &stream.name;
    let tag = stream.user_defined_vlan_tag().ok_or_else(|| {
        reject(format!(
            "Stream ({name}) - Get User-Defined VLAN tag failed"
        ))
    })?;

    if !project.vlan_range.contains(tag.vlan_id) {
        return Err(reject(format!(
            "Stream ({name}) - The valid VLAN id should be {} ~ {}, instead of {}",
            project.vlan_range.min, project.vlan_range.max, tag.vlan_id
        )));
    }

    let allowed = project
        .available_pcps(stream.traffic_type)
        .is_some_and(|pcps| pcps.contains(&tag.priority_code_point));
    if !allowed {
        return Err(reject(format!(
            "Stream ({name}) - The priority code point {} of the User-Defined VLAN is not supported",
            tag.priority_code_point
        )));
    }
    Ok(())
}

/// Resolve a talker or listener endpoint to its device and interface.
fn resolve_end_station<'a>(
    project: &'a Project,
    stream: &Stream,
    endpoint: EndStationInterface,
    role: &str,
) -> Result<(&'a Device, &'a Interface), CoreError> {
    let name = &stream.name;
    let device = project.devices.get(&endpoint.device_id).ok_or_else(|| {
        reject(format!(
            "Stream ({name}) - {role} {} not found",
            endpoint.device_id
        ))
    })?;

    if !device.device_type.is_end_station() {
        return Err(reject(format!(
            "Stream ({name}) - {role} {} is not a valid device type",
            device.ipv4
        )));
    }

    let interface = device.interface(endpoint.interface_id).ok_or_else(|| {
        reject(format!(
            "Stream ({name}) - Device id {} Interface id {} not found",
            endpoint.device_id, endpoint.interface_id
        ))
    })?;

    if !interface.used {
        let shown = if role == "Talker" {
            interface.name.clone()
        } else {
            interface.id.to_string()
        };
        let label = if role == "Talker" {
            "Talker interface"
        } else {
            "Listener interface id"
        };
        return Err(reject(format!("Stream ({name}) - {label} {shown} is not used")));
    }

    Ok((device, interface))
}

/// Check the talker traffic specification. Returns the transmission
/// duration in ns.
#[allow(clippy::too_many_lines)]
fn check_traffic(
    project: &Project,
    stream: &Stream,
    talker_dev: &Device,
    talker_intf: &Interface,
) -> Result<u64, CoreError> {
    let name = &stream.name;
    let spec = &stream.talker.traffic_specification;
    let capability = &talker_dev.capability;

    let link = project
        .link_on(talker_dev.id, talker_intf.id)
        .ok_or_else(|| {
            reject(format!(
                "Stream ({name}) - Link of talker interface {} not found",
                talker_intf.name
            ))
        })?;

    let payload = stream.payload_bits(project.media_specific_overhead_bytes);
    let duration = transmission_duration(payload, link.bandwidth());
    let interval = stream.interval_ns();
    let earliest = spec.time_aware.earliest_transmit_offset;
    let latest = spec.time_aware.latest_transmit_offset;
    let jitter = spec.time_aware.jitter;

    if interval < duration {
        return Err(reject_infeasible(format!(
            "Stream ({name}) - The interval {interval} ns is smaller than duration {duration} ns"
        )));
    }
    if latest > interval {
        return Err(reject_infeasible(format!(
            "Stream ({name}) - The latest transmit offset {latest} ns is too big to transmit within interval {interval} ns"
        )));
    }

    // Interval
    let cap_interval = capability.interval.as_nanoseconds();
    if interval > cap_interval {
        return Err(reject(format!(
            "Stream ({name}) - The interval {interval} ns exceeds talker capability {cap_interval} ns"
        )));
    }
    if !(INTERVAL_MIN..=INTERVAL_MAX).contains(&interval) {
        return Err(reject(format!(
            "Stream ({name}) - The interval {interval} should be {INTERVAL_MIN} ~ {INTERVAL_MAX} ns"
        )));
    }

    // Frame size
    if spec.max_frame_size > capability.max_frame_size {
        return Err(reject(format!(
            "Stream ({name}) - The maximum frame size {} bytes exceeds talker capability {}",
            spec.max_frame_size, capability.max_frame_size
        )));
    }
    if !(FRAME_SIZE_MIN..=FRAME_SIZE_MAX).contains(&spec.max_frame_size) {
        return Err(reject(format!(
            "Stream ({name}) - The maximum frame size {} should be {FRAME_SIZE_MIN} ~ {FRAME_SIZE_MAX} bytes",
            spec.max_frame_size
        )));
    }

    // Frames per interval
    if spec.max_frames_per_interval > capability.max_frames_per_interval {
        return Err(reject(format!(
            "Stream ({name}) - The maximum frames per interval {} exceeds talker capability {}",
            spec.max_frames_per_interval, capability.max_frames_per_interval
        )));
    }
    if !(FRAME_PER_INTERVAL_MIN..=FRAME_PER_INTERVAL_MAX).contains(&spec.max_frames_per_interval) {
        return Err(reject(format!(
            "Stream ({name}) - The maximum frames per interval {} should be {FRAME_PER_INTERVAL_MIN} ~ {FRAME_PER_INTERVAL_MAX}",
            spec.max_frames_per_interval
        )));
    }

    // Transmit offsets
    let cap_ta = &capability.time_aware;
    if earliest > cap_ta.earliest_transmit_offset {
        return Err(reject(format!(
            "Stream ({name}) - The earliest transmit offset {earliest} ns exceeds talker capability {} ns",
            cap_ta.earliest_transmit_offset
        )));
    }
    if !(TIME_AWARE_MIN..=TIME_AWARE_MAX).contains(&earliest) {
        return Err(reject(format!(
            "Stream ({name}) - The earliest transmit offset {earliest} should be {TIME_AWARE_MIN} ~ {TIME_AWARE_MAX} ns"
        )));
    }
    if latest > cap_ta.latest_transmit_offset {
        return Err(reject(format!(
            "Stream ({name}) - The latest transmit offset {latest} ns exceeds talker capability {} ns",
            cap_ta.latest_transmit_offset
        )));
    }
    if !(TIME_AWARE_MIN..=TIME_AWARE_MAX).contains(&latest) {
        return Err(reject(format!(
            "Stream ({name}) - The latest transmit offset {latest} should be {TIME_AWARE_MIN} ~ {TIME_AWARE_MAX} ns"
        )));
    }
    if latest < earliest {
        return Err(reject(format!(
            "Stream ({name}) - The latest transmit offset {latest} ns is smaller than the earliest transmit offset {earliest} ns"
        )));
    }

    // Jitter
    if jitter > cap_ta.jitter {
        return Err(reject(format!(
            "Stream ({name}) - The jitter {jitter} ns exceeds talker capability {} ns",
            cap_ta.jitter
        )));
    }
    let jitter_max = ((latest - earliest) / 2).min(JITTER_MAX);
    if jitter > jitter_max {
        return Err(reject(format!(
            "Stream ({name}) - The jitter {jitter} should be {JITTER_MIN} ~ {jitter_max} ns"
        )));
    }

    Ok(duration)
}

fn check_listeners(project: &Project, stream: &Stream) -> Result<(), CoreError> {
    let name = &stream.name;
    if stream.listeners.is_empty() {
        return Err(reject(format!(
            "Stream ({name}) - There should be at least one listener"
        )));
    }

    for listener in &stream.listeners {
        let req = &listener.user_to_network_requirement;
        match stream.qos_type {
            QosType::Deadline => {
                if !(LATENCY_MIN..=LATENCY_MAX).contains(&req.max_latency) {
                    return Err(reject(format!(
                        "Stream ({name}) - The maximum latency {} should be {LATENCY_MIN} ~ {LATENCY_MAX} ns",
                        req.max_latency
                    )));
                }
            }
            QosType::BoundedLatency => {
                if !(RECEIVE_OFFSET_MIN..=RECEIVE_OFFSET_MAX).contains(&req.min_receive_offset) {
                    return Err(reject(format!(
                        "Stream ({name}) - The minimum receive offset {} should be {RECEIVE_OFFSET_MIN} ~ {RECEIVE_OFFSET_MAX} ns",
                        req.min_receive_offset
                    )));
                }
                if !(RECEIVE_OFFSET_MIN..=RECEIVE_OFFSET_MAX).contains(&req.max_receive_offset) {
                    return Err(reject(format!(
                        "Stream ({name}) - The maximum receive offset {} should be {RECEIVE_OFFSET_MIN} ~ {RECEIVE_OFFSET_MAX} ns",
                        req.max_receive_offset
                    )));
                }
                if req.max_receive_offset < req.min_receive_offset {
                    return Err(reject(format!(
                        "Stream ({name}) - The maximum receive offset {} is smaller than minimum receive offset {}",
                        req.max_receive_offset, req.min_receive_offset
                    )));
                }
            }
        }

        resolve_end_station(project, stream, listener.end_station_interface, "Listener")?;

        if listener.end_station_interface == stream.talker.end_station_interface {
            return Err(reject(format!(
                "Stream ({name}) - talker & listener are the same"
            )));
        }
    }

    Ok(())
}

fn check_destination(stream: &Stream) -> Result<MacAddress, CoreError> {
    let name = &stream.name;
    let destination = stream.destination_address()?;
    if !stream.multicast {
        return Ok(destination);
    }

    if destination.is_zero() || destination.is_broadcast() {
        return Err(reject(format!(
            "Stream ({name}) - Check DA failed - The MAC address({destination}) is invalid"
        )));
    }
    if !destination.is_multicast() {
        return Err(reject(format!(
            "Project ({name}) - The MAC address {destination} is not a valid multicast format"
        )));
    }
    Ok(destination)
}

/// Pairwise conflicts against every other stream in the project.
///
/// Duplicate VID+DA is tolerated when:
/// - either stream is untagged with per-stream priority, or
/// - both streams have system-assigned VLANs and different talker ports.
///
/// Every other duplicate is rejected.
fn check_conflicts(
    project: &Project,
    stream: &Stream,
    destination: MacAddress,
    duration: u64,
    check_feasibility: bool,
) -> Result<(), CoreError> {
    let name = &stream.name;
    let time_aware = &stream.talker.traffic_specification.time_aware;
    let fixed_offset = time_aware.earliest_transmit_offset == time_aware.latest_transmit_offset;
    let vlan_id = stream.effective_vlan_id();

    for other in project.streams.values() {
        if other.id == stream.id {
            continue;
        }

        if check_feasibility
            && fixed_offset
            && other.talker.end_station_interface == stream.talker.end_station_interface
        {
            let other_ta = &other.talker.traffic_specification.time_aware;
            let start = time_aware.earliest_transmit_offset;
            let end = start.saturating_add(duration);
            if other_ta.earliest_transmit_offset >= start && other_ta.latest_transmit_offset <= end {
                return Err(reject_infeasible(format!(
                    "Stream ({name}) - The transmission offset will occupy {start} ~ {end}, which will be overlapped with Stream ({})",
                    other.name
                )));
            }
        }

        let other_destination = other.destination_address()?;
        if destination.is_zero()
            || destination != other_destination
            || vlan_id != other.effective_vlan_id()
            || stream.is_per_stream_priority_untagged()
            || other.is_per_stream_priority_untagged()
        {
            continue;
        }
        if !stream.user_defined_vlan
            && !other.user_defined_vlan
            && other.talker.end_station_interface != stream.talker.end_station_interface
        {
            continue;
        }

        return Err(reject(format!(
            "Stream ({name}) - VID({vlan_id}) + DA({destination}) is duplicated with Stream ({})",
            other.name
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures::{project, stream};
    use crate::model::{DataFrameSpecification, UntaggedMode, VlanTag};

    #[test]
    fn duration_rounds_up() {
        // 1136 bits on a gigabit link
        assert_eq!(transmission_duration(1136, 1_000_000_000), 1136);
        assert_eq!(transmission_duration(1, 3), 333_333_334);
        assert_eq!(transmission_duration(1, 0), u64::MAX);
    }

    #[test]
    fn valid_stream_passes() {
        let p = project();
        check_stream(&p, &stream("s1", (1, 1), (3, 1)), true).unwrap();
    }

    #[test]
    fn only_cyclic_streams_are_admitted() {
        let p = project();
        let mut s = stream("s1", (1, 1), (3, 1));
        s.traffic_type = StreamTrafficType::BestEffort;
        let err = check_stream(&p, &s, true).unwrap_err();
        assert_eq!(err.to_string(), "Stream (s1) - Only support cyclic stream");
    }

    #[test]
    fn jitter_bounded_by_half_window() {
        let p = project();
        let mut s = stream("s1", (1, 1), (3, 1));
        let ta = &mut s.talker.traffic_specification.time_aware;
        ta.earliest_transmit_offset = 0;
        ta.latest_transmit_offset = 1000;
        ta.jitter = 600;
        let err = check_stream(&p, &s, true).unwrap_err();
        assert_eq!(err.to_string(), "Stream (s1) - The jitter 600 should be 0 ~ 500 ns");

        s.talker.traffic_specification.time_aware.jitter = 500;
        check_stream(&p, &s, true).unwrap();
    }

    #[test]
    fn interval_shorter_than_duration_is_infeasible() {
        let mut p = project();
        // 10 Mbit/s: (100 + 42) * 8 bits take 113.6 µs
        for link in p.links.values_mut() {
            link.speed = 10;
        }
        let mut s = stream("s1", (1, 1), (3, 1));
        s.talker.traffic_specification.interval = crate::model::Interval::from_nanoseconds(100_000);
        let err = check_stream(&p, &s, true).unwrap_err();
        assert!(matches!(err, CoreError::FeasibilityCheckFailed { .. }));
        assert_eq!(
            err.to_string(),
            "Stream (s1) - The interval 100000 ns is smaller than duration 113600 ns"
        );
    }

    #[test]
    fn talker_must_be_an_end_station() {
        let p = project();
        let s = stream("s1", (2, 1), (3, 1));
        let err = check_stream(&p, &s, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Stream (s1) - Talker 192.168.127.2 is not a valid device type"
        );
    }

    #[test]
    fn listener_cannot_be_talker() {
        let p = project();
        let s = stream("s1", (1, 1), (1, 1));
        let err = check_stream(&p, &s, true).unwrap_err();
        assert_eq!(err.to_string(), "Stream (s1) - talker & listener are the same");
    }

    #[test]
    fn at_least_one_listener() {
        let p = project();
        let mut s = stream("s1", (1, 1), (3, 1));
        s.listeners.clear();
        let err = check_stream(&p, &s, true).unwrap_err();
        assert!(err.to_string().contains("at least one listener"));
    }

    #[test]
    fn deadline_latency_is_bounded() {
        let p = project();
        let mut s = stream("s1", (1, 1), (3, 1));
        s.qos_type = QosType::Deadline;
        s.listeners[0].user_to_network_requirement.max_latency = 999;
        let err = check_stream(&p, &s, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Stream (s1) - The maximum latency 999 should be 1000 ~ 999999999 ns"
        );
    }

    #[test]
    fn multicast_destination_needs_group_bit() {
        let p = project();
        let mut s = stream("s1", (1, 1), (3, 1));
        s.talker.data_frame_specifications = vec![DataFrameSpecification::MacAddresses(
            crate::model::MacAddresses {
                source: MacAddress::ZERO,
                destination: "00-11-22-33-44-55".parse().unwrap(),
            },
        )];
        let err = check_stream(&p, &s, true).unwrap_err();
        assert!(err.to_string().contains("is not a valid multicast format"));
    }

    #[test]
    fn user_defined_vlan_must_be_in_range() {
        let p = project();
        let mut s = stream("s1", (1, 1), (3, 1));
        s.user_defined_vlan = true;
        s.talker
            .data_frame_specifications
            .push(DataFrameSpecification::VlanTag(VlanTag {
                vlan_id: 4095,
                priority_code_point: 5,
            }));
        let err = check_stream(&p, &s, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Stream (s1) - The valid VLAN id should be 2 ~ 4094, instead of 4095"
        );
    }

    #[test]
    fn fixed_offset_overlap_on_same_talker() {
        let mut p = project();
        let mut existing = stream("a", (1, 1), (3, 1));
        existing.id = 1;
        let ta = &mut existing.talker.traffic_specification.time_aware;
        ta.earliest_transmit_offset = 500;
        ta.latest_transmit_offset = 1000;
        p.streams.insert(1, existing);

        let mut s = stream("b", (1, 1), (4, 1));
        s.id = 2;
        s.talker.data_frame_specifications = vec![DataFrameSpecification::MacAddresses(
            crate::model::MacAddresses {
                source: MacAddress::ZERO,
                destination: "01-00-5E-00-00-02".parse().unwrap(),
            },
        )];
        let ta = &mut s.talker.traffic_specification.time_aware;
        ta.earliest_transmit_offset = 0;
        ta.latest_transmit_offset = 0;

        let err = check_stream(&p, &s, true).unwrap_err();
        assert!(matches!(err, CoreError::FeasibilityCheckFailed { .. }));
        assert!(err.to_string().contains("will be overlapped with Stream (a)"));

        check_stream(&p, &s, false).unwrap();
    }

    #[test]
    fn duplicate_vid_da_rejected_unless_per_stream_priority() {
        let mut p = project();
        let mut a = stream("a", (1, 1), (3, 1));
        a.id = 1;
        a.user_defined_vlan = true;
        a.vlan_id = 100;
        a.talker
            .data_frame_specifications
            .push(DataFrameSpecification::VlanTag(VlanTag {
                vlan_id: 100,
                priority_code_point: 5,
            }));
        p.streams.insert(1, a);

        // Different talker, tagged with the same VLAN and destination
        let mut b = stream("b", (4, 1), (3, 1));
        b.id = 2;
        b.tagged = true;
        b.vlan_id = 100;
        let err = check_stream(&p, &b, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Stream (b) - VID(100) + DA(01-00-5E-00-00-01) is duplicated with Stream (a)"
        );

        b.tagged = false;
        b.untagged_mode = UntaggedMode::PerStreamPriority;
        check_stream(&p, &b, true).unwrap();
    }

    #[test]
    fn system_assigned_vlans_on_different_talkers_do_not_conflict() {
        let mut p = project();
        let mut a = stream("a", (1, 1), (3, 1));
        a.id = 1;
        p.streams.insert(1, a);

        let mut b = stream("b", (4, 1), (3, 1));
        b.id = 2;
        check_stream(&p, &b, true).unwrap();

        // Same talker port, same DA, both untagged per-port: duplicate
        b.talker.end_station_interface.device_id = 1;
        b.listeners[0].end_station_interface.device_id = 4;
        let err = check_stream(&p, &b, true).unwrap_err();
        assert!(err.to_string().contains("VID(0) + DA(01-00-5E-00-00-01)"));

        b.untagged_mode = UntaggedMode::PerStreamPriority;
        check_stream(&p, &b, true).unwrap();
    }
}
