// ── Project edits ──
//
// Mutations applied to a private copy of a project before it is written
// back. Each function validates first; on error the copy is discarded
// so partial changes never reach the store.

use tracing::debug;

use crate::error::CoreError;
use crate::model::{
    CycleSetting, DataFrameSpecification, Device, DeviceId, InterfaceId, Link, MacAddresses,
    Project, Stream, StreamId, StreamStatus, generate_unique_id,
};
use crate::validate::{check_cycle_setting, check_stream};

// ── Streams ──────────────────────────────────────────────────────────

pub(crate) fn create_streams(
    project: &mut Project,
    streams: Vec<Stream>,
) -> Result<Vec<Stream>, CoreError> {
    if streams.is_empty() {
        return Err(CoreError::bad_request("Stream list is empty"));
    }

    let mut created = Vec::with_capacity(streams.len());
    for mut stream in streams {
        if project.streams.values().any(|s| s.name == stream.name) {
            return Err(CoreError::bad_request(format!(
                "The stream name {} is duplicated",
                stream.name
            )));
        }
        capture_vlan(project, &mut stream)?;

        let taken = &project.streams;
        let id = generate_unique_id(&mut project.last_assigned_stream_id, |c| {
            taken.contains_key(&c)
        })?;
        stream.id = id;
        stream.status = StreamStatus::Planned;
        stream.stream_id = project
            .devices
            .get(&stream.talker_device())
            .map(|d| StreamId {
                mac_address: d.mac_address,
                unique_id: id,
            });
        if !stream.multicast {
            refresh_unicast_addresses(project, &mut stream);
        }

        check_stream(project, &stream, true)?;
        debug!(stream_id = id, name = %stream.name, "stream created");
        project.streams.insert(id, stream.clone());
        created.push(stream);
    }
    Ok(created)
}

pub(crate) fn update_streams(
    project: &mut Project,
    streams: Vec<Stream>,
) -> Result<Vec<Stream>, CoreError> {
    if streams.is_empty() {
        return Err(CoreError::bad_request("Stream list is empty"));
    }

    let mut updated = Vec::with_capacity(streams.len());
    for mut stream in streams {
        let existing = project
            .streams
            .get(&stream.id)
            .ok_or_else(|| CoreError::not_found("Stream", stream.id))?;
        if project
            .streams
            .values()
            .any(|s| s.id != stream.id && s.name == stream.name)
        {
            return Err(CoreError::bad_request(format!(
                "The stream name {} is duplicated",
                stream.name
            )));
        }

        stream.stream_id = existing.stream_id;
        stream.status = match existing.status {
            StreamStatus::Scheduled => StreamStatus::Modified,
            other => other,
        };
        capture_vlan(project, &mut stream)?;
        if !stream.multicast {
            refresh_unicast_addresses(project, &mut stream);
        }

        check_stream(project, &stream, true)?;
        project.streams.insert(stream.id, stream.clone());
        updated.push(stream);
    }
    Ok(updated)
}

pub(crate) fn delete_streams(project: &mut Project, ids: &[i64]) -> Result<(), CoreError> {
    if ids.is_empty() {
        return Err(CoreError::bad_request("Stream id list is empty"));
    }
    if let Some(missing) = ids.iter().find(|id| !project.streams.contains_key(id)) {
        return Err(CoreError::bad_request(format!(
            "Delete stream failed, cannot found stream id {missing}"
        )));
    }
    for id in ids {
        project.streams.remove(id);
    }
    Ok(())
}

/// Copy VLAN id and PCP from the talker's tag for tagged or user-defined
/// streams.
fn capture_vlan(project: &Project, stream: &mut Stream) -> Result<(), CoreError> {
    if !stream.user_defined_vlan && !stream.tagged {
        return Ok(());
    }

    let tag = stream
        .vlan_tag()
        .filter(|t| t.vlan_id != 0)
        .ok_or_else(|| {
            CoreError::bad_request(format!(
                "Stream ({}) - Get User-Defined VLAN tag failed",
                stream.name
            ))
        })?;
    if project
        .topology_setting
        .intelligent_vlan_group
        .contains(&tag.vlan_id)
    {
        return Err(CoreError::bad_request(format!(
            "User defined vlan id {} is reserved by the intelligent VLAN group",
            tag.vlan_id
        )));
    }

    stream.vlan_id = tag.vlan_id;
    stream.priority_code_point = tag.priority_code_point;
    Ok(())
}

/// Unicast streams address the first listener's device directly.
fn refresh_unicast_addresses(project: &Project, stream: &mut Stream) {
    let talker = project.devices.get(&stream.talker_device());
    let listener = stream
        .listeners
        .first()
        .and_then(|l| project.devices.get(&l.end_station_interface.device_id));
    let (Some(talker), Some(listener)) = (talker, listener) else {
        return;
    };

    let specs = &mut stream.talker.data_frame_specifications;
    specs.retain(|dfs| !matches!(dfs, DataFrameSpecification::MacAddresses(_)));
    specs.push(DataFrameSpecification::MacAddresses(MacAddresses {
        source: talker.mac_address,
        destination: listener.mac_address,
    }));
}

// ── Devices and links ────────────────────────────────────────────────

pub(crate) fn create_device(project: &mut Project, mut device: Device) -> Result<Device, CoreError> {
    if project.devices.values().any(|d| d.name == device.name) {
        return Err(CoreError::bad_request(format!(
            "The device name {} is duplicated",
            device.name
        )));
    }
    let taken = &project.devices;
    device.id = generate_unique_id(&mut project.last_assigned_device_id, |c| {
        taken.contains_key(&c)
    })?;
    let id = device.id;
    project.devices.insert(id, device);
    project.refresh_used_interfaces(id);
    project
        .devices
        .get(&id)
        .cloned()
        .ok_or_else(|| CoreError::not_found("Device", id))
}

pub(crate) fn update_device(project: &mut Project, device: Device) -> Result<Device, CoreError> {
    if !project.devices.contains_key(&device.id) {
        return Err(CoreError::not_found("Device", device.id));
    }
    if project
        .devices
        .values()
        .any(|d| d.id != device.id && d.name == device.name)
    {
        return Err(CoreError::bad_request(format!(
            "The device name {} is duplicated",
            device.name
        )));
    }
    let id = device.id;
    project.devices.insert(id, device);
    project.refresh_used_interfaces(id);
    project
        .devices
        .get(&id)
        .cloned()
        .ok_or_else(|| CoreError::not_found("Device", id))
}

/// Remove a device with every link and stream that references it.
pub(crate) fn delete_device(project: &mut Project, device_id: DeviceId) -> Result<(), CoreError> {
    if project.devices.remove(&device_id).is_none() {
        return Err(CoreError::not_found("Device", device_id));
    }
    let mut peers = Vec::new();
    project.links.retain(|_, l| {
        if !l.touches_device(device_id) {
            return true;
        }
        peers.extend(l.endpoints().into_iter().map(|(d, _)| d).filter(|d| *d != device_id));
        false
    });
    for peer in peers {
        project.refresh_used_interfaces(peer);
    }
    project.streams.retain(|_, s| {
        s.talker_device() != device_id
            && s
                .listeners
                .iter()
                .all(|l| l.end_station_interface.device_id != device_id)
    });
    project.device_config.gcl_tables.remove(&device_id);
    project.device_config.vlan_tables.remove(&device_id);
    Ok(())
}

pub(crate) fn create_link(project: &mut Project, mut link: Link) -> Result<Link, CoreError> {
    for (device_id, interface_id) in link.endpoints() {
        let device = project
            .devices
            .get(&device_id)
            .ok_or_else(|| CoreError::not_found("Device", device_id))?;
        let interface = device
            .interface(interface_id)
            .ok_or_else(|| CoreError::not_found("Interface", interface_id))?;
        if project.link_on(device_id, interface_id).is_some() {
            return Err(CoreError::bad_request(format!(
                "Interface {} of device {} is already linked",
                interface.name, device.name
            )));
        }
    }

    let taken = &project.links;
    link.id = generate_unique_id(&mut project.last_assigned_link_id, |c| taken.contains_key(&c))?;
    project.links.insert(link.id, link.clone());
    for (device_id, _) in link.endpoints() {
        project.refresh_used_interfaces(device_id);
    }
    Ok(link)
}

/// Remove a link with every stream whose talker or listener sits on
/// one of its endpoints.
pub(crate) fn delete_link(project: &mut Project, link_id: i64) -> Result<(), CoreError> {
    let link = project
        .links
        .remove(&link_id)
        .ok_or_else(|| CoreError::not_found("Link", link_id))?;
    for (device_id, _) in link.endpoints() {
        project.refresh_used_interfaces(device_id);
    }

    let on_link = |device: DeviceId, interface: InterfaceId| link.touches(device, interface);
    project.streams.retain(|_, s| {
        !on_link(s.talker_device(), s.talker_interface())
            && !s.listeners.iter().any(|l| {
                on_link(
                    l.end_station_interface.device_id,
                    l.end_station_interface.interface_id,
                )
            })
    });
    Ok(())
}

pub(crate) fn update_cycle_setting(
    project: &mut Project,
    setting: CycleSetting,
) -> Result<(), CoreError> {
    check_cycle_setting(&project.name, &setting)?;
    project.cycle_setting = setting;
    Ok(())
}
