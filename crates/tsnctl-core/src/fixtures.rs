// ── Shared test fixtures ──
//
// es-1 (1) ── sw-1 (2) ── es-2 (3)
//                 └────── es-3 (4)

use std::net::Ipv4Addr;

use crate::model::{
    DataFrameSpecification, Device, DeviceType, EndStationInterface, Interface, Interval, Link,
    MacAddress, MacAddresses, Project, ProjectId, QosType, Stream, StreamListener, StreamStatus,
    StreamTrafficType, Talker, TimeAware, TrafficSpecification, UntaggedMode,
    UserToNetworkRequirement,
};

pub(crate) fn capability() -> TrafficSpecification {
    TrafficSpecification {
        interval: Interval::from_nanoseconds(999_999_999),
        max_frames_per_interval: 65_535,
        max_frame_size: 1500,
        max_bytes_per_interval: 0,
        time_aware: TimeAware {
            earliest_transmit_offset: 999_999_999,
            latest_transmit_offset: 999_999_999,
            jitter: 999_999_999,
        },
    }
}

pub(crate) fn device(id: i64, device_type: DeviceType, ports: i64) -> Device {
    let last = u8::try_from(id).unwrap_or(0);
    Device {
        id,
        name: format!("dev-{id}"),
        device_type,
        mac_address: MacAddress::from_octets([0x00, 0x90, 0xE8, 0x00, 0x00, last]),
        ipv4: Ipv4Addr::new(192, 168, 127, last),
        interfaces: (1..=ports)
            .map(|i| Interface {
                id: i,
                name: format!("eth{i}"),
                used: true,
            })
            .collect(),
        capability: capability(),
        device_profile_id: 0,
    }
}

fn link(id: i64, a: (i64, i64), b: (i64, i64)) -> Link {
    Link {
        id,
        source_device_id: a.0,
        source_interface_id: a.1,
        destination_device_id: b.0,
        destination_interface_id: b.1,
        speed: 1000,
    }
}

pub(crate) fn project() -> Project {
    let mut p = Project::new(ProjectId(1), "fixture");
    for d in [
        device(1, DeviceType::EndStation, 1),
        device(2, DeviceType::TsnSwitch, 3),
        device(3, DeviceType::EndStation, 1),
        device(4, DeviceType::EndStation, 1),
    ] {
        p.devices.insert(d.id, d);
    }
    for l in [
        link(1, (1, 1), (2, 1)),
        link(2, (2, 2), (3, 1)),
        link(3, (2, 3), (4, 1)),
    ] {
        p.links.insert(l.id, l);
    }
    p
}

/// Multicast cyclic stream to 01-00-5E-00-00-01, 100 bytes every 1 ms.
pub(crate) fn stream(name: &str, talker: (i64, i64), listener: (i64, i64)) -> Stream {
    Stream {
        id: -1,
        name: name.into(),
        traffic_type: StreamTrafficType::Cyclic,
        talker: Talker {
            end_station_interface: EndStationInterface {
                device_id: talker.0,
                interface_id: talker.1,
            },
            traffic_specification: TrafficSpecification {
                interval: Interval::from_nanoseconds(1_000_000),
                max_frames_per_interval: 1,
                max_frame_size: 100,
                max_bytes_per_interval: 0,
                time_aware: TimeAware {
                    earliest_transmit_offset: 0,
                    latest_transmit_offset: 100_000,
                    jitter: 0,
                },
            },
            data_frame_specifications: vec![DataFrameSpecification::MacAddresses(MacAddresses {
                source: MacAddress::ZERO,
                destination: MacAddress::from_octets([0x01, 0x00, 0x5E, 0x00, 0x00, 0x01]),
            })],
        },
        listeners: vec![StreamListener {
            end_station_interface: EndStationInterface {
                device_id: listener.0,
                interface_id: listener.1,
            },
            user_to_network_requirement: UserToNetworkRequirement {
                max_latency: 0,
                min_receive_offset: 1.0,
                max_receive_offset: 100.0,
            },
        }],
        qos_type: QosType::BoundedLatency,
        multicast: true,
        tagged: false,
        untagged_mode: UntaggedMode::PerPortPriority,
        user_defined_vlan: false,
        vlan_id: 0,
        priority_code_point: 0,
        stream_id: None,
        status: StreamStatus::Planned,
        cb_active: false,
    }
}
