// ── Stream domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{DeviceId, InterfaceId, MacAddress};
use super::topology::TrafficSpecification;
use crate::error::CoreError;

/// Frame replication adds an R-tag to every frame.
const CB_OVERHEAD_BYTES: u32 = 6;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    Display, EnumString,
)]
pub enum StreamTrafficType {
    #[default]
    Cyclic,
    BestEffort,
    TimeSync,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum QosType {
    #[default]
    BoundedLatency,
    Deadline,
}

/// How an untagged stream is prioritised at the talker's ingress port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum UntaggedMode {
    #[default]
    PerPortPriority,
    PerStreamPriority,
}

/// 802.1Qdj stream status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum StreamStatus {
    #[default]
    Planned,
    Scheduled,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndStationInterface {
    pub device_id: DeviceId,
    pub interface_id: InterfaceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanTag {
    pub vlan_id: u16,
    pub priority_code_point: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacAddresses {
    pub source: MacAddress,
    pub destination: MacAddress,
}

/// Header field a talker promises to put on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DataFrameSpecification {
    MacAddresses(MacAddresses),
    VlanTag(VlanTag),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talker {
    pub end_station_interface: EndStationInterface,
    pub traffic_specification: TrafficSpecification,
    #[serde(default)]
    pub data_frame_specifications: Vec<DataFrameSpecification>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UserToNetworkRequirement {
    /// Deadline QoS only, in ns.
    #[serde(default)]
    pub max_latency: u64,
    /// BoundedLatency QoS only, in µs.
    #[serde(default)]
    pub min_receive_offset: f64,
    #[serde(default)]
    pub max_receive_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamListener {
    pub end_station_interface: EndStationInterface,
    #[serde(default)]
    pub user_to_network_requirement: UserToNetworkRequirement,
}

/// 802.1Qcc stream identifier: talker MAC plus a unique id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamId {
    pub mac_address: MacAddress,
    pub unique_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// `-1` until the store assigns one.
    #[serde(default = "unassigned_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub traffic_type: StreamTrafficType,
    pub talker: Talker,
    #[serde(default)]
    pub listeners: Vec<StreamListener>,
    #[serde(default)]
    pub qos_type: QosType,
    #[serde(default)]
    pub multicast: bool,
    #[serde(default)]
    pub tagged: bool,
    #[serde(default)]
    pub untagged_mode: UntaggedMode,
    #[serde(default)]
    pub user_defined_vlan: bool,
    #[serde(default)]
    pub vlan_id: u16,
    #[serde(default)]
    pub priority_code_point: u8,
    #[serde(default)]
    pub stream_id: Option<StreamId>,
    #[serde(default)]
    pub status: StreamStatus,
    /// Frame replication and elimination (802.1CB).
    #[serde(default)]
    pub cb_active: bool,
}

fn unassigned_id() -> i64 {
    -1
}

impl Stream {
    pub fn talker_device(&self) -> DeviceId {
        self.talker.end_station_interface.device_id
    }

    pub fn talker_interface(&self) -> InterfaceId {
        self.talker.end_station_interface.interface_id
    }

    /// Destination MAC from the talker's data frame specification.
    pub fn destination_address(&self) -> Result<MacAddress, CoreError> {
        self.talker
            .data_frame_specifications
            .iter()
            .find_map(|dfs| match dfs {
                DataFrameSpecification::MacAddresses(addrs) => Some(addrs.destination),
                DataFrameSpecification::VlanTag(_) => None,
            })
            .ok_or_else(|| {
                CoreError::bad_request(format!(
                    "Stream ({}) - Get destination MAC address from Talker failed, please check talker exist",
                    self.name
                ))
            })
    }

    pub fn vlan_tag(&self) -> Option<VlanTag> {
        self.talker
            .data_frame_specifications
            .iter()
            .find_map(|dfs| match dfs {
                DataFrameSpecification::VlanTag(tag) => Some(*tag),
                DataFrameSpecification::MacAddresses(_) => None,
            })
    }

    /// The tag the user pinned, if user-defined VLAN is on.
    pub fn user_defined_vlan_tag(&self) -> Option<VlanTag> {
        if self.user_defined_vlan {
            self.vlan_tag()
        } else {
            None
        }
    }

    /// VLAN id used for VID+DA uniqueness. Untagged, system-assigned
    /// streams compare as VLAN 0.
    pub fn effective_vlan_id(&self) -> u16 {
        if !self.user_defined_vlan && !self.tagged {
            0
        } else {
            self.vlan_id
        }
    }

    pub fn is_per_stream_priority_untagged(&self) -> bool {
        !self.tagged
            && self.untagged_mode == UntaggedMode::PerStreamPriority
            && !self.user_defined_vlan
    }

    /// Payload in bits per interval, including media-specific overhead.
    pub fn payload_bits(&self, media_specific_overhead_bytes: u32) -> u64 {
        let spec = &self.talker.traffic_specification;
        let bytes_per_interval = if spec.max_bytes_per_interval == 0 {
            u64::from(spec.max_frame_size) * u64::from(spec.max_frames_per_interval)
        } else {
            u64::from(spec.max_bytes_per_interval)
        };
        let frames = if spec.max_frame_size == 0 {
            0
        } else {
            bytes_per_interval.div_ceil(u64::from(spec.max_frame_size))
        };
        let overhead = if self.cb_active {
            media_specific_overhead_bytes + CB_OVERHEAD_BYTES
        } else {
            media_specific_overhead_bytes
        };
        (bytes_per_interval + u64::from(overhead) * frames) * 8
    }

    pub fn interval_ns(&self) -> u64 {
        self.talker.traffic_specification.interval.as_nanoseconds()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::topology::Interval;

    fn stream() -> Stream {
        Stream {
            id: -1,
            name: "s1".into(),
            traffic_type: StreamTrafficType::Cyclic,
            talker: Talker {
                end_station_interface: EndStationInterface {
                    device_id: 1,
                    interface_id: 1,
                },
                traffic_specification: TrafficSpecification {
                    interval: Interval::from_nanoseconds(1_000_000),
                    max_frames_per_interval: 2,
                    max_frame_size: 100,
                    ..TrafficSpecification::default()
                },
                data_frame_specifications: vec![],
            },
            listeners: vec![],
            qos_type: QosType::BoundedLatency,
            multicast: false,
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

    #[test]
    fn payload_counts_overhead_per_frame() {
        let s = stream();
        // (200 bytes + 2 frames * 22 bytes) * 8
        assert_eq!(s.payload_bits(22), 1952);
    }

    #[test]
    fn payload_adds_cb_overhead() {
        let mut s = stream();
        s.cb_active = true;
        assert_eq!(s.payload_bits(22), (200 + 2 * 28) * 8);
    }

    #[test]
    fn destination_address_requires_mac_spec() {
        let mut s = stream();
        assert!(s.destination_address().is_err());

        let dst: MacAddress = "01-00-5E-00-00-01".parse().unwrap();
        s.talker
            .data_frame_specifications
            .push(DataFrameSpecification::MacAddresses(MacAddresses {
                source: MacAddress::ZERO,
                destination: dst,
            }));
        assert_eq!(s.destination_address().unwrap(), dst);
    }

    #[test]
    fn untagged_system_assigned_vlan_compares_as_zero() {
        let mut s = stream();
        s.vlan_id = 100;
        assert_eq!(s.effective_vlan_id(), 0);
        s.tagged = true;
        assert_eq!(s.effective_vlan_id(), 100);
    }
}
