// ── Project aggregate ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumString};

use super::cycle::CycleSetting;
use super::gcl::GclTable;
use super::ids::{DeviceId, InterfaceId, LinkId, ProjectId};
use super::stream::{Stream, StreamTrafficType, VlanTag};
use super::topology::{Device, Link};
use crate::limits::{VLAN_MAX, VLAN_MIN};

/// Per-project job status, kept outside the project so it can be read
/// without the project lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum ProjectStatus {
    #[default]
    Idle,
    Computing,
    BroadcastSearching,
    TopologyMapping,
    Comparing,
    Deploying,
    Finished,
    Aborted,
}

impl ProjectStatus {
    /// A new job may be admitted from this status.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Idle | Self::Finished | Self::Aborted)
    }
}

/// Which copy of a project an operation addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum ProjectView {
    /// The editable design project.
    #[default]
    Design,
    /// The frozen baseline taken at the last deployment.
    Operation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanRange {
    pub min: u16,
    pub max: u16,
}

impl Default for VlanRange {
    fn default() -> Self {
        Self {
            min: VLAN_MIN,
            max: VLAN_MAX,
        }
    }
}

impl VlanRange {
    pub fn contains(&self, vlan_id: u16) -> bool {
        (self.min..=self.max).contains(&vlan_id)
    }
}

/// Settings derived from topology and streams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySetting {
    /// VLAN ids reserved for intelligent VLAN grouping; streams may not
    /// pin these.
    #[serde(default)]
    pub intelligent_vlan_group: BTreeSet<u16>,
    /// VLAN assigned to each tagged or user-defined stream.
    #[serde(default)]
    pub stream_vlans: BTreeMap<i64, u16>,
}

impl TopologySetting {
    pub fn recompute<'a>(&mut self, streams: impl IntoIterator<Item = &'a Stream>) {
        self.stream_vlans = streams
            .into_iter()
            .filter(|s| s.user_defined_vlan || s.tagged)
            .map(|s| (s.id, s.vlan_id))
            .collect();
    }
}

/// Output of the scheduling algorithm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedResult {
    #[serde(default)]
    pub gcl_tables: BTreeMap<DeviceId, GclTable>,
    #[serde(default)]
    pub stream_vlans: BTreeMap<i64, VlanTag>,
    /// Devices each stream traverses, talker first.
    #[serde(default)]
    pub stream_paths: BTreeMap<i64, Vec<DeviceId>>,
}

/// Per-device settings tables pushed at deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub gcl_tables: BTreeMap<DeviceId, GclTable>,
    #[serde(default)]
    pub vlan_tables: BTreeMap<DeviceId, BTreeSet<u16>>,
}

impl DeviceConfig {
    pub fn from_computed(result: &ComputedResult) -> Self {
        let mut vlan_tables: BTreeMap<DeviceId, BTreeSet<u16>> = BTreeMap::new();
        for (stream_id, path) in &result.stream_paths {
            let Some(tag) = result.stream_vlans.get(stream_id) else {
                continue;
            };
            for device in path {
                vlan_tables.entry(*device).or_default().insert(tag.vlan_id);
            }
        }

        Self {
            gcl_tables: result.gcl_tables.clone(),
            vlan_tables,
        }
    }

    /// Something to push to devices.
    pub fn is_deployable(&self) -> bool {
        !self.gcl_tables.is_empty() || !self.vlan_tables.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub devices: BTreeMap<DeviceId, Device>,
    #[serde(default)]
    pub links: BTreeMap<LinkId, Link>,
    #[serde(default)]
    pub streams: BTreeMap<i64, Stream>,
    #[serde(default)]
    pub topology_setting: TopologySetting,
    #[serde(default)]
    pub device_config: DeviceConfig,
    #[serde(default)]
    pub computed_result: Option<ComputedResult>,
    #[serde(default)]
    pub cycle_setting: CycleSetting,
    #[serde(default)]
    pub vlan_range: VlanRange,
    #[serde(default = "default_traffic_type_pcp")]
    pub traffic_type_pcp: BTreeMap<StreamTrafficType, BTreeSet<u8>>,
    #[serde(default = "default_overhead")]
    pub media_specific_overhead_bytes: u32,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_assigned_device_id: i64,
    #[serde(default)]
    pub last_assigned_link_id: i64,
    #[serde(default)]
    pub last_assigned_stream_id: i64,
}

fn default_traffic_type_pcp() -> BTreeMap<StreamTrafficType, BTreeSet<u8>> {
    BTreeMap::from([
        (StreamTrafficType::BestEffort, BTreeSet::from([0, 1])),
        (StreamTrafficType::Cyclic, BTreeSet::from([2, 3, 4, 5])),
        (StreamTrafficType::TimeSync, BTreeSet::from([7])),
    ])
}

/// Preamble, SFD, header, VLAN tag, FCS and inter-frame gap.
fn default_overhead() -> u32 {
    42
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            devices: BTreeMap::new(),
            links: BTreeMap::new(),
            streams: BTreeMap::new(),
            topology_setting: TopologySetting::default(),
            device_config: DeviceConfig::default(),
            computed_result: None,
            cycle_setting: CycleSetting::default(),
            vlan_range: VlanRange::default(),
            traffic_type_pcp: default_traffic_type_pcp(),
            media_specific_overhead_bytes: default_overhead(),
            last_modified: None,
            last_assigned_device_id: 0,
            last_assigned_link_id: 0,
            last_assigned_stream_id: 0,
        }
    }

    /// The link attached to a device interface, if any.
    pub fn link_on(&self, device: DeviceId, interface: InterfaceId) -> Option<&Link> {
        self.links.values().find(|l| l.touches(device, interface))
    }

    /// Mark each interface of `device` used exactly when a link sits on it.
    pub fn refresh_used_interfaces(&mut self, device: DeviceId) {
        let links = &self.links;
        if let Some(d) = self.devices.get_mut(&device) {
            for interface in &mut d.interfaces {
                interface.used = links.values().any(|l| l.touches(device, interface.id));
            }
        }
    }

    pub fn available_pcps(&self, traffic_type: StreamTrafficType) -> Option<&BTreeSet<u8>> {
        self.traffic_type_pcp.get(&traffic_type)
    }
}
