// ── Topology domain types ──

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use strum::{Display, EnumString};

use super::ids::{DeviceId, InterfaceId, LinkId, MacAddress};
use crate::limits::TRANSFER_RATE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum DeviceType {
    EndStation,
    BridgedEndStation,
    Switch,
    #[strum(serialize = "TSNSwitch")]
    #[serde(rename = "TSNSwitch")]
    TsnSwitch,
}

impl DeviceType {
    /// Devices that may act as a stream talker or listener.
    pub fn is_end_station(self) -> bool {
        matches!(self, Self::EndStation | Self::BridgedEndStation)
    }

    /// Devices that carry a gate control list.
    pub fn has_gate_control(self) -> bool {
        matches!(
            self,
            Self::Switch | Self::TsnSwitch | Self::BridgedEndStation
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub id: InterfaceId,
    pub name: String,
    /// Whether a link is attached.
    #[serde(default)]
    pub used: bool,
}

/// Interval expressed as a rational number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub numerator: u64,
    pub denominator: u64,
}

impl Interval {
    pub fn from_nanoseconds(ns: u64) -> Self {
        Self {
            numerator: ns,
            denominator: 1_000_000_000,
        }
    }

    /// Rounded up to whole nanoseconds. A zero denominator reads as an
    /// unbounded interval.
    pub fn as_nanoseconds(&self) -> u64 {
        if self.denominator == 0 {
            return u64::MAX;
        }
        let ns = u128::from(self.numerator) * 1_000_000_000;
        let den = u128::from(self.denominator);
        u64::try_from(ns.div_ceil(den)).unwrap_or(u64::MAX)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::from_nanoseconds(1_000_000)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAware {
    pub earliest_transmit_offset: u64,
    pub latest_transmit_offset: u64,
    pub jitter: u64,
}

/// Talker traffic specification. Devices declare the same shape as
/// their capability ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSpecification {
    pub interval: Interval,
    pub max_frames_per_interval: u32,
    pub max_frame_size: u32,
    /// Zero means frame size times frames per interval.
    #[serde(default)]
    pub max_bytes_per_interval: u32,
    #[serde(default)]
    pub time_aware: TimeAware,
}

impl Default for TrafficSpecification {
    fn default() -> Self {
        Self {
            interval: Interval::default(),
            max_frames_per_interval: 1,
            max_frame_size: 1500,
            max_bytes_per_interval: 0,
            time_aware: TimeAware::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub device_type: DeviceType,
    pub mac_address: MacAddress,
    pub ipv4: Ipv4Addr,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    /// Traffic the device can source, as declared by its profile.
    #[serde(default)]
    pub capability: TrafficSpecification,
    #[serde(default)]
    pub device_profile_id: i64,
}

impl Device {
    pub fn interface(&self, id: InterfaceId) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.id == id)
    }

    pub fn interface_mut(&mut self, id: InterfaceId) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| i.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source_device_id: DeviceId,
    pub source_interface_id: InterfaceId,
    pub destination_device_id: DeviceId,
    pub destination_interface_id: InterfaceId,
    /// Link speed in Mbit/s.
    pub speed: u64,
}

impl Link {
    /// Bandwidth in bit/s.
    pub fn bandwidth(&self) -> u64 {
        self.speed
            .saturating_mul(TRANSFER_RATE)
            .saturating_mul(TRANSFER_RATE)
    }

    pub fn touches_device(&self, device: DeviceId) -> bool {
        self.source_device_id == device || self.destination_device_id == device
    }

    pub fn touches(&self, device: DeviceId, interface: InterfaceId) -> bool {
        (self.source_device_id == device && self.source_interface_id == interface)
            || (self.destination_device_id == device && self.destination_interface_id == interface)
    }

    pub fn endpoints(&self) -> [(DeviceId, InterfaceId); 2] {
        [
            (self.source_device_id, self.source_interface_id),
            (self.destination_device_id, self.destination_interface_id),
        ]
    }
}

/// Vendor model description mirrored to the digital twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub id: i64,
    pub model_name: String,
    /// GCL applied to a device of this model until the project sets one.
    #[serde(default)]
    pub default_gcl: Option<super::gcl::GclTable>,
}
