// ── Domain model ──

pub mod cycle;
pub mod gcl;
pub mod ids;
pub mod project;
pub mod stream;
pub mod topology;

pub use cycle::{AdminBaseTime, AdminCycleTime, CycleSetting, SlotTrafficType, TimeSlot};
pub use gcl::{
    AdminControl, DeviceTimeSlot, DeviceTimeSlotSetting, GateParameters, GclTable,
    InterfaceGateParameters, PortTimeSlotEntry,
};
pub use ids::{
    ConnectionId, DeviceId, InterfaceId, LinkId, MacAddress, ProjectId, generate_unique_id,
};
pub use project::{
    ComputedResult, DeviceConfig, Project, ProjectStatus, ProjectView, TopologySetting, VlanRange,
};
pub use stream::{
    DataFrameSpecification, EndStationInterface, MacAddresses, QosType, Stream, StreamId,
    StreamListener, StreamStatus, StreamTrafficType, Talker, UntaggedMode,
    UserToNetworkRequirement, VlanTag,
};
pub use topology::{
    Device, DeviceProfile, DeviceType, Interface, Interval, Link, TimeAware, TrafficSpecification,
};
