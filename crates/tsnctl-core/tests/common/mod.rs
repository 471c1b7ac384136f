// Shared fixtures for the integration tests.
//
// es-1 (1) ── sw-1 (2) ── es-2 (3)
//                 └────── es-3 (4)

#![allow(dead_code, clippy::unwrap_used)]

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tsnctl_core::model::{
    ComputedResult, DataFrameSpecification, Device, DeviceType, EndStationInterface, GclTable,
    Interface, Interval, Link, MacAddress, MacAddresses, Project, ProjectId, QosType, Stream,
    StreamListener, StreamStatus, StreamTrafficType, Talker, TimeAware, TrafficSpecification,
    UntaggedMode, UserToNetworkRequirement, VlanTag,
};
use tsnctl_core::{
    AlgorithmProvider, AlgorithmStatus, Command, CommandResult, Controller, CoreConfig, CoreError,
    DigitalTwinSink, JobEngine, JobKind, ListenerSubscription, MemoryRepository, ProjectAlgorithm,
    ProjectRepository, SystemAlgorithm,
};

// ── Topology ────────────────────────────────────────────────────────

pub fn device(id: i64, device_type: DeviceType, ports: i64) -> Device {
    let last = u8::try_from(id).unwrap();
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
        capability: TrafficSpecification {
            interval: Interval::from_nanoseconds(999_999_999),
            max_frames_per_interval: 65_535,
            max_frame_size: 1500,
            max_bytes_per_interval: 0,
            time_aware: TimeAware {
                earliest_transmit_offset: 999_999_999,
                latest_transmit_offset: 999_999_999,
                jitter: 999_999_999,
            },
        },
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

pub fn project(name: &str) -> Project {
    let mut p = Project::new(ProjectId::UNKNOWN, name);
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

/// Multicast cyclic stream, 100 bytes every 1 ms.
pub fn stream(name: &str, talker: (i64, i64), listener: (i64, i64)) -> Stream {
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

/// Same stream with a user-defined VLAN tag.
pub fn tagged_stream(name: &str, talker: (i64, i64), listener: (i64, i64), vlan_id: u16) -> Stream {
    let mut s = stream(name, talker, listener);
    s.user_defined_vlan = true;
    s.talker
        .data_frame_specifications
        .push(DataFrameSpecification::VlanTag(VlanTag {
            vlan_id,
            priority_code_point: 5,
        }));
    s
}

// ── Mock engines ────────────────────────────────────────────────────

/// Engine that reports `Running` a fixed number of times, then finishes.
pub struct MockEngine {
    polls: AtomicU32,
    finish_after: u32,
    stop_delay: Duration,
    fail_start: bool,
    pub stopped: AtomicBool,
}

impl MockEngine {
    fn new(finish_after: u32, stop_delay: Duration, fail_start: bool) -> Self {
        Self {
            polls: AtomicU32::new(0),
            finish_after,
            stop_delay,
            fail_start,
            stopped: AtomicBool::new(false),
        }
    }

    fn begin(&self) -> Result<(), CoreError> {
        if self.fail_start {
            Err(CoreError::Internal("engine unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl JobEngine for MockEngine {
    fn status(&self) -> AlgorithmStatus {
        if self.stopped.load(Ordering::SeqCst) {
            return AlgorithmStatus::Stopped;
        }
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if n > self.finish_after {
            AlgorithmStatus::Finished
        } else {
            let progress = u8::try_from(n * 100 / (self.finish_after + 1)).unwrap();
            AlgorithmStatus::Running { progress }
        }
    }

    fn stop(&self) -> Result<(), CoreError> {
        std::thread::sleep(self.stop_delay);
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl ProjectAlgorithm for MockEngine {
    fn start(&self, _project: &Project) -> Result<(), CoreError> {
        self.begin()
    }

    /// Writes a one-table result for the switch.
    fn apply(&self, project: &mut Project) -> Result<(), CoreError> {
        let mut result = ComputedResult::default();
        result.gcl_tables.insert(2, GclTable::empty(2));
        project.computed_result = Some(result);
        Ok(())
    }
}

impl SystemAlgorithm for MockEngine {
    fn start(&self) -> Result<(), CoreError> {
        self.begin()
    }

    fn report(&self) -> Value {
        serde_json::json!({ "DeviceCount": 3 })
    }
}

#[derive(Default)]
pub struct MockProvider {
    pub finish_after: u32,
    pub stop_delay: Duration,
    pub fail_start: bool,
    pub engines: Mutex<Vec<Arc<MockEngine>>>,
}

impl MockProvider {
    pub fn finishing_after(polls: u32) -> Self {
        Self {
            finish_after: polls,
            ..Self::default()
        }
    }

    pub fn last_engine(&self) -> Arc<MockEngine> {
        Arc::clone(self.engines.lock().unwrap().last().unwrap())
    }

    fn build(&self) -> Arc<MockEngine> {
        let engine = Arc::new(MockEngine::new(
            self.finish_after,
            self.stop_delay,
            self.fail_start,
        ));
        self.engines.lock().unwrap().push(Arc::clone(&engine));
        engine
    }
}

impl AlgorithmProvider for MockProvider {
    fn project_algorithm(&self, _kind: JobKind) -> Result<Arc<dyn ProjectAlgorithm>, CoreError> {
        Ok(self.build())
    }

    fn system_algorithm(&self) -> Result<Arc<dyn SystemAlgorithm>, CoreError> {
        Ok(self.build())
    }
}

// ── Controller helpers ──────────────────────────────────────────────

pub async fn controller_with(
    repository: Arc<dyn ProjectRepository>,
    twin: Arc<dyn DigitalTwinSink>,
    provider: Arc<dyn AlgorithmProvider>,
) -> Controller {
    let config = CoreConfig {
        poll_interval: Duration::from_secs(1),
        ..CoreConfig::default()
    };
    let controller = Controller::new(config, repository, twin, provider);
    controller.start().await.unwrap();
    controller
}

pub async fn controller(provider: Arc<dyn AlgorithmProvider>) -> Controller {
    controller_with(
        Arc::new(MemoryRepository::new()),
        Arc::new(tsnctl_core::NoTwin),
        provider,
    )
    .await
}

pub async fn import(controller: &Controller, name: &str) -> ProjectId {
    match controller
        .execute(Command::ImportProject {
            project: Box::new(project(name)),
        })
        .await
        .unwrap()
    {
        CommandResult::Project(p) => p.id,
        other => panic!("unexpected result: {other:?}"),
    }
}

/// Drain every queued message as JSON.
pub fn drain(sub: &mut ListenerSubscription) -> Vec<Value> {
    let mut out = Vec::new();
    while let Some(msg) = sub.try_recv() {
        out.push(serde_json::from_str(&msg).unwrap());
    }
    out
}
