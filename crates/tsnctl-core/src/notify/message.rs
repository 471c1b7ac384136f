// ── Listener message types ──
//
// Field order in every message struct is part of the wire contract with
// legacy clients: serde_json emits struct fields in declaration order, and
// each type exposes the same order as `KEY_ORDER`.

use serde::Serialize;
use strum::Display;

use crate::error::{CoreError, status_code};
use crate::model::{
    ComputedResult, CycleSetting, Device, DeviceConfig, DeviceProfile, Link, Project, ProjectId,
    Stream,
};

/// Operation codes carried in `OpCode`.
pub mod op_code {
    pub const START_COMPUTE: i64 = 0x0001;
    pub const START_COMPARE: i64 = 0x0101;
    pub const START_DEPLOY: i64 = 0x0201;
    pub const START_DEVICE_DISCOVERY: i64 = 0x0401;
    pub const START_TOPOLOGY_MAPPING: i64 = 0x0701;
    pub const PATCH_UPDATE: i64 = 0x1001;
    pub const FEATURES_AVAILABLE: i64 = 0x1002;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PatchAction {
    Create,
    Update,
    Delete,
}

/// Entity carried by a patch message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PatchData {
    Project(Box<Project>),
    DeviceProfile(DeviceProfile),
    Device(Device),
    Link(Link),
    Stream(Box<Stream>),
    CycleSetting(CycleSetting),
    DeviceConfig(DeviceConfig),
    ComputedResult(ComputedResult),
}

impl PatchData {
    /// Entity path, e.g. `Projects/1001/Devices/1001`.
    pub fn path(&self, project_id: ProjectId) -> String {
        match self {
            Self::Project(_) => format!("Projects/{project_id}"),
            Self::DeviceProfile(p) => format!("DeviceProfiles/{}", p.id),
            Self::Device(d) => format!("Projects/{project_id}/Devices/{}", d.id),
            Self::Link(l) => format!("Projects/{project_id}/Links/{}", l.id),
            Self::Stream(s) => format!("Projects/{project_id}/Streams/{}", s.id),
            Self::CycleSetting(_) => format!("Projects/{project_id}/CycleSetting"),
            Self::DeviceConfig(_) => format!("Projects/{project_id}/DeviceConfig"),
            Self::ComputedResult(_) => format!("Projects/{project_id}/ComputedResult"),
        }
    }

    /// Whether the digital twin mirrors this entity kind.
    pub fn is_twin_entity(&self) -> bool {
        matches!(self, Self::Project(_) | Self::DeviceProfile(_))
    }
}

// ── Message bodies ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatchMessage {
    pub op_code: i64,
    pub path: String,
    pub action: PatchAction,
    pub data: PatchData,
}

impl PatchMessage {
    pub const KEY_ORDER: [&'static str; 4] = ["OpCode", "Path", "Action", "Data"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureFlags {
    pub undo: bool,
    pub redo: bool,
    pub deploy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeaturesMessage {
    pub op_code: i64,
    pub status_code: i64,
    pub data: FeatureFlags,
}

impl FeaturesMessage {
    pub const KEY_ORDER: [&'static str; 3] = ["OpCode", "StatusCode", "Data"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProgressData {
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProgressMessage {
    pub op_code: i64,
    pub status_code: i64,
    pub data: ProgressData,
}

impl ProgressMessage {
    pub const KEY_ORDER: [&'static str; 3] = ["OpCode", "StatusCode", "Data"];
}

/// Final payload of a system job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportMessage {
    pub op_code: i64,
    pub status_code: i64,
    pub data: serde_json::Value,
}

impl ReportMessage {
    pub const KEY_ORDER: [&'static str; 3] = ["OpCode", "StatusCode", "Data"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorMessage {
    pub op_code: i64,
    pub status_code: i64,
    pub error_message: String,
}

impl ErrorMessage {
    pub const KEY_ORDER: [&'static str; 3] = ["OpCode", "StatusCode", "ErrorMessage"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Patch(PatchMessage),
    Features(FeaturesMessage),
    Progress(ProgressMessage),
    Report(ReportMessage),
    Error(ErrorMessage),
}

// ── Notification ────────────────────────────────────────────────────

/// A message plus the flags deciding where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub body: MessageBody,
    /// Send over the listener scope.
    pub sync_to_websocket: bool,
    /// Mirror to the digital twin. Only honored for project and device
    /// profile patches.
    pub sync_to_twin: bool,
}

impl Notification {
    pub fn patch(project_id: ProjectId, action: PatchAction, data: PatchData, sync: bool) -> Self {
        let sync_to_twin = data.is_twin_entity();
        Self {
            body: MessageBody::Patch(PatchMessage {
                op_code: op_code::PATCH_UPDATE,
                path: data.path(project_id),
                action,
                data,
            }),
            sync_to_websocket: sync,
            sync_to_twin,
        }
    }

    pub fn features(flags: FeatureFlags) -> Self {
        Self::listener_only(MessageBody::Features(FeaturesMessage {
            op_code: op_code::FEATURES_AVAILABLE,
            status_code: status_code::SUCCESS,
            data: flags,
        }))
    }

    pub fn progress(op_code: i64, progress: u8) -> Self {
        Self::listener_only(MessageBody::Progress(ProgressMessage {
            op_code,
            status_code: status_code::RUNNING,
            data: ProgressData {
                progress: progress.min(100),
            },
        }))
    }

    pub fn finished(op_code: i64) -> Self {
        Self::listener_only(MessageBody::Progress(ProgressMessage {
            op_code,
            status_code: status_code::FINISHED,
            data: ProgressData { progress: 100 },
        }))
    }

    pub fn report(op_code: i64, data: serde_json::Value) -> Self {
        Self::listener_only(MessageBody::Report(ReportMessage {
            op_code,
            status_code: status_code::FINISHED,
            data,
        }))
    }

    pub fn error(op_code: i64, error: &CoreError) -> Self {
        Self::listener_only(MessageBody::Error(ErrorMessage {
            op_code,
            status_code: error.status_code(),
            error_message: error.to_string(),
        }))
    }

    fn listener_only(body: MessageBody) -> Self {
        Self {
            body,
            sync_to_websocket: true,
            sync_to_twin: false,
        }
    }

    /// Staging key. Patches coalesce by entity path; other messages by op code.
    pub fn staging_key(&self) -> String {
        match &self.body {
            MessageBody::Patch(p) => p.path.clone(),
            MessageBody::Features(m) => format!("op:{}", m.op_code),
            MessageBody::Progress(m) => format!("op:{}", m.op_code),
            MessageBody::Report(m) => format!("op:{}", m.op_code),
            MessageBody::Error(m) => format!("op:{}", m.op_code),
        }
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(&self.body)
            .map_err(|e| CoreError::Internal(format!("message serialization failed: {e}")))
    }
}
