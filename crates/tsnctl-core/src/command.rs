// ── Command API ──
//
// Every project edit flows through a unified `Command` enum. The
// controller's processor task applies commands one at a time, each as
// a single transaction.

use crate::error::CoreError;
use crate::model::{
    CycleSetting, Device, DeviceProfile, DeviceTimeSlotSetting, Link, Project, ProjectId, Stream,
};

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All write operations against the project model.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Project lifecycle ────────────────────────────────────────────
    CreateProject {
        name: String,
    },
    ImportProject {
        project: Box<Project>,
    },
    DeleteProject {
        project_id: ProjectId,
    },

    // ── Streams ──────────────────────────────────────────────────────
    CreateStreams {
        project_id: ProjectId,
        streams: Vec<Stream>,
    },
    UpdateStreams {
        project_id: ProjectId,
        streams: Vec<Stream>,
    },
    DeleteStreams {
        project_id: ProjectId,
        stream_ids: Vec<i64>,
    },

    // ── Topology ─────────────────────────────────────────────────────
    CreateDevice {
        project_id: ProjectId,
        device: Box<Device>,
    },
    UpdateDevice {
        project_id: ProjectId,
        device: Box<Device>,
    },
    DeleteDevice {
        project_id: ProjectId,
        device_id: i64,
    },
    CreateLink {
        project_id: ProjectId,
        link: Link,
    },
    DeleteLink {
        project_id: ProjectId,
        link_id: i64,
    },

    // ── Schedule settings ────────────────────────────────────────────
    UpdateCycleSetting {
        project_id: ProjectId,
        setting: CycleSetting,
    },
    UpdateGclSettings {
        project_id: ProjectId,
        settings: Vec<DeviceTimeSlotSetting>,
    },

    // ── History ──────────────────────────────────────────────────────
    Undo {
        project_id: ProjectId,
    },
    Redo {
        project_id: ProjectId,
    },
    /// Treat the following commands as one transaction until `EndBatch`.
    BeginBatch {
        project_id: ProjectId,
    },
    EndBatch {
        project_id: ProjectId,
    },

    // ── Device profiles ──────────────────────────────────────────────
    UpsertDeviceProfile {
        profile: Box<DeviceProfile>,
    },
    RemoveDeviceProfile {
        profile_id: i64,
    },
}

/// Result of a successfully executed command.
#[derive(Debug, Clone)]
pub enum CommandResult {
    Ok,
    Project(Box<Project>),
    Streams(Vec<Stream>),
    Device(Box<Device>),
    Link(Link),
    DeviceProfile(Box<DeviceProfile>),
}
