//! Control-plane core for TSN network designs.
//!
//! This crate owns the project model and everything that keeps it
//! consistent while users edit it and long-running engines work on it:
//!
//! - **[`Controller`]**: the service object. [`start()`](Controller::start)
//!   spawns the command processor; edits arrive as [`Command`]s and run one
//!   at a time, each as a single undoable transaction.
//!
//! - **[`ProjectStore`]**: authoritative design and operation copies of each
//!   project, a per-project status board built on `tokio::sync::watch`, and
//!   change detection that stages patch messages on every write.
//!
//! - **[`JobController`]**: at most one background job per project plus one
//!   system job. Workers poll their engine on a fixed cadence, honor
//!   cancellation between polls, and roll back when the final write fails.
//!
//! - **[`NotificationHub`]** and **[`ListenerRegistry`]**: coalesce patch
//!   messages per entity path, then fan them out to bounded listener queues
//!   and the digital twin without blocking the caller.
//!
//! - **[`TransactionManager`]**: bounded undo/redo over whole-project
//!   snapshots, with multi-call batching.
//!
//! - **Feasibility checks** ([`validate`]): cycle settings, stream
//!   admission, and the gate control list codec. Pure functions that run
//!   before any write.

pub mod command;
pub mod config;
pub mod controller;
mod edit;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod job;
pub mod limits;
pub mod listener;
pub mod model;
pub mod notify;
pub mod store;
pub mod stream;
pub mod transaction;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::CoreConfig;
pub use controller::Controller;
pub use error::{CoreError, PersistError};
pub use job::{
    AlgorithmProvider, AlgorithmStatus, JobController, JobEngine, JobKind, NoAlgorithms,
    ProjectAlgorithm, SystemAlgorithm,
};
pub use listener::{ListenerRegistry, ListenerSubscription, Scope};
pub use notify::{DigitalTwinSink, FeatureFlags, NoTwin, Notification, NotificationHub, TwinEntity};
pub use store::{MemoryRepository, ProjectRepository, ProjectStore};
pub use stream::{ListenerStream, StatusStream, StatusSubscription};
pub use transaction::TransactionManager;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ConnectionId, CycleSetting, Device, DeviceConfig, DeviceProfile, DeviceTimeSlotSetting,
    DeviceType, Link, MacAddress, Project, ProjectId, ProjectStatus, ProjectView, Stream,
    StreamStatus,
};
