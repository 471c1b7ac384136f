// ── Algorithm engine contract ──
//
// The scheduling, mapping, comparison, deployment and discovery engines
// live outside the core. Their calls are synchronous; the job worker
// polls `status` on its own cadence.

use std::sync::Arc;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::CoreError;
use crate::model::{Project, ProjectStatus};
use crate::notify::op_code;

/// Status reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmStatus {
    Running { progress: u8 },
    Finished,
    /// The engine stopped on its own.
    Stopped,
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
pub enum JobKind {
    Compute,
    TopologyMapping,
    Compare,
    Deploy,
    BroadcastSearch,
}

impl JobKind {
    /// Status the project holds while the job runs.
    pub fn running_status(self) -> ProjectStatus {
        match self {
            Self::Compute => ProjectStatus::Computing,
            Self::TopologyMapping => ProjectStatus::TopologyMapping,
            Self::Compare => ProjectStatus::Comparing,
            Self::Deploy => ProjectStatus::Deploying,
            Self::BroadcastSearch => ProjectStatus::BroadcastSearching,
        }
    }

    pub fn op_code(self) -> i64 {
        match self {
            Self::Compute => op_code::START_COMPUTE,
            Self::TopologyMapping => op_code::START_TOPOLOGY_MAPPING,
            Self::Compare => op_code::START_COMPARE,
            Self::Deploy => op_code::START_DEPLOY,
            Self::BroadcastSearch => op_code::START_DEVICE_DISCOVERY,
        }
    }

    /// Runs without a project, in the single system slot.
    pub fn is_system(self) -> bool {
        self == Self::BroadcastSearch
    }
}

/// Calls shared by every engine.
pub trait JobEngine: Send + Sync {
    fn status(&self) -> AlgorithmStatus;

    /// Ask the engine to stop. May block until it has.
    fn stop(&self) -> Result<(), CoreError>;
}

/// Engine that works on a private copy of one project.
pub trait ProjectAlgorithm: JobEngine {
    fn start(&self, project: &Project) -> Result<(), CoreError>;

    /// Write the engine's result into `project`.
    fn apply(&self, project: &mut Project) -> Result<(), CoreError>;
}

/// Engine that runs without a project, e.g. device discovery.
pub trait SystemAlgorithm: JobEngine {
    fn start(&self) -> Result<(), CoreError>;

    /// Final payload sent to system listeners.
    fn report(&self) -> serde_json::Value;
}

/// Builds a fresh engine for each job.
pub trait AlgorithmProvider: Send + Sync {
    fn project_algorithm(&self, kind: JobKind) -> Result<Arc<dyn ProjectAlgorithm>, CoreError>;

    fn system_algorithm(&self) -> Result<Arc<dyn SystemAlgorithm>, CoreError>;
}

/// Provider for deployments without engines. Every start fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAlgorithms;

impl AlgorithmProvider for NoAlgorithms {
    fn project_algorithm(&self, kind: JobKind) -> Result<Arc<dyn ProjectAlgorithm>, CoreError> {
        Err(CoreError::Internal(format!("no engine available for {kind}")))
    }

    fn system_algorithm(&self) -> Result<Arc<dyn SystemAlgorithm>, CoreError> {
        Err(CoreError::Internal(format!(
            "no engine available for {}",
            JobKind::BroadcastSearch
        )))
    }
}
