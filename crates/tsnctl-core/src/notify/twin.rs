// ── Digital twin sink ──

use crate::error::CoreError;
use crate::model::{DeviceProfile, Project};

/// Entity kinds the twin mirrors.
#[derive(Debug, Clone, Copy)]
pub enum TwinEntity<'a> {
    Project(&'a Project),
    DeviceProfile(&'a DeviceProfile),
}

/// External mirror of projects and device profiles. Failures are reported
/// to the hub, which logs them without affecting listener delivery.
pub trait DigitalTwinSink: Send + Sync {
    fn upsert(&self, entity: TwinEntity<'_>) -> Result<(), CoreError>;

    fn remove(&self, entity: TwinEntity<'_>) -> Result<(), CoreError>;
}

/// Sink used when no twin is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTwin;

impl DigitalTwinSink for NoTwin {
    fn upsert(&self, _entity: TwinEntity<'_>) -> Result<(), CoreError> {
        Ok(())
    }

    fn remove(&self, _entity: TwinEntity<'_>) -> Result<(), CoreError> {
        Ok(())
    }
}
