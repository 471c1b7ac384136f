// ── Notification hub ──
//
// Coalesces per-entity patch messages per project, then fans them out to
// the listener registry and the digital twin. The two sinks fail
// independently.

pub mod message;
pub mod staging;
pub mod twin;

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::listener::{ListenerRegistry, Scope};
use crate::model::ProjectId;

pub use message::{
    FeatureFlags, MessageBody, Notification, PatchAction, PatchData, PatchMessage, op_code,
};
pub use staging::StagingBuffer;
pub use twin::{DigitalTwinSink, NoTwin, TwinEntity};

pub struct NotificationHub {
    staged: DashMap<ProjectId, StagingBuffer>,
    listeners: Arc<ListenerRegistry>,
    twin: Arc<dyn DigitalTwinSink>,
}

impl NotificationHub {
    pub fn new(listeners: Arc<ListenerRegistry>, twin: Arc<dyn DigitalTwinSink>) -> Self {
        Self {
            staged: DashMap::new(),
            listeners,
            twin,
        }
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    /// Queue a message for `project_id`, replacing any pending message
    /// for the same path.
    pub fn stage(&self, project_id: ProjectId, notification: Notification) {
        self.staged
            .entry(project_id)
            .or_default()
            .stage(notification);
    }

    /// Drop pending messages without sending them.
    pub fn discard(&self, project_id: ProjectId) {
        self.staged.remove(&project_id);
    }

    pub fn pending(&self, project_id: ProjectId) -> usize {
        self.staged.get(&project_id).map_or(0, |b| b.len())
    }

    /// Send every pending message for `project_id` to its project scope,
    /// devices first, then links, then streams. Returns the number of
    /// messages dispatched.
    pub fn flush(&self, project_id: ProjectId) -> usize {
        // Take the buffer out first so a concurrent stage starts a new one.
        let Some((_, buffer)) = self.staged.remove(&project_id) else {
            return 0;
        };

        let mut sent = 0;
        for notification in buffer.into_ordered() {
            if let Err(e) = self.dispatch(Scope::Project(project_id), &notification) {
                warn!(project_id = %project_id, error = %e, "dispatch failed during flush");
            }
            sent += 1;
        }
        debug!(project_id = %project_id, sent, "notifications flushed");
        sent
    }

    /// Deliver one message now.
    ///
    /// Twin mirroring runs first and only logs on failure. The listener
    /// send is gated by `sync_to_websocket` and its error is returned.
    pub fn dispatch(&self, scope: Scope, notification: &Notification) -> Result<(), CoreError> {
        if notification.sync_to_twin {
            self.mirror_to_twin(notification);
        }

        if !notification.sync_to_websocket {
            return Ok(());
        }

        let json = notification.to_json()?;
        self.listeners.send(scope, &json)?;
        Ok(())
    }

    fn mirror_to_twin(&self, notification: &Notification) {
        let MessageBody::Patch(patch) = &notification.body else {
            return;
        };
        let entity = match &patch.data {
            PatchData::Project(p) => TwinEntity::Project(p),
            PatchData::DeviceProfile(p) => TwinEntity::DeviceProfile(p),
            _ => return,
        };

        let result = match patch.action {
            PatchAction::Create | PatchAction::Update => self.twin.upsert(entity),
            PatchAction::Delete => self.twin.remove(entity),
        };
        if let Err(e) = result {
            warn!(path = %patch.path, action = %patch.action, error = %e, "digital twin mirror failed");
        }
    }
}
