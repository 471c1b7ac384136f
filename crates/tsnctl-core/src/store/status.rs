// ── Project status board ──
//
// One `watch` channel per project so status can be read and awaited
// without touching the project lock.

use dashmap::DashMap;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::model::{ProjectId, ProjectStatus};
use crate::stream::StatusSubscription;

#[derive(Default)]
pub(crate) struct StatusBoard {
    channels: DashMap<ProjectId, watch::Sender<ProjectStatus>>,
}

impl StatusBoard {
    pub(crate) fn insert(&self, id: ProjectId) {
        let (tx, _) = watch::channel(ProjectStatus::Idle);
        self.channels.insert(id, tx);
    }

    /// Dropping the sender ends every subscription.
    pub(crate) fn remove(&self, id: ProjectId) {
        self.channels.remove(&id);
    }

    pub(crate) fn get(&self, id: ProjectId) -> Option<ProjectStatus> {
        self.channels.get(&id).map(|tx| *tx.borrow())
    }

    pub(crate) fn set(&self, id: ProjectId, status: ProjectStatus) {
        if let Some(tx) = self.channels.get(&id) {
            // `send_replace` updates even with zero receivers.
            tx.send_replace(status);
        }
    }

    /// Move to `running` only if the current status admits a new job.
    /// Returns the blocking status otherwise.
    pub(crate) fn try_begin(&self, id: ProjectId, running: ProjectStatus) -> Result<(), CoreError> {
        let tx = self
            .channels
            .get(&id)
            .ok_or_else(|| CoreError::not_found("Project", id))?;

        let mut blocking = None;
        tx.send_if_modified(|current| {
            if current.is_settled() {
                *current = running;
                true
            } else {
                blocking = Some(*current);
                false
            }
        });

        match blocking {
            None => Ok(()),
            Some(current) => Err(CoreError::bad_request(format!(
                "Project ({id}) - The job cannot start because the project is {current}"
            ))),
        }
    }

    pub(crate) fn subscribe(&self, id: ProjectId) -> Option<StatusSubscription> {
        self.channels
            .get(&id)
            .map(|tx| StatusSubscription::new(tx.subscribe()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn begin_is_rejected_while_running() {
        let board = StatusBoard::default();
        board.insert(ProjectId(1));
        board.try_begin(ProjectId(1), ProjectStatus::Computing).unwrap();

        let err = board
            .try_begin(ProjectId(1), ProjectStatus::Deploying)
            .unwrap_err();
        assert!(err.to_string().contains("is Computing"));
        assert_eq!(board.get(ProjectId(1)), Some(ProjectStatus::Computing));

        board.set(ProjectId(1), ProjectStatus::Aborted);
        board.try_begin(ProjectId(1), ProjectStatus::Deploying).unwrap();
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let board = StatusBoard::default();
        board.insert(ProjectId(1));
        let mut sub = board.subscribe(ProjectId(1)).unwrap();
        assert_eq!(sub.current(), ProjectStatus::Idle);

        board.set(ProjectId(1), ProjectStatus::Finished);
        assert_eq!(sub.changed().await, Some(ProjectStatus::Finished));

        board.remove(ProjectId(1));
        assert_eq!(sub.changed().await, None);
    }
}
