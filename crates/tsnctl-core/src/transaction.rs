// ── Transaction manager ──
//
// Undo/redo history over whole-project snapshots. A transaction collects
// the pre-mutation snapshots of one logical edit; committing turns them
// into a single undo entry.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::listener::Scope;
use crate::model::{Project, ProjectId, ProjectView};
use crate::notify::{FeatureFlags, Notification, PatchAction, PatchData};
use crate::store::ProjectStore;

/// Snapshots saved during one transaction, oldest first.
type Entry = Vec<Project>;

#[derive(Default)]
struct History {
    undo: VecDeque<Entry>,
    redo: VecDeque<Entry>,
    pending: Entry,
    open: bool,
    multiple: bool,
}

fn push_bounded(stack: &mut VecDeque<Entry>, entry: Entry, limit: usize) {
    stack.push_back(entry);
    while stack.len() > limit {
        stack.pop_front();
    }
}

pub struct TransactionManager {
    histories: DashMap<ProjectId, History>,
    store: Arc<ProjectStore>,
    history_limit: usize,
    warn_size: usize,
}

impl TransactionManager {
    pub fn new(store: Arc<ProjectStore>, history_limit: usize, warn_size: usize) -> Self {
        Self {
            histories: DashMap::new(),
            store,
            history_limit: history_limit.max(1),
            warn_size,
        }
    }

    // ── Bracketing ───────────────────────────────────────────────────

    /// Open a transaction. While multi-mode is on, an already open
    /// transaction is simply continued.
    pub fn start(&self, id: ProjectId) -> Result<(), CoreError> {
        let mut history = self.histories.entry(id).or_default();
        if history.open && !history.multiple {
            return Err(CoreError::bad_request("Transaction is running"));
        }
        history.open = true;
        Ok(())
    }

    /// Record a snapshot taken before a mutation.
    pub fn save(&self, project: &Project) -> Result<(), CoreError> {
        let mut history = self.histories.entry(project.id).or_default();
        if !history.open {
            return Err(CoreError::bad_request("Transaction is not running"));
        }
        history.pending.push(project.clone());

        let pending = history.pending.len();
        if pending > self.warn_size {
            warn!(project_id = %project.id, pending, "transaction snapshot list is growing");
        }
        Ok(())
    }

    /// Close the transaction and drop its snapshots.
    pub fn stop(&self, id: ProjectId) -> Result<(), CoreError> {
        let mut history = self
            .histories
            .get_mut(&id)
            .filter(|h| h.open)
            .ok_or_else(|| CoreError::bad_request("Transaction is not running"))?;
        history.open = false;
        history.pending.clear();
        Ok(())
    }

    /// Turn the pending snapshots into one undo entry and clear redo.
    /// A no-op while multi-mode is on.
    pub fn commit(&self, id: ProjectId) -> Result<(), CoreError> {
        let mut history = self
            .histories
            .get_mut(&id)
            .filter(|h| h.open)
            .ok_or_else(|| CoreError::bad_request("Transaction is not running"))?;
        if history.multiple {
            return Ok(());
        }

        history.open = false;
        let pending = std::mem::take(&mut history.pending);
        if pending.is_empty() {
            return Ok(());
        }
        push_bounded(&mut history.undo, pending, self.history_limit);
        history.redo.clear();
        debug!(project_id = %id, depth = history.undo.len(), "transaction committed");
        Ok(())
    }

    /// Drop the most recent snapshot after its write failed. Closes the
    /// transaction unless multi-mode keeps it open.
    pub fn abandon(&self, id: ProjectId) {
        if let Some(mut history) = self.histories.get_mut(&id) {
            history.pending.pop();
            if !history.multiple {
                history.open = false;
                history.pending.clear();
            }
        }
    }

    pub fn is_open(&self, id: ProjectId) -> bool {
        self.histories.get(&id).is_some_and(|h| h.open)
    }

    pub fn enable_multiple(&self, id: ProjectId) -> Result<(), CoreError> {
        let mut history = self.histories.entry(id).or_default();
        if history.multiple {
            return Err(CoreError::bad_request("Multiple transaction is already enabled"));
        }
        history.multiple = true;
        Ok(())
    }

    /// Leave multi-mode. The open transaction stays open until committed.
    pub fn disable_multiple(&self, id: ProjectId) -> Result<(), CoreError> {
        let mut history = self
            .histories
            .get_mut(&id)
            .filter(|h| h.multiple)
            .ok_or_else(|| CoreError::bad_request("Multiple transaction is not enabled"))?;
        history.multiple = false;
        Ok(())
    }

    // ── Undo / redo ──────────────────────────────────────────────────

    pub fn can_undo(&self, id: ProjectId) -> bool {
        self.histories.get(&id).is_some_and(|h| !h.undo.is_empty())
    }

    pub fn can_redo(&self, id: ProjectId) -> bool {
        self.histories.get(&id).is_some_and(|h| !h.redo.is_empty())
    }

    pub fn features(&self, id: ProjectId) -> FeatureFlags {
        FeatureFlags {
            undo: self.can_undo(id),
            redo: self.can_redo(id),
            deploy: self.store.deploy_available(id),
        }
    }

    /// Restore the state before the last committed transaction.
    pub async fn undo(&self, id: ProjectId) -> Result<Project, CoreError> {
        self.step(id, Direction::Undo).await
    }

    pub async fn redo(&self, id: ProjectId) -> Result<Project, CoreError> {
        self.step(id, Direction::Redo).await
    }

    async fn step(&self, id: ProjectId, direction: Direction) -> Result<Project, CoreError> {
        let entry = self
            .histories
            .get_mut(&id)
            .and_then(|mut h| direction.from(&mut h).pop_back())
            .ok_or_else(|| CoreError::bad_request(direction.empty_message()))?;

        let (target, current) = match self.swap_in(id, &entry).await {
            Ok(pair) => pair,
            Err(e) => {
                // Put the entry back so the history is unchanged.
                if let Some(mut h) = self.histories.get_mut(&id) {
                    direction.from(&mut h).push_back(entry);
                }
                return Err(e);
            }
        };

        if let Some(mut h) = self.histories.get_mut(&id) {
            push_bounded(direction.to(&mut h), vec![current], self.history_limit);
        }
        self.announce(&target);
        debug!(project_id = %id, ?direction, "history step applied");
        Ok(target)
    }

    /// Write the entry's oldest snapshot, returning it and the replaced state.
    async fn swap_in(&self, id: ProjectId, entry: &Entry) -> Result<(Project, Project), CoreError> {
        let target = entry
            .first()
            .cloned()
            .ok_or_else(|| CoreError::Internal("empty history entry".into()))?;
        let current = self.store.get(id, ProjectView::Design).await?;
        self.store.restore(target.clone(), ProjectView::Design).await?;
        Ok((target, current))
    }

    fn announce(&self, project: &Project) {
        let id = project.id;
        let hub = self.store.hub();
        let messages = [
            Notification::patch(
                id,
                PatchAction::Update,
                PatchData::Project(Box::new(project.clone())),
                true,
            ),
            Notification::features(self.features(id)),
        ];
        for message in &messages {
            if let Err(e) = hub.dispatch(Scope::Project(id), message) {
                warn!(project_id = %id, error = %e, "history notification failed");
            }
        }
    }

    /// Drop all history for a removed project.
    pub fn forget(&self, id: ProjectId) {
        self.histories.remove(&id);
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn from(self, history: &mut History) -> &mut VecDeque<Entry> {
        match self {
            Self::Undo => &mut history.undo,
            Self::Redo => &mut history.redo,
        }
    }

    fn to(self, history: &mut History) -> &mut VecDeque<Entry> {
        match self {
            Self::Undo => &mut history.redo,
            Self::Redo => &mut history.undo,
        }
    }

    fn empty_message(self) -> &'static str {
        match self {
            Self::Undo => "Can not undo project",
            Self::Redo => "Can not redo project",
        }
    }
}
