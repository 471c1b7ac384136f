// ── Persistence seam ──

use dashmap::DashMap;

use crate::error::PersistError;
use crate::model::{Project, ProjectId, ProjectView};

/// Durable storage behind the project store.
///
/// A successful `save` is assumed durable. The store applies a write to
/// memory only after the repository accepts it, and job rollback relies
/// on that ordering.
pub trait ProjectRepository: Send + Sync {
    fn save(&self, project: &Project, view: ProjectView) -> Result<(), PersistError>;

    fn remove(&self, id: ProjectId) -> Result<(), PersistError>;
}

/// Repository that keeps the last saved copy of each project in memory.
#[derive(Default)]
pub struct MemoryRepository {
    design: DashMap<ProjectId, Project>,
    operation: DashMap<ProjectId, Project>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved copy of a project.
    pub fn saved(&self, id: ProjectId, view: ProjectView) -> Option<Project> {
        let map = match view {
            ProjectView::Design => &self.design,
            ProjectView::Operation => &self.operation,
        };
        map.get(&id).map(|p| p.value().clone())
    }
}

impl ProjectRepository for MemoryRepository {
    fn save(&self, project: &Project, view: ProjectView) -> Result<(), PersistError> {
        let map = match view {
            ProjectView::Design => &self.design,
            ProjectView::Operation => &self.operation,
        };
        map.insert(project.id, project.clone());
        Ok(())
    }

    fn remove(&self, id: ProjectId) -> Result<(), PersistError> {
        self.design.remove(&id);
        self.operation.remove(&id);
        Ok(())
    }
}
