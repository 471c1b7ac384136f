// ── Project store ──
//
// Authoritative mapping from project id to project. Every mutation is
// read-modify-write under one lock; status and deploy availability live
// beside it so they can be read without that lock.

mod diff;
mod repository;
mod status;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use repository::{MemoryRepository, ProjectRepository};

use crate::error::CoreError;
use crate::listener::Scope;
use crate::model::{
    DeviceProfile, Project, ProjectId, ProjectStatus, ProjectView, generate_unique_id,
};
use crate::notify::{Notification, NotificationHub, PatchAction, PatchData};
use crate::stream::StatusSubscription;
use status::StatusBoard;

struct ProjectEntry {
    design: Project,
    /// Baseline frozen at the last deployment.
    operation: Option<Project>,
}

#[derive(Default)]
struct Projects {
    entries: HashMap<ProjectId, ProjectEntry>,
    last_assigned_id: i64,
}

pub struct ProjectStore {
    projects: Mutex<Projects>,
    status: StatusBoard,
    deploy_available: DashMap<ProjectId, bool>,
    profiles: DashMap<i64, DeviceProfile>,
    repository: Arc<dyn ProjectRepository>,
    hub: Arc<NotificationHub>,
}

impl ProjectStore {
    pub fn new(repository: Arc<dyn ProjectRepository>, hub: Arc<NotificationHub>) -> Self {
        Self {
            projects: Mutex::new(Projects::default()),
            status: StatusBoard::default(),
            deploy_available: DashMap::new(),
            profiles: DashMap::new(),
            repository,
            hub,
        }
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Create an empty project.
    pub async fn create(&self, name: &str) -> Result<Project, CoreError> {
        self.import(Project::new(ProjectId::UNKNOWN, name)).await
    }

    /// Add an existing project under a freshly assigned id.
    pub async fn import(&self, mut project: Project) -> Result<Project, CoreError> {
        let mut projects = self.projects.lock().await;

        if projects
            .entries
            .values()
            .any(|e| e.design.name == project.name)
        {
            return Err(CoreError::bad_request(format!(
                "The project name {} is duplicated",
                project.name
            )));
        }

        let entries = &projects.entries;
        let mut last = projects.last_assigned_id;
        let id = generate_unique_id(&mut last, |c| entries.contains_key(&ProjectId(c)))?;
        project.id = ProjectId(id);
        project.topology_setting.recompute(project.streams.values());
        project.last_modified = Some(Utc::now());

        self.repository.save(&project, ProjectView::Design)?;
        projects.last_assigned_id = last;
        projects.entries.insert(
            project.id,
            ProjectEntry {
                design: project.clone(),
                operation: None,
            },
        );
        drop(projects);

        self.status.insert(project.id);
        self.deploy_available
            .insert(project.id, project.device_config.is_deployable());
        self.announce(&project, PatchAction::Create);
        info!(project_id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    pub async fn remove(&self, id: ProjectId) -> Result<Project, CoreError> {
        let mut projects = self.projects.lock().await;
        if !projects.entries.contains_key(&id) {
            return Err(CoreError::not_found("Project", id));
        }
        self.repository.remove(id)?;
        let entry = projects
            .entries
            .remove(&id)
            .ok_or_else(|| CoreError::not_found("Project", id))?;
        drop(projects);

        self.status.remove(id);
        self.deploy_available.remove(&id);
        self.hub.discard(id);
        self.hub.listeners().unregister_project(id);
        self.announce(&entry.design, PatchAction::Delete);
        info!(project_id = %id, "project removed");
        Ok(entry.design)
    }

    pub async fn ids(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self.projects.lock().await.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn contains(&self, id: ProjectId) -> bool {
        self.projects.lock().await.entries.contains_key(&id)
    }

    // ── Read / write ─────────────────────────────────────────────────

    /// Clone of the requested project copy.
    pub async fn get(&self, id: ProjectId, view: ProjectView) -> Result<Project, CoreError> {
        let projects = self.projects.lock().await;
        let entry = projects
            .entries
            .get(&id)
            .ok_or_else(|| CoreError::not_found("Project", id))?;
        match view {
            ProjectView::Design => Ok(entry.design.clone()),
            ProjectView::Operation => entry
                .operation
                .clone()
                .ok_or_else(|| CoreError::not_found("Operation project", id)),
        }
    }

    /// Write a modified project back.
    ///
    /// For the design view this recomputes derived settings, stamps the
    /// modification time and stages patch messages for every changed
    /// entity. `sync` decides whether those patches reach listeners.
    /// Nothing is staged or written if the repository rejects the save.
    pub async fn update(
        &self,
        mut project: Project,
        sync: bool,
        view: ProjectView,
    ) -> Result<(), CoreError> {
        let id = project.id;
        let mut projects = self.projects.lock().await;
        let entry = projects
            .entries
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("Project", id))?;

        if view == ProjectView::Operation {
            self.repository.save(&project, view)?;
            entry.operation = Some(project);
            return Ok(());
        }

        project.topology_setting.recompute(project.streams.values());
        project.last_modified = Some(Utc::now());
        let changes = diff::project_changes(&entry.design, &project);

        self.repository.save(&project, view)?;

        for (action, data) in changes {
            self.hub
                .stage(id, Notification::patch(id, action, data, sync));
        }
        // Twin-only mirror of the whole project.
        self.hub.stage(
            id,
            Notification::patch(
                id,
                PatchAction::Update,
                PatchData::Project(Box::new(project.clone())),
                false,
            ),
        );

        self.deploy_available
            .insert(id, project.device_config.is_deployable());
        entry.design = project;
        debug!(project_id = %id, staged = self.hub.pending(id), "project updated");
        Ok(())
    }

    /// Write a snapshot verbatim: no derived recompute, no patches.
    pub async fn restore(&self, project: Project, view: ProjectView) -> Result<(), CoreError> {
        let id = project.id;
        let mut projects = self.projects.lock().await;
        let entry = projects
            .entries
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("Project", id))?;

        self.repository.save(&project, view)?;
        match view {
            ProjectView::Design => {
                self.deploy_available
                    .insert(id, project.device_config.is_deployable());
                entry.design = project;
            }
            ProjectView::Operation => entry.operation = Some(project),
        }
        Ok(())
    }

    /// Freeze the current design as the operation baseline.
    pub async fn promote_to_operation(&self, id: ProjectId) -> Result<(), CoreError> {
        let mut projects = self.projects.lock().await;
        let entry = projects
            .entries
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("Project", id))?;

        self.repository.save(&entry.design, ProjectView::Operation)?;
        entry.operation = Some(entry.design.clone());
        Ok(())
    }

    // ── Status ───────────────────────────────────────────────────────

    pub fn status(&self, id: ProjectId) -> Option<ProjectStatus> {
        self.status.get(id)
    }

    pub fn set_status(&self, id: ProjectId, status: ProjectStatus) {
        self.status.set(id, status);
    }

    /// Atomically move a settled project to `running`.
    pub fn begin_job(&self, id: ProjectId, running: ProjectStatus) -> Result<(), CoreError> {
        self.status.try_begin(id, running)
    }

    pub fn subscribe_status(&self, id: ProjectId) -> Option<StatusSubscription> {
        self.status.subscribe(id)
    }

    pub fn deploy_available(&self, id: ProjectId) -> bool {
        self.deploy_available.get(&id).is_some_and(|v| *v)
    }

    // ── Device profiles ──────────────────────────────────────────────

    pub fn profiles(&self) -> BTreeMap<i64, DeviceProfile> {
        self.profiles
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect()
    }

    pub fn upsert_profile(&self, profile: DeviceProfile) {
        let action = if self.profiles.contains_key(&profile.id) {
            PatchAction::Update
        } else {
            PatchAction::Create
        };
        self.profiles.insert(profile.id, profile.clone());
        self.dispatch_system(Notification::patch(
            ProjectId::UNKNOWN,
            action,
            PatchData::DeviceProfile(profile),
            true,
        ));
    }

    pub fn remove_profile(&self, id: i64) -> Result<DeviceProfile, CoreError> {
        let (_, profile) = self
            .profiles
            .remove(&id)
            .ok_or_else(|| CoreError::not_found("Device profile", id))?;
        self.dispatch_system(Notification::patch(
            ProjectId::UNKNOWN,
            PatchAction::Delete,
            PatchData::DeviceProfile(profile.clone()),
            true,
        ));
        Ok(profile)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn announce(&self, project: &Project, action: PatchAction) {
        self.dispatch_system(Notification::patch(
            project.id,
            action,
            PatchData::Project(Box::new(project.clone())),
            true,
        ));
    }

    fn dispatch_system(&self, notification: Notification) {
        if let Err(e) = self.hub.dispatch(Scope::System, &notification) {
            warn!(error = %e, "system notification failed");
        }
    }
}
