// ── Controller ──
//
// The service object wiring store, transactions, jobs and notifications
// together. Edits are serialized through a command channel; reads and
// job control go straight to the owning component.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::CoreConfig;
use crate::edit;
use crate::error::CoreError;
use crate::job::{AlgorithmProvider, JobController, JobKind, NoAlgorithms};
use crate::listener::{ListenerRegistry, ListenerSubscription, Scope};
use crate::model::{
    ConnectionId, DeviceTimeSlotSetting, Project, ProjectId, ProjectStatus, ProjectView,
};
use crate::notify::{DigitalTwinSink, FeatureFlags, NoTwin, Notification, NotificationHub};
use crate::store::{MemoryRepository, ProjectRepository, ProjectStore};
use crate::stream::StatusSubscription;
use crate::transaction::TransactionManager;
use crate::validate::{apply_gcl_settings, decode_gcl_settings};

// ── Controller ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Call
/// [`start()`](Self::start) before executing commands and
/// [`shutdown()`](Self::shutdown) to cancel jobs and join every task.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: CoreConfig,
    store: Arc<ProjectStore>,
    transactions: Arc<TransactionManager>,
    jobs: JobController,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(
        config: CoreConfig,
        repository: Arc<dyn ProjectRepository>,
        twin: Arc<dyn DigitalTwinSink>,
        provider: Arc<dyn AlgorithmProvider>,
    ) -> Self {
        let listeners = Arc::new(ListenerRegistry::new(
            config.max_listeners,
            config.listener_queue,
        ));
        let hub = Arc::new(NotificationHub::new(listeners, twin));
        let store = Arc::new(ProjectStore::new(repository, hub));
        let transactions = Arc::new(TransactionManager::new(
            Arc::clone(&store),
            config.history_limit,
            config.transaction_warn_size,
        ));
        let jobs = JobController::new(
            Arc::clone(&store),
            Arc::clone(&transactions),
            provider,
            config.poll_interval,
        );
        let (command_tx, command_rx) = mpsc::channel(config.command_channel_size.max(1));

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                transactions,
                jobs,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Controller with in-memory persistence, no twin and no engines.
    pub fn in_memory(config: CoreConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryRepository::new()),
            Arc::new(NoTwin),
            Arc::new(NoAlgorithms),
        )
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.inner.store
    }

    pub fn transactions(&self) -> &Arc<TransactionManager> {
        &self.inner.transactions
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the command processor.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ControllerShutdown);
        }
        let rx = self
            .inner
            .command_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| CoreError::Internal("controller already started".into()))?;

        let handle = tokio::spawn(command_processor_task(self.clone(), rx));
        self.inner.task_handles.lock().await.push(handle);
        info!("controller started");
        Ok(())
    }

    /// Cancel the command processor and every job, then join them.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.jobs.shutdown().await;
        info!("controller shut down");
    }

    // ── Command execution ────────────────────────────────────────────

    /// Execute a command.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ControllerShutdown);
        }
        if self.inner.command_rx.lock().await.is_some() {
            return Err(CoreError::Internal("controller is not started".into()));
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerShutdown)?;

        rx.await.map_err(|_| CoreError::ControllerShutdown)?
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn project(&self, id: ProjectId, view: ProjectView) -> Result<Project, CoreError> {
        self.inner.store.get(id, view).await
    }

    pub async fn project_ids(&self) -> Vec<ProjectId> {
        self.inner.store.ids().await
    }

    pub fn status(&self, id: ProjectId) -> Option<ProjectStatus> {
        self.inner.store.status(id)
    }

    pub fn subscribe_status(&self, id: ProjectId) -> Result<StatusSubscription, CoreError> {
        self.inner
            .store
            .subscribe_status(id)
            .ok_or_else(|| CoreError::not_found("Project", id))
    }

    pub fn features(&self, id: ProjectId) -> FeatureFlags {
        self.inner.transactions.features(id)
    }

    /// Per-port GCL view of every gate-capable device.
    pub async fn gcl_settings(&self, id: ProjectId) -> Result<Vec<DeviceTimeSlotSetting>, CoreError> {
        let project = self.inner.store.get(id, ProjectView::Design).await?;
        Ok(decode_gcl_settings(&project, &self.inner.store.profiles()))
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Register a listener for one project, or for system messages when
    /// `project_id` is `None`.
    ///
    /// Project listeners receive the current feature flags right away.
    pub async fn register_listener(
        &self,
        project_id: Option<ProjectId>,
    ) -> Result<ListenerSubscription, CoreError> {
        let store = &self.inner.store;
        let scope_id = match project_id {
            Some(id) => {
                if !store.contains(id).await {
                    return Err(CoreError::not_found("Project", id));
                }
                id
            }
            None => ProjectId::UNKNOWN,
        };

        let subscription = store.hub().listeners().register(scope_id)?;
        if project_id.is_some() {
            let features = Notification::features(self.features(scope_id));
            store
                .hub()
                .dispatch(Scope::Specified(subscription.id), &features)?;
        }
        Ok(subscription)
    }

    pub fn unregister_listener(&self, id: ConnectionId) -> bool {
        self.inner.store.hub().listeners().unregister(id)
    }

    // ── Jobs ─────────────────────────────────────────────────────────

    pub async fn start_job(&self, id: ProjectId, kind: JobKind) -> Result<(), CoreError> {
        if kind.is_system() {
            return self.inner.jobs.start_system().await;
        }
        self.inner.jobs.start(id, kind).await
    }

    /// Stop the project's job. Returns after the worker has unwound.
    pub async fn stop_job(&self, id: ProjectId) -> Result<ProjectStatus, CoreError> {
        self.inner.jobs.stop(id).await
    }

    pub async fn start_system_job(&self) -> Result<(), CoreError> {
        self.inner.jobs.start_system().await
    }

    pub async fn stop_system_job(&self) -> Result<(), CoreError> {
        self.inner.jobs.stop_system().await
    }

    // ── Edit plumbing ────────────────────────────────────────────────

    /// Apply `f` to a copy of the design project and write it back as one
    /// transaction, then flush the staged notifications.
    async fn edit<T>(
        &self,
        project_id: ProjectId,
        f: impl FnOnce(&mut Project) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let inner = &self.inner;
        let before = inner.store.get(project_id, ProjectView::Design).await?;
        let mut project = before.clone();
        let out = f(&mut project)?;

        inner.transactions.start(project_id)?;
        inner.transactions.save(&before)?;
        if let Err(e) = inner.store.update(project, true, ProjectView::Design).await {
            inner.transactions.abandon(project_id);
            return Err(e);
        }
        inner.transactions.commit(project_id)?;
        self.publish(project_id);
        Ok(out)
    }

    fn publish(&self, project_id: ProjectId) {
        let hub = self.inner.store.hub();
        hub.flush(project_id);
        let features = Notification::features(self.features(project_id));
        if let Err(e) = hub.dispatch(Scope::Project(project_id), &features) {
            warn!(project_id = %project_id, error = %e, "feature notification failed");
        }
    }
}

// ── Command processor ────────────────────────────────────────────────

async fn command_processor_task(controller: Controller, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = controller.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
    debug!("command processor exited");
}

// ── Command routing ──────────────────────────────────────────────────

async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let store = &controller.inner.store;
    let transactions = &controller.inner.transactions;

    match cmd {
        // ── Project lifecycle ────────────────────────────────────────
        Command::CreateProject { name } => {
            let project = store.create(&name).await?;
            Ok(CommandResult::Project(Box::new(project)))
        }
        Command::ImportProject { project } => {
            let project = store.import(*project).await?;
            Ok(CommandResult::Project(Box::new(project)))
        }
        Command::DeleteProject { project_id } => {
            if let Some(status) = store.status(project_id).filter(|s| !s.is_settled()) {
                return Err(CoreError::bad_request(format!(
                    "Project ({project_id}) - The project cannot be deleted because it is {status}"
                )));
            }
            store.remove(project_id).await?;
            transactions.forget(project_id);
            Ok(CommandResult::Ok)
        }

        // ── Streams ──────────────────────────────────────────────────
        Command::CreateStreams { project_id, streams } => controller
            .edit(project_id, |p| edit::create_streams(p, streams))
            .await
            .map(CommandResult::Streams),
        Command::UpdateStreams { project_id, streams } => controller
            .edit(project_id, |p| edit::update_streams(p, streams))
            .await
            .map(CommandResult::Streams),
        Command::DeleteStreams {
            project_id,
            stream_ids,
        } => {
            controller
                .edit(project_id, |p| edit::delete_streams(p, &stream_ids))
                .await?;
            Ok(CommandResult::Ok)
        }

        // ── Topology ─────────────────────────────────────────────────
        Command::CreateDevice { project_id, device } => {
            let device = controller
                .edit(project_id, |p| edit::create_device(p, *device))
                .await?;
            Ok(CommandResult::Device(Box::new(device)))
        }
        Command::UpdateDevice { project_id, device } => {
            let device = controller
                .edit(project_id, |p| edit::update_device(p, *device))
                .await?;
            Ok(CommandResult::Device(Box::new(device)))
        }
        Command::DeleteDevice {
            project_id,
            device_id,
        } => {
            controller
                .edit(project_id, |p| edit::delete_device(p, device_id))
                .await?;
            Ok(CommandResult::Ok)
        }
        Command::CreateLink { project_id, link } => controller
            .edit(project_id, |p| edit::create_link(p, link))
            .await
            .map(CommandResult::Link),
        Command::DeleteLink {
            project_id,
            link_id,
        } => {
            controller
                .edit(project_id, |p| edit::delete_link(p, link_id))
                .await?;
            Ok(CommandResult::Ok)
        }

        // ── Schedule settings ────────────────────────────────────────
        Command::UpdateCycleSetting {
            project_id,
            setting,
        } => {
            controller
                .edit(project_id, |p| edit::update_cycle_setting(p, setting))
                .await?;
            Ok(CommandResult::Ok)
        }
        Command::UpdateGclSettings {
            project_id,
            settings,
        } => {
            controller
                .edit(project_id, |p| apply_gcl_settings(p, &settings))
                .await?;
            Ok(CommandResult::Ok)
        }

        // ── History ──────────────────────────────────────────────────
        Command::Undo { project_id } => {
            let project = transactions.undo(project_id).await?;
            Ok(CommandResult::Project(Box::new(project)))
        }
        Command::Redo { project_id } => {
            let project = transactions.redo(project_id).await?;
            Ok(CommandResult::Project(Box::new(project)))
        }
        Command::BeginBatch { project_id } => {
            if !store.contains(project_id).await {
                return Err(CoreError::not_found("Project", project_id));
            }
            transactions.enable_multiple(project_id)?;
            Ok(CommandResult::Ok)
        }
        Command::EndBatch { project_id } => {
            transactions.disable_multiple(project_id)?;
            if transactions.is_open(project_id) {
                transactions.commit(project_id)?;
                controller.publish(project_id);
            }
            Ok(CommandResult::Ok)
        }

        // ── Device profiles ──────────────────────────────────────────
        Command::UpsertDeviceProfile { profile } => {
            store.upsert_profile((*profile).clone());
            Ok(CommandResult::DeviceProfile(profile))
        }
        Command::RemoveDeviceProfile { profile_id } => {
            let profile = store.remove_profile(profile_id)?;
            Ok(CommandResult::DeviceProfile(Box::new(profile)))
        }
    }
}
