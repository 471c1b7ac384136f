// ── Job controller ──
//
// At most one background job per project, plus one system-wide job.
// Admission flips the project status atomically before the worker is
// spawned; the worker polls its engine until it finishes, fails or is
// cancelled, then writes the result back or rolls back.

pub mod algorithm;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

pub use algorithm::{
    AlgorithmProvider, AlgorithmStatus, JobEngine, JobKind, NoAlgorithms, ProjectAlgorithm,
    SystemAlgorithm,
};

use crate::error::CoreError;
use crate::listener::Scope;
use crate::model::{DeviceConfig, Project, ProjectId, ProjectStatus, ProjectView, StreamStatus};
use crate::notify::{Notification, PatchAction, PatchData};
use crate::store::ProjectStore;
use crate::transaction::TransactionManager;

struct JobSlot {
    kind: JobKind,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// State shared with every worker.
struct JobShared {
    store: Arc<ProjectStore>,
    transactions: Arc<TransactionManager>,
    poll_interval: Duration,
}

impl JobShared {
    fn notify(&self, scope: Scope, notification: &Notification) {
        if let Err(e) = self.store.hub().dispatch(scope, notification) {
            warn!(error = %e, "job notification failed");
        }
    }
}

pub struct JobController {
    shared: Arc<JobShared>,
    provider: Arc<dyn AlgorithmProvider>,
    slots: Mutex<HashMap<ProjectId, JobSlot>>,
    system_slot: Mutex<Option<JobSlot>>,
    cancel: CancellationToken,
}

impl JobController {
    pub fn new(
        store: Arc<ProjectStore>,
        transactions: Arc<TransactionManager>,
        provider: Arc<dyn AlgorithmProvider>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(JobShared {
                store,
                transactions,
                // `interval` panics on a zero period.
                poll_interval: poll_interval.max(Duration::from_millis(1)),
            }),
            provider,
            slots: Mutex::new(HashMap::new()),
            system_slot: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    // ── Project jobs ─────────────────────────────────────────────────

    /// Admit and launch a job for `project_id`.
    ///
    /// Returns once the worker is spawned; the project status already
    /// reads the kind's running status at that point.
    pub async fn start(&self, project_id: ProjectId, kind: JobKind) -> Result<(), CoreError> {
        if kind.is_system() {
            return Err(CoreError::bad_request(format!(
                "{kind} is a system job and has no project"
            )));
        }
        if self.cancel.is_cancelled() {
            return Err(CoreError::ControllerShutdown);
        }
        if !self.shared.store.contains(project_id).await {
            return Err(CoreError::not_found("Project", project_id));
        }
        let engine = self.provider.project_algorithm(kind)?;

        let mut slots = self.slots.lock().await;
        self.shared
            .store
            .begin_job(project_id, kind.running_status())?;

        let cancel = self.cancel.child_token();
        let span = info_span!("job", project_id = %project_id, kind = %kind);
        let handle = tokio::spawn(
            run_project_job(
                Arc::clone(&self.shared),
                project_id,
                kind,
                engine,
                cancel.clone(),
            )
            .instrument(span),
        );
        // A retained slot from an earlier job is replaced; its worker
        // has already settled the status.
        slots.insert(project_id, JobSlot { kind, cancel, handle });
        info!(project_id = %project_id, kind = %kind, "job admitted");
        Ok(())
    }

    /// Cancel the project's job and wait for its worker to unwind.
    ///
    /// Returns the status the project settled in. A slot whose worker
    /// already finished keeps its terminal status.
    pub async fn stop(&self, project_id: ProjectId) -> Result<ProjectStatus, CoreError> {
        let slot = self.slots.lock().await.remove(&project_id);
        let Some(slot) = slot else {
            return Err(CoreError::bad_request(format!(
                "Project ({project_id}) - Thread job not exist"
            )));
        };

        debug!(project_id = %project_id, kind = %slot.kind, "stopping job");
        join_slot(slot).await;
        self.shared
            .store
            .status(project_id)
            .ok_or_else(|| CoreError::not_found("Project", project_id))
    }

    /// Kind of the project's most recent job, if its slot is retained.
    pub async fn current_kind(&self, project_id: ProjectId) -> Option<JobKind> {
        self.slots.lock().await.get(&project_id).map(|s| s.kind)
    }

    // ── System job ───────────────────────────────────────────────────

    pub async fn start_system(&self) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::ControllerShutdown);
        }

        let mut slot = self.system_slot.lock().await;
        if slot.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            return Err(CoreError::bad_request("System thread job is running"));
        }
        let engine = self.provider.system_algorithm()?;

        let kind = JobKind::BroadcastSearch;
        let cancel = self.cancel.child_token();
        let span = info_span!("job", project_id = %ProjectId::SYSTEM, kind = %kind);
        let handle = tokio::spawn(
            run_system_job(Arc::clone(&self.shared), engine, cancel.clone()).instrument(span),
        );
        *slot = Some(JobSlot { kind, cancel, handle });
        info!(kind = %kind, "system job admitted");
        Ok(())
    }

    pub async fn stop_system(&self) -> Result<(), CoreError> {
        let slot = self
            .system_slot
            .lock()
            .await
            .take()
            .ok_or_else(|| CoreError::bad_request("System thread job not exist"))?;
        join_slot(slot).await;
        Ok(())
    }

    pub async fn system_running(&self) -> bool {
        self.system_slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Cancel every job and wait for all workers.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let slots: Vec<JobSlot> = self.slots.lock().await.drain().map(|(_, s)| s).collect();
        let system = self.system_slot.lock().await.take();
        for slot in slots.into_iter().chain(system) {
            join_slot(slot).await;
        }
        debug!("job controller shut down");
    }
}

async fn join_slot(slot: JobSlot) {
    slot.cancel.cancel();
    if let Err(e) = slot.handle.await {
        warn!(kind = %slot.kind, error = %e, "job worker panicked");
    }
}

// ── Polling ──────────────────────────────────────────────────────────

enum PollOutcome {
    Finished,
    Cancelled,
    Failed(CoreError),
}

/// Poll `engine` every `period` until it leaves Running or `cancel` fires.
async fn poll_engine<E>(
    engine: &E,
    period: Duration,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(u8),
) -> PollOutcome
where
    E: JobEngine + ?Sized,
{
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = interval.tick() => match engine.status() {
                AlgorithmStatus::Running { progress } => on_progress(progress),
                AlgorithmStatus::Finished => return PollOutcome::Finished,
                AlgorithmStatus::Stopped => {
                    return PollOutcome::Failed(CoreError::Stopped {
                        message: "algorithm stopped".into(),
                    });
                }
                AlgorithmStatus::Failed { message } => {
                    return PollOutcome::Failed(CoreError::Internal(message));
                }
            },
        }
    }
}

/// Run the engine's blocking `stop` off the async workers.
async fn stop_engine<E>(engine: Arc<E>)
where
    E: JobEngine + ?Sized + 'static,
{
    match tokio::task::spawn_blocking(move || engine.stop()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "engine stop failed"),
        Err(e) => warn!(error = %e, "engine stop panicked"),
    }
}

// ── Workers ──────────────────────────────────────────────────────────

async fn run_project_job(
    shared: Arc<JobShared>,
    project_id: ProjectId,
    kind: JobKind,
    engine: Arc<dyn ProjectAlgorithm>,
    cancel: CancellationToken,
) {
    let scope = Scope::Project(project_id);
    let op = kind.op_code();
    let abort = |err: &CoreError| {
        shared.notify(scope, &Notification::error(op, err));
        shared.store.set_status(project_id, ProjectStatus::Aborted);
    };

    // Let the admitting call return first.
    tokio::task::yield_now().await;

    let initial = match shared.store.get(project_id, ProjectView::Design).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "project vanished before job start");
            abort(&e);
            return;
        }
    };
    if let Err(e) = engine.start(&initial) {
        warn!(error = %e, "engine failed to start");
        abort(&e);
        return;
    }
    info!("job running");

    let outcome = poll_engine(engine.as_ref(), shared.poll_interval, &cancel, |progress| {
        shared.notify(scope, &Notification::progress(op, progress));
    })
    .await;

    match outcome {
        PollOutcome::Cancelled => {
            stop_engine(engine).await;
            abort(&CoreError::Stopped {
                message: format!("{kind} stopped by request"),
            });
            info!("job stopped");
        }
        PollOutcome::Failed(e) => {
            warn!(error = %e, "job failed");
            abort(&e);
        }
        PollOutcome::Finished => {
            // Edits made while the job ran are part of the rollback target;
            // only the job's own write is undone.
            let before = match shared.store.get(project_id, ProjectView::Design).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "project vanished before write-back");
                    abort(&e);
                    return;
                }
            };
            let written =
                write_back(&shared, project_id, kind, engine.as_ref(), before.clone()).await;
            if let Err(e) = written {
                warn!(error = %e, "write-back failed, rolling back");
                shared.store.hub().discard(project_id);
                if let Err(rollback) = shared.store.restore(before, ProjectView::Design).await {
                    error!(error = %rollback, "rollback failed, project may be inconsistent");
                }
                abort(&e);
                return;
            }

            shared.store.hub().flush(project_id);
            shared.notify(scope, &Notification::finished(op));
            shared.notify(
                scope,
                &Notification::features(shared.transactions.features(project_id)),
            );
            shared.store.set_status(project_id, ProjectStatus::Finished);
            info!("job finished");
        }
    }
}

/// Apply the engine result to `project`, the current design copy, and
/// persist it.
async fn write_back(
    shared: &JobShared,
    project_id: ProjectId,
    kind: JobKind,
    engine: &dyn ProjectAlgorithm,
    mut project: Project,
) -> Result<(), CoreError> {
    let store = &shared.store;
    engine.apply(&mut project)?;

    match kind {
        JobKind::Compute => {
            if let Some(result) = &project.computed_result {
                project.device_config = DeviceConfig::from_computed(result);
                store.hub().stage(
                    project_id,
                    Notification::patch(
                        project_id,
                        PatchAction::Update,
                        PatchData::ComputedResult(result.clone()),
                        false,
                    ),
                );
            }
        }
        JobKind::Deploy => {
            for stream in project.streams.values_mut() {
                stream.status = StreamStatus::Scheduled;
            }
        }
        JobKind::TopologyMapping | JobKind::Compare | JobKind::BroadcastSearch => {}
    }

    store.update(project, true, ProjectView::Design).await?;
    if kind == JobKind::Deploy {
        store.promote_to_operation(project_id).await?;
    }
    Ok(())
}

async fn run_system_job(
    shared: Arc<JobShared>,
    engine: Arc<dyn SystemAlgorithm>,
    cancel: CancellationToken,
) {
    let op = JobKind::BroadcastSearch.op_code();

    tokio::task::yield_now().await;

    if let Err(e) = engine.start() {
        warn!(error = %e, "system engine failed to start");
        shared.notify(Scope::System, &Notification::error(op, &e));
        return;
    }
    info!("system job running");

    let outcome = poll_engine(engine.as_ref(), shared.poll_interval, &cancel, |progress| {
        shared.notify(Scope::System, &Notification::progress(op, progress));
    })
    .await;

    match outcome {
        PollOutcome::Finished => {
            shared.notify(Scope::System, &Notification::report(op, engine.report()));
            info!("system job finished");
        }
        PollOutcome::Cancelled => {
            stop_engine(engine).await;
            let err = CoreError::Stopped {
                message: format!("{} stopped by request", JobKind::BroadcastSearch),
            };
            shared.notify(Scope::System, &Notification::error(op, &err));
            info!("system job stopped");
        }
        PollOutcome::Failed(e) => {
            warn!(error = %e, "system job failed");
            shared.notify(Scope::System, &Notification::error(op, &e));
        }
    }
}
