// ── Listener registry ──
//
// Outbound channels keyed by connection id. Delivery never blocks: each
// listener has a bounded queue and a full queue drops the message.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{ConnectionId, ProjectId};
use crate::stream::ListenerStream;

/// Where a message is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Listeners not bound to a project.
    System,
    Project(ProjectId),
    Specified(ConnectionId),
}

struct ListenerHandle {
    project_id: ProjectId,
    tx: mpsc::Sender<Arc<str>>,
}

/// Receiving half handed to a transport after registration.
#[derive(Debug)]
pub struct ListenerSubscription {
    pub id: ConnectionId,
    pub project_id: ProjectId,
    rx: mpsc::Receiver<Arc<str>>,
}

impl ListenerSubscription {
    /// Next UTF-8 JSON message. `None` once unregistered.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> ListenerStream {
        ListenerStream::new(self.rx)
    }
}

pub struct ListenerRegistry {
    listeners: DashMap<ConnectionId, ListenerHandle>,
    next_id: AtomicU64,
    max_listeners: usize,
    queue_size: usize,
}

impl ListenerRegistry {
    pub fn new(max_listeners: usize, queue_size: usize) -> Self {
        Self {
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
            max_listeners,
            queue_size: queue_size.max(1),
        }
    }

    /// Check the connection cap.
    pub fn check_capacity(&self) -> Result<(), CoreError> {
        let count = self.listeners.len();
        if count >= self.max_listeners {
            return Err(CoreError::bad_request(format!(
                "WebSocket connection count({count}) exceeds the limit({})",
                self.max_listeners
            )));
        }
        Ok(())
    }

    /// Register a listener. [`ProjectId::UNKNOWN`] binds it to the system
    /// scope. The caller is responsible for checking the project exists.
    pub fn register(&self, project_id: ProjectId) -> Result<ListenerSubscription, CoreError> {
        self.check_capacity()?;

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.queue_size);
        self.listeners.insert(id, ListenerHandle { project_id, tx });
        debug!(connection = %id, project_id = %project_id, "listener registered");

        Ok(ListenerSubscription { id, project_id, rx })
    }

    pub fn unregister(&self, id: ConnectionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Drop every listener bound to a project.
    pub fn unregister_project(&self, project_id: ProjectId) {
        self.listeners.retain(|_, h| h.project_id != project_id);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `json` to every listener in `scope`. Returns how many
    /// listeners accepted it.
    pub fn send(&self, scope: Scope, json: &str) -> Result<usize, CoreError> {
        let targets: Vec<ConnectionId> = match scope {
            Scope::System => self.matching(ProjectId::UNKNOWN),
            Scope::Project(id) => {
                if id == ProjectId::UNKNOWN {
                    return Err(CoreError::bad_request("project id unknown."));
                }
                self.matching(id)
            }
            Scope::Specified(conn) => {
                if !self.listeners.contains_key(&conn) {
                    return Err(CoreError::not_found("Websocket Listener", conn));
                }
                vec![conn]
            }
        };

        let payload: Arc<str> = Arc::from(json);
        let mut delivered = 0;
        let mut closed = Vec::new();

        for conn in targets {
            let Some(handle) = self.listeners.get(&conn) else {
                continue;
            };
            match handle.tx.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(connection = %conn, "listener queue full, message dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(conn),
            }
        }

        for conn in closed {
            self.listeners.remove(&conn);
            debug!(connection = %conn, "listener closed, removed");
        }

        Ok(delivered)
    }

    fn matching(&self, project_id: ProjectId) -> Vec<ConnectionId> {
        self.listeners
            .iter()
            .filter(|entry| entry.value().project_id == project_id)
            .map(|entry| *entry.key())
            .collect()
    }
}
