// ── Subscription streams ──
//
// `Stream` adapters for the two push channels the core exposes: the
// per-project status board and listener message queues.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::{ReceiverStream, WatchStream};

use crate::model::ProjectStatus;

/// A subscription to one project's status.
///
/// Offers point-in-time access plus change notification via
/// [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct StatusSubscription {
    receiver: watch::Receiver<ProjectStatus>,
}

impl StatusSubscription {
    pub(crate) fn new(receiver: watch::Receiver<ProjectStatus>) -> Self {
        Self { receiver }
    }

    pub fn current(&self) -> ProjectStatus {
        *self.receiver.borrow()
    }

    /// Wait for the next change. Returns `None` once the project is removed.
    pub async fn changed(&mut self) -> Option<ProjectStatus> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }

    /// Wait until `pred` holds, returning the matching status.
    pub async fn wait_for(&mut self, pred: impl FnMut(&ProjectStatus) -> bool) -> Option<ProjectStatus> {
        self.receiver.wait_for(pred).await.ok().map(|s| *s)
    }

    pub fn into_stream(self) -> StatusStream {
        StatusStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` of status values, starting with the current one.
pub struct StatusStream {
    inner: WatchStream<ProjectStatus>,
}

impl Stream for StatusStream {
    type Item = ProjectStatus;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// `Stream` of JSON messages delivered to one listener.
pub struct ListenerStream {
    inner: ReceiverStream<Arc<str>>,
}

impl ListenerStream {
    pub(crate) fn new(rx: mpsc::Receiver<Arc<str>>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
        }
    }
}

impl Stream for ListenerStream {
    type Item = Arc<str>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
