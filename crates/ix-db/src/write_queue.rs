//! Single-consumer queue that totally orders store operations.
//!
//! The store is owned by one worker thread. Operations arrive as boxed
//! closures over a channel and run strictly one after another, so each
//! read-modify-write sees the result of the previous one.

use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::store::{Store, StoreError};

type Job = Box<dyn FnOnce(&mut dyn Store) + Send + 'static>;

enum QueueCommand {
    Execute(Job),
    Shutdown,
}

/// Write queue errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The worker has shut down and accepts no more operations.
    #[error("write queue is closed")]
    Closed,
    /// The worker exited before replying.
    #[error("write queue worker terminated unexpectedly")]
    WorkerGone,
    #[error("failed to spawn write queue worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What happens to a queued write that fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WritePolicy {
    /// Log the failure and move on to the next operation.
    #[default]
    LogAndContinue,
    /// Retry up to `max_attempts` times in total before logging and moving on.
    AtLeastOnce { max_attempts: u32 },
}

impl WritePolicy {
    const fn attempts(self) -> u32 {
        match self {
            Self::LogAndContinue => 1,
            Self::AtLeastOnce { max_attempts } => {
                if max_attempts == 0 { 1 } else { max_attempts }
            }
        }
    }
}

struct QueueInner {
    sender: Mutex<Option<mpsc::Sender<QueueCommand>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueueInner {
    fn send(&self, command: QueueCommand) -> Result<(), QueueError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(QueueError::Closed)?;
        sender.send(command).map_err(|_| QueueError::Closed)
    }

    fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(sender) = sender else {
            return;
        };
        if let Err(e) = sender.send(QueueCommand::Shutdown) {
            tracing::error!(error = %e, "failed to send shutdown to write queue");
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.join() {
                tracing::error!(error = ?e, "failed to join write queue worker");
            }
        }
    }
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Handle to the write queue. Clones share the same worker.
#[derive(Clone)]
pub struct WriteQueue {
    inner: Arc<QueueInner>,
    policy: WritePolicy,
}

impl WriteQueue {
    /// Moves `store` onto a new worker thread.
    pub fn spawn(store: Box<dyn Store>, policy: WritePolicy) -> Result<Self, QueueError> {
        let (sender, receiver) = mpsc::channel::<QueueCommand>();
        let worker = thread::Builder::new()
            .name("ix-write-queue".into())
            .spawn(move || {
                let mut store = store;
                while let Ok(command) = receiver.recv() {
                    match command {
                        QueueCommand::Execute(job) => job(store.as_mut()),
                        QueueCommand::Shutdown => break,
                    }
                }
                tracing::debug!("write queue worker shutting down");
            })
            .map_err(QueueError::Spawn)?;

        Ok(Self {
            inner: Arc::new(QueueInner {
                sender: Mutex::new(Some(sender)),
                worker: Mutex::new(Some(worker)),
            }),
            policy,
        })
    }

    pub const fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Queues a write without waiting for it.
    ///
    /// A failed write is logged under `label` and never reported back; the
    /// queue proceeds with the next operation.
    pub fn enqueue<F>(&self, label: &'static str, mut op: F) -> Result<(), QueueError>
    where
        F: FnMut(&mut dyn Store) -> Result<(), StoreError> + Send + 'static,
    {
        let attempts = self.policy.attempts();
        let job: Job = Box::new(move |store| {
            for attempt in 1..=attempts {
                match op(store) {
                    Ok(()) => return,
                    Err(e) if attempt < attempts => {
                        tracing::debug!(op = label, attempt, error = %e, "write failed, retrying");
                    }
                    Err(e) => {
                        tracing::warn!(op = label, attempts, error = %e, "write failed, dropped");
                    }
                }
            }
        });
        self.inner.send(QueueCommand::Execute(job))
    }

    /// Runs `op` in queue order and waits for its result.
    pub async fn execute<F, T>(&self, op: F) -> Result<T, QueueError>
    where
        F: FnOnce(&mut dyn Store) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |store| {
            if reply_tx.send(op(store)).is_err() {
                tracing::debug!("write queue caller dropped before receiving result");
            }
        });
        self.inner.send(QueueCommand::Execute(job))?;
        reply_rx.await.map_err(|_| QueueError::WorkerGone)?.map_err(QueueError::from)
    }

    /// Waits until every operation queued before this call has run.
    pub async fn barrier(&self) -> Result<(), QueueError> {
        self.execute(|_| Ok(())).await
    }

    /// Drains queued operations and stops the worker.
    ///
    /// Blocks until the worker exits. Later operations fail with
    /// [`QueueError::Closed`].
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}
