//! Bounded FIFO job queue shared between producers and workers.

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::RwLock;

use super::error::PoolError;
use super::signal::CancellationToken;

/// A bounded, closable, multi-producer/multi-consumer job buffer.
///
/// Producers block in [`push`](Self::push) while the queue is full. Workers
/// pull from clones of [`receiver`](Self::receiver); once the queue is closed
/// and empty every receive reports disconnection ("no more jobs").
#[derive(Debug)]
pub struct JobQueue<J> {
    /// `None` once closed. Pushers hold the read lock for the whole send so
    /// `close` cannot complete while a push is in flight.
    sender: RwLock<Option<Sender<J>>>,
    receiver: Receiver<J>,
    capacity: usize,
}

impl<J> JobQueue<J> {
    /// Create a queue holding at most `capacity` pending jobs.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            capacity,
        }
    }

    /// Enqueue a job, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolClosed`] if the queue is closed, the token is
    /// already cancelled, or the token is cancelled while waiting for space.
    pub fn push(&self, job: J, cancel: &CancellationToken) -> Result<(), PoolError> {
        if cancel.is_cancelled() {
            return Err(PoolError::PoolClosed);
        }
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            return Err(PoolError::PoolClosed);
        };
        select! {
            send(sender, job) -> res => res.map_err(|_| PoolError::PoolClosed),
            recv(cancel.listener()) -> _ => Err(PoolError::PoolClosed),
        }
    }

    /// A consumer handle for a worker.
    #[must_use]
    pub fn receiver(&self) -> Receiver<J> {
        self.receiver.clone()
    }

    /// Close the queue. Returns `true` only for the call that closed it.
    ///
    /// Must only be called after the cancellation token passed to `push`
    /// has fired, otherwise a producer blocked on a full queue keeps this
    /// call waiting.
    pub fn close(&self) -> bool {
        self.sender.write().take().is_some()
    }

    /// Whether the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Discard every job still buffered, returning how many were dropped.
    pub fn drain(&self) -> usize {
        self.receiver.try_iter().count()
    }

    /// Number of jobs waiting to be picked up.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no jobs are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Maximum number of pending jobs.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
