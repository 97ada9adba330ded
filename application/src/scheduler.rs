//! Priority admission queue.
//!
//! Bounds how many executions run at once. A submission either gets a slot
//! immediately, waits in a priority heap (FIFO within a tier), or is rejected
//! synchronously when the wait list is full.
//!
//! Slots are represented by [`Permit`]s. Dropping a permit hands the slot
//! directly to the highest-priority live waiter, so a slot is never
//! observable as free while someone is waiting for it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::oneshot;
use toolflow_domain::Priority;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("Queue is full ({max_queued} executions waiting)")]
    QueueFull { max_queued: usize },

    #[error("Admission queue closed")]
    Closed,
}

pub struct AdmissionQueue {
    max_concurrent: usize,
    max_queued: usize,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    running: usize,
    next_seq: u64,
    waiting: BinaryHeap<Waiter>,
}

struct Waiter {
    priority: Priority,
    seq: u64,
    tx: oneshot::Sender<Permit>,
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Waiter {}

impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiter {
    /// Max-heap order: higher priority first, then lower sequence number.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A held execution slot. Released on drop.
pub struct Permit {
    queue: Option<Arc<AdmissionQueue>>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.release();
        }
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit").finish_non_exhaustive()
    }
}

/// Result of admission: a slot now, or a place in line.
#[derive(Debug)]
pub enum Ticket {
    Ready(Permit),
    Waiting(oneshot::Receiver<Permit>),
}

impl Ticket {
    pub fn is_waiting(&self) -> bool {
        matches!(self, Ticket::Waiting(_))
    }

    /// Wait for the slot. Dropping the future gives up the place in line.
    pub async fn acquire(self) -> Result<Permit, AdmissionError> {
        match self {
            Ticket::Ready(permit) => Ok(permit),
            Ticket::Waiting(rx) => rx.await.map_err(|_| AdmissionError::Closed),
        }
    }
}

impl AdmissionQueue {
    pub fn new(max_concurrent: usize, max_queued: usize) -> Arc<Self> {
        Arc::new(Self {
            max_concurrent: max_concurrent.max(1),
            max_queued,
            state: Mutex::new(QueueState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Admit a submission. Never blocks.
    pub fn admit(self: &Arc<Self>, priority: Priority) -> Result<Ticket, AdmissionError> {
        let mut state = self.lock();

        if state.running < self.max_concurrent && state.waiting.is_empty() {
            state.running += 1;
            return Ok(Ticket::Ready(Permit {
                queue: Some(Arc::clone(self)),
            }));
        }

        if state.waiting.len() >= self.max_queued {
            state.waiting.retain(|w| !w.tx.is_closed());
            if state.waiting.len() >= self.max_queued {
                return Err(AdmissionError::QueueFull {
                    max_queued: self.max_queued,
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.waiting.push(Waiter { priority, seq, tx });
        Ok(Ticket::Waiting(rx))
    }

    /// Hand the slot to the next live waiter, or free it.
    fn release(self: Arc<Self>) {
        loop {
            let next = {
                let mut state = self.lock();
                match state.waiting.pop() {
                    Some(waiter) => waiter,
                    None => {
                        state.running = state.running.saturating_sub(1);
                        return;
                    }
                }
            };

            let permit = Permit {
                queue: Some(Arc::clone(&self)),
            };
            match next.tx.send(permit) {
                Ok(()) => return,
                // Waiter gave up; disarm the returned permit and try the next one.
                Err(mut unsent) => {
                    unsent.queue = None;
                }
            }
        }
    }

    pub fn running(&self) -> usize {
        self.lock().running
    }

    /// Live waiters.
    pub fn queued(&self) -> usize {
        self.lock()
            .waiting
            .iter()
            .filter(|w| !w.tx.is_closed())
            .count()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn max_queued(&self) -> usize {
        self.max_queued
    }
}
