//! Optional priority admission in front of the orchestrator.
//!
//! Three FIFO classes with strict priority: a queued high item always
//! runs before a queued normal one, and low can starve under sustained
//! higher-priority load. At most `concurrency` orchestrations hold a
//! permit at once; enqueuing past `max_pending` is refused.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::RdapClientError;

/// Admission priority of a query.
#[derive(
    Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[strum(serialize = "high")]
    High,
    #[default]
    #[strum(serialize = "normal")]
    Normal,
    #[strum(serialize = "low")]
    Low,
}

impl Priority {
    fn index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }
}

/// Priority queue settings.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PriorityConfig {
    /// Orchestrations allowed to run in parallel.
    pub concurrency: usize,
    /// Cap on waiting queries across all classes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pending: Option<usize>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_pending: None,
        }
    }
}

/// Counts reported by [`PriorityQueue::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub queued_high: usize,
    pub queued_normal: usize,
    pub queued_low: usize,
    pub active: usize,
}

struct Waiter {
    id: u64,
    grant: oneshot::Sender<()>,
}

#[derive(Default)]
struct QueueState {
    queues: [VecDeque<Waiter>; 3],
    active: usize,
    next_id: u64,
}

impl QueueState {
    fn queued(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    fn remove(&mut self, id: u64) -> bool {
        for queue in self.queues.iter_mut() {
            if let Some(position) = queue.iter().position(|w| w.id == id) {
                queue.remove(position);
                return true;
            }
        }
        false
    }

    /// Hands the freed slot to the next waiter by strict priority, or
    /// releases it.
    fn release_slot(&mut self) {
        loop {
            let next = self
                .queues
                .iter_mut()
                .find_map(|queue| queue.pop_front());
            match next {
                Some(waiter) => {
                    if waiter.grant.send(()).is_ok() {
                        return;
                    }
                    // receiver was cancelled; try the next waiter
                }
                None => {
                    self.active = self.active.saturating_sub(1);
                    return;
                }
            }
        }
    }
}

/// The admission gate. Acquire a permit before orchestrating; dropping
/// the permit admits the next waiter.
pub struct PriorityQueue {
    concurrency: usize,
    max_pending: Option<usize>,
    state: Mutex<QueueState>,
}

/// A held admission slot. Dropping it hands the slot on.
pub struct QueuePermit<'a> {
    queue: &'a PriorityQueue,
}

impl Drop for QueuePermit<'_> {
    fn drop(&mut self) {
        self.queue.lock().release_slot();
    }
}

impl PriorityQueue {
    pub fn new(config: PriorityConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            max_pending: config.max_pending,
            state: Mutex::new(QueueState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Waits for an admission slot in FIFO order within the class.
    pub async fn acquire(
        &self,
        priority: Priority,
        cancel: &CancellationToken,
    ) -> Result<QueuePermit<'_>, RdapClientError> {
        let (id, receiver) = {
            let mut state = self.lock();
            if state.active < self.concurrency {
                state.active += 1;
                return Ok(QueuePermit { queue: self });
            }
            if let Some(max_pending) = self.max_pending {
                if state.queued() >= max_pending {
                    return Err(RdapClientError::QueueFull);
                }
            }
            state.next_id += 1;
            let id = state.next_id;
            let (grant, receiver) = oneshot::channel();
            state.queues[priority.index()].push_back(Waiter { id, grant });
            (id, receiver)
        };
        tokio::select! {
            _ = cancel.cancelled() => {
                let mut state = self.lock();
                if !state.remove(id) {
                    // the slot was granted concurrently; hand it back
                    state.release_slot();
                }
                Err(RdapClientError::Cancelled)
            }
            granted = receiver => match granted {
                Ok(()) => Ok(QueuePermit { queue: self }),
                // the queue was dropped wholesale
                Err(_e) => Err(RdapClientError::Cancelled),
            }
        }
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            queued_high: state.queues[0].len(),
            queued_normal: state.queues[1].len(),
            queued_low: state.queues[2].len(),
            active: state.active,
        }
    }
}
