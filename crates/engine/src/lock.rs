// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide reentrant pipeline lock.
//!
//! All pipeline work — including a nested auto-rollback triggered by a
//! failing deploy — runs under one ownership of this lock, so at most one
//! pipeline executes per process. Waiters are served strictly in
//! acquisition order.

use crate::error::EngineError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct LockState {
    owner: Option<u64>,
    depth: usize,
    queue: VecDeque<u64>,
}

/// Reentrant mutual exclusion for pipelines.
///
/// Built as an inner non-reentrant mutex guarding `{owner, depth}` plus a
/// FIFO ticket queue; the owner may re-acquire (incrementing depth), and
/// waiters are only woken once depth returns to zero.
#[derive(Debug, Default)]
pub struct PipelineLock {
    state: Mutex<LockState>,
    notify: Notify,
    next_ticket: AtomicU64,
}

/// RAII ownership of the pipeline lock. Dropping releases one level of
/// depth; the final drop wakes the next waiter.
#[must_use = "dropping the guard releases the lock"]
pub struct LockGuard<'a> {
    lock: &'a PipelineLock,
    owner: u64,
}

impl PipelineLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock as a new owner, waiting FIFO behind earlier
    /// acquirers.
    pub async fn acquire(&self) -> LockGuard<'_> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        {
            let mut state = self.state.lock();
            state.queue.push_back(ticket);
        }
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a release between the
            // check and the await cannot be missed.
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if state.owner.is_none() && state.queue.front() == Some(&ticket) {
                    state.queue.pop_front();
                    state.owner = Some(ticket);
                    state.depth = 1;
                    return LockGuard { lock: self, owner: ticket };
                }
            }
            notified.await;
        }
    }

    /// Re-acquire the lock for an existing owner. Never blocks.
    pub fn reenter<'a>(&'a self, guard: &LockGuard<'a>) -> LockGuard<'a> {
        let mut state = self.state.lock();
        debug_assert_eq!(state.owner, Some(guard.owner));
        state.depth += 1;
        LockGuard {
            lock: self,
            owner: guard.owner,
        }
    }

    /// Release one level of depth for `owner`.
    fn release(&self, owner: u64) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.owner != Some(owner) {
            return Err(EngineError::LockMisuse);
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.notify.notify_waiters();
        }
        Ok(())
    }

    /// Current reentrance depth (0 when free).
    pub fn depth(&self) -> usize {
        self.state.lock().depth
    }

    /// True when some pipeline currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.lock.release(self.owner).is_err() {
            // Release by a non-owner is a programmer error; guards make it
            // structurally unreachable, so only log if it ever happens.
            tracing::error!(owner = self.owner, "pipeline lock released by non-owner");
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
