//! Global concurrency gate
//!
//! Bounds how many commands execute at once across every tier. The gate has
//! no notion of priority; tiers get their share only through worker counts.
//!
//! Closing the gate is the last step of a shutdown whose grace period ran
//! out: workers still waiting for a slot give up instead of starting late.

use crate::error::{AppError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    waiting: AtomicUsize,
}

/// A held execution slot. Dropping it releases the slot, so every exit path
/// out of an execution (success, failure, panic) gives it back exactly once.
pub struct ExecutionPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ExecutionPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Counts a caller as waiting for as long as it is inside `acquire`
struct WaitGuard<'a>(&'a AtomicUsize);

impl<'a> WaitGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Wait for a free slot. No fairness across callers.
    ///
    /// Fails only once the gate has been closed.
    pub async fn acquire(&self) -> Result<ExecutionPermit> {
        let permit = {
            let _waiting = WaitGuard::enter(&self.waiting);
            Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|_| AppError::ShuttingDown("execution gate closed".to_string()))?
        };
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(ExecutionPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Take a slot only if one is free right now
    pub fn try_acquire(&self) -> Option<ExecutionPermit> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(ExecutionPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Commands currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Callers blocked in `acquire`, each holding a dequeued command
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Stop handing out slots. Pending and future `acquire` calls fail;
    /// permits already held stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}
