//! Per-tier FIFO of pending commands
//!
//! `add` never blocks and never fails: ingestion must not stall the
//! submission path, so the queue is unbounded. `get` is a non-blocking poll;
//! workers back off on `None`.

use crate::domain::{Command, Tier};
use parking_lot::Mutex;
use std::collections::VecDeque;

pub struct CommandQueue {
    tier: Tier,
    items: Mutex<VecDeque<Command>>,
}

impl CommandQueue {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            items: Mutex::new(VecDeque::new()),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Append to the tail
    pub fn add(&self, command: Command) {
        self.items.lock().push_back(command);
    }

    /// Remove and return the head, or `None` immediately if empty
    pub fn get(&self) -> Option<Command> {
        self.items.lock().pop_front()
    }

    /// Current depth. Advisory only: may be stale by the time it is acted on.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Take every pending command (used at shutdown)
    pub fn drain(&self) -> Vec<Command> {
        self.items.lock().drain(..).collect()
    }
}
