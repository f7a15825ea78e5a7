//! Event bus: an unbounded FIFO queue owned by one simulation run.
//!
//! There is no process-wide bus. The driver owns it and lends `&mut EventBus`
//! to each component call that may emit events.

use super::Event;
use std::collections::VecDeque;

/// Unbounded FIFO of events. No priorities, no coalescing.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Dequeue the oldest event, or `None` when empty. Never blocks.
    pub fn get(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    /// Look at the oldest event without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.queue.front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
