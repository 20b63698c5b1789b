use crate::types::Event;

/// Pending events awaiting delivery, bounded by the batch size.
pub(crate) struct Batch {
    events: Vec<Event>,
    capacity: usize,
}

impl Batch {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event. Returns `true` when the batch has reached capacity
    /// and must be flushed before the next push.
    pub(crate) fn push(&mut self, event: Event) -> bool {
        debug_assert!(self.events.len() < self.capacity, "batch over capacity");
        self.events.push(event);
        self.is_full()
    }

    /// Hand over the buffered events, leaving a fresh buffer in their place.
    /// Returns `None` if nothing is buffered.
    pub(crate) fn take(&mut self) -> Option<Vec<Event>> {
        if self.events.is_empty() {
            return None;
        }
        Some(std::mem::replace(
            &mut self.events,
            Vec::with_capacity(self.capacity),
        ))
    }

    pub(crate) fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }
}
