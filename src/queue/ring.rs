//! Growable circular buffer of native events

use crate::protocol::NativeEvent;

/// FIFO ring that doubles its capacity when full
#[derive(Debug)]
pub struct EventRing {
    slots: Vec<Option<NativeEvent>>,
    head: usize,
    tail: usize,
    size: usize,
}

impl EventRing {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        EventRing {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn push(&mut self, event: NativeEvent) {
        if self.size == self.slots.len() {
            self.grow();
        }
        self.slots[self.tail] = Some(event);
        self.tail = (self.tail + 1) % self.slots.len();
        self.size += 1;
    }

    /// Oldest event, if any
    pub fn peek(&self) -> Option<&NativeEvent> {
        if self.size == 0 {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    pub fn pop(&mut self) -> Option<NativeEvent> {
        if self.size == 0 {
            return None;
        }
        let event = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.size -= 1;
        event
    }

    /// Double the capacity, unrolling the ring so the oldest event lands at
    /// index zero.
    fn grow(&mut self) {
        let old_capacity = self.slots.len();
        let mut slots: Vec<Option<NativeEvent>> = (0..old_capacity * 2).map(|_| None).collect();
        for (i, slot) in slots.iter_mut().take(self.size).enumerate() {
            *slot = self.slots[(self.head + i) % old_capacity].take();
        }
        log::debug!(
            "Event ring grew from {} to {} slots",
            old_capacity,
            old_capacity * 2
        );
        self.slots = slots;
        self.head = 0;
        self.tail = self.size;
    }
}

impl Default for EventRing {
    fn default() -> Self {
        Self::new()
    }
}
