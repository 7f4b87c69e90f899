use crate::snapshot::ProcessEvent;

pub const HISTORY_CAPACITY: usize = 30;
/// Newest events taken from a single update.
pub const HISTORY_BATCH: usize = 10;
/// Previously retained events kept behind a new batch.
pub const HISTORY_RETAINED: usize = HISTORY_CAPACITY - HISTORY_BATCH;

/// Rolling process-event history, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessHistory {
    entries: Vec<ProcessEvent>,
}

impl ProcessHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb events in wire order (oldest first). At most the last
    /// [`HISTORY_BATCH`] are kept, reversed onto the front, followed by at most
    /// [`HISTORY_RETAINED`] of the entries already held.
    pub fn absorb(&mut self, arrived: &[ProcessEvent]) {
        if arrived.is_empty() {
            return;
        }
        let start = arrived.len().saturating_sub(HISTORY_BATCH);
        let mut next: Vec<ProcessEvent> = arrived[start..].iter().rev().cloned().collect();
        next.extend(self.entries.drain(..).take(HISTORY_RETAINED));
        self.entries = next;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessEvent> {
        self.entries.iter()
    }

    pub fn newest(&self, limit: usize) -> &[ProcessEvent] {
        &self.entries[..self.entries.len().min(limit)]
    }
}
