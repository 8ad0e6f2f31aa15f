use std::sync::{Arc, Mutex, PoisonError};

use tagnav_proto::Observation;

/// Single-slot mailbox holding the latest marker observation.
///
/// Cloning yields another handle to the same slot, so the feed task writes
/// and the tick loop reads without sharing anything else. The whole
/// `Option<Observation>` is swapped under the lock; readers never see a
/// half-written value.
#[derive(Debug, Clone, Default)]
pub struct TransformObserver {
    slot: Arc<Mutex<Option<Observation>>>,
}

impl TransformObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first observation of the batch, or clears the slot if the
    /// batch is empty. Last write wins.
    pub fn publish<I>(&self, batch: I)
    where
        I: IntoIterator<Item = Observation>,
    {
        let next = batch.into_iter().next();
        // A panicking writer cannot leave a torn value behind, so poison is ignored.
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub fn current(&self) -> Option<Observation> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
