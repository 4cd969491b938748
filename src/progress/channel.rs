use super::ProgressState;
use crate::DeviceIdentity;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Last-writer-wins slot holding the latest progress record.
///
/// Writers swap in a whole new `Arc`; readers clone the current one, so a
/// reader never observes a half-written record and never blocks the writer
/// for longer than a pointer copy.
#[derive(Debug)]
pub struct ProgressChannel {
    current: Mutex<Arc<ProgressState>>,
}

impl ProgressChannel {
    pub fn new(initial: ProgressState) -> Self {
        Self {
            current: Mutex::new(Arc::new(initial)),
        }
    }

    pub fn update(&self, state: ProgressState) {
        let next = Arc::new(state);
        *lock(&self.current) = next;
    }

    pub fn snapshot(&self) -> Arc<ProgressState> {
        Arc::clone(&lock(&self.current))
    }
}

// A panicking writer cannot leave a half-swapped Arc behind, so a poisoned
// lock still holds a valid record.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-wide registry with one channel per device
#[derive(Debug, Default)]
pub struct ProgressBoard {
    slots: Mutex<HashMap<String, Arc<ProgressChannel>>>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel for `device`, reset to its initial record
    pub fn register(&self, device: &DeviceIdentity, sector_size: u64) -> Arc<ProgressChannel> {
        let initial = ProgressState::initial(device, sector_size);
        let mut slots = lock(&self.slots);
        match slots.get(&device.key()) {
            Some(existing) => {
                existing.update(initial);
                Arc::clone(existing)
            }
            None => {
                let channel = Arc::new(ProgressChannel::new(initial));
                slots.insert(device.key(), Arc::clone(&channel));
                channel
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<ProgressChannel>> {
        lock(&self.slots).get(key).cloned()
    }

    pub fn snapshot(&self, key: &str) -> Option<Arc<ProgressState>> {
        self.get(key).map(|channel| channel.snapshot())
    }

    pub fn remove(&self, key: &str) -> Option<Arc<ProgressChannel>> {
        lock(&self.slots).remove(key)
    }
}

lazy_static! {
    static ref BOARD: ProgressBoard = ProgressBoard::new();
}

/// The shared board sessions publish to by default
pub fn board() -> &'static ProgressBoard {
    &BOARD
}
