use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

type Slots = Arc<Mutex<HashMap<String, Slot>>>;

#[derive(Debug)]
struct Slot {
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Callers currently holding or waiting on `lock`.
    holders: usize,
}

/// Registry of per-key async locks.
///
/// A key's slot is created on first use and removed as soon as the last
/// holder or waiter goes away, so idle keys cost nothing.
#[derive(Debug, Clone, Default)]
pub struct KeyLocks {
    slots: Slots,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> KeyGuard {
        let lock = {
            let mut slots = lock_slots(&self.slots);
            let slot = slots.entry(key.to_string()).or_insert_with(|| Slot {
                lock: Arc::new(tokio::sync::Mutex::new(())),
                holders: 0,
            });
            slot.holders += 1;
            slot.lock.clone()
        };
        // Registered before awaiting so a dropped waiter still releases its slot.
        let ticket = Ticket {
            key: key.to_string(),
            slots: self.slots.clone(),
        };
        let guard = lock.lock_owned().await;
        KeyGuard {
            _guard: guard,
            _ticket: ticket,
        }
    }

    /// Number of keys that currently have a holder or a waiter.
    pub fn active_keys(&self) -> usize {
        lock_slots(&self.slots).len()
    }
}

/// Exclusive access to one key; released on drop.
///
/// Field order matters: the async guard is released before the ticket
/// decrements the holder count.
#[derive(Debug)]
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
    _ticket: Ticket,
}

#[derive(Debug)]
struct Ticket {
    key: String,
    slots: Slots,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut slots = lock_slots(&self.slots);
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.holders = slot.holders.saturating_sub(1);
            if slot.holders == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

fn lock_slots(slots: &Slots) -> MutexGuard<'_, HashMap<String, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}
