//! Active countdown bookkeeping: at most one live timer per channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use warhorn_core::types::ChannelId;

/// Handle to a live countdown. Cancellation is cooperative: the flag is
/// polled by the timer loop once per tick, so a cancelled timer can take up
/// to one tick to actually stop.
#[derive(Debug, Clone)]
pub struct CountdownEntry {
    cancel: Arc<AtomicBool>,
    ends_at: DateTime<Utc>,
    epoch: u64,
}

impl CountdownEntry {
    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Registry of live countdowns keyed by channel.
///
/// `install` supersedes: the previous entry's cancel flag is set and the new
/// entry takes the slot immediately. Cleanup is epoch-guarded so the
/// superseded timer's terminal path cannot remove the entry that replaced it.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    entries: HashMap<ChannelId, CountdownEntry>,
    next_epoch: u64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh countdown for `channel`, soft-cancelling any previous
    /// one. Returns the handle the timer loop polls.
    pub fn install(&mut self, channel: ChannelId, ends_at: DateTime<Utc>) -> CountdownEntry {
        self.next_epoch += 1;
        let entry = CountdownEntry {
            cancel: Arc::new(AtomicBool::new(false)),
            ends_at,
            epoch: self.next_epoch,
        };
        if let Some(old) = self.entries.insert(channel, entry.clone()) {
            old.cancel();
        }
        entry
    }

    pub fn get(&self, channel: ChannelId) -> Option<CountdownEntry> {
        self.entries.get(&channel).cloned()
    }

    /// Request cancellation of the live countdown for `channel`, if any.
    /// The entry itself is removed by the timer loop when it observes the
    /// flag.
    pub fn cancel(&mut self, channel: ChannelId) -> bool {
        match self.entries.get(&channel) {
            Some(entry) => {
                entry.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the entry for `channel` only if `epoch` still owns the slot.
    pub fn remove_if(&mut self, channel: ChannelId, epoch: u64) -> bool {
        if self.entries.get(&channel).is_some_and(|e| e.epoch == epoch) {
            self.entries.remove(&channel);
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
