use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, OnceLock},
    time::Duration,
};

use fedgate_time::{Time, TimeProvider};
use fedgate_types::FragmentList;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::CacheKey;

/// Default time an entry may stay unused before it is evicted.
pub const DEFAULT_IDLE_EXPIRY: Duration = Duration::from_secs(10);

/// One cache entry, possibly still being computed.
#[derive(Debug)]
struct Slot {
    /// Held for the duration of a computation.
    compute: Mutex<()>,
    /// Set once, by the first successful computation.
    value: OnceLock<FragmentList>,
    last_access: Mutex<Time>,
}

impl Slot {
    fn new(now: Time) -> Self {
        Self {
            compute: Mutex::new(()),
            value: OnceLock::new(),
            last_access: Mutex::new(now),
        }
    }

    fn touch(&self, now: Time) {
        let mut last_access = self.last_access.lock();
        *last_access = (*last_access).max(now);
    }

    fn idle(&self, now: Time) -> Duration {
        now.saturating_duration_since(*self.last_access.lock())
    }

    fn is_expired(&self, now: Time, idle_expiry: Duration) -> bool {
        !self.compute.is_locked() && self.idle(now) >= idle_expiry
    }
}

/// Idle-expiring, compute-once cache of fragment lists.
///
/// For every key at most one computation runs at a time: concurrent callers wait for it and
/// receive the very list it produced (same [`Arc`]). A failed computation publishes nothing,
/// so the next caller for that key computes again.
///
/// Every access (read or insert) resets the idle timer of an entry. An entry that has not been
/// accessed for `idle_expiry` is never returned again. It is physically removed by the next
/// eviction pass: [`clean_up`](Self::clean_up) runs one, and accesses run one at most once per
/// `idle_expiry`. Entries that are being computed are never evicted.
pub struct FragmentCache {
    entries: Mutex<Entries>,
    idle_expiry: Duration,
    time_provider: Arc<dyn TimeProvider>,
}

#[derive(Debug)]
struct Entries {
    slots: HashMap<CacheKey, Arc<Slot>>,
    /// Time of the last eviction pass.
    last_eviction: Time,
}

impl FragmentCache {
    pub fn new(time_provider: Arc<dyn TimeProvider>, idle_expiry: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                slots: HashMap::new(),
                last_eviction: time_provider.now(),
            }),
            idle_expiry,
            time_provider,
        }
    }

    /// Create a new cache, along with a background task that runs an eviction pass every
    /// `eviction_interval` until `shutdown` is cancelled.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime. Panics if `eviction_interval` is zero.
    pub fn new_with_background_eviction(
        time_provider: Arc<dyn TimeProvider>,
        idle_expiry: Duration,
        eviction_interval: Duration,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        assert!(
            !eviction_interval.is_zero(),
            "fragment cache eviction interval must be non-zero"
        );

        let cache = Arc::new(Self::new(time_provider, idle_expiry));
        background_eviction_process(Arc::clone(&cache), eviction_interval, shutdown);
        cache
    }

    pub fn idle_expiry(&self) -> Duration {
        self.idle_expiry
    }

    /// Return the list cached under `key`, computing and caching it with `compute` if there is
    /// none.
    ///
    /// `compute` runs at most once across all concurrent callers for `key`; if it fails, its
    /// error is returned to this caller only and nothing is cached.
    pub fn get_or_try_insert_with<F, E>(&self, key: CacheKey, compute: F) -> Result<FragmentList, E>
    where
        F: FnOnce() -> Result<FragmentList, E>,
    {
        let slot = {
            let now = self.time_provider.now();
            let mut entries = self.entries.lock();
            self.maybe_evict_expired(&mut entries, now);

            let slot = match entries.slots.entry(key) {
                Entry::Occupied(mut entry) => {
                    if entry.get().is_expired(now, self.idle_expiry) {
                        entry.insert(Arc::new(Slot::new(now)));
                    }
                    entry.into_mut()
                }
                Entry::Vacant(entry) => entry.insert(Arc::new(Slot::new(now))),
            };
            slot.touch(now);
            Arc::clone(slot)
        };

        if let Some(fragments) = slot.value.get() {
            return Ok(Arc::clone(fragments));
        }

        let _guard = slot.compute.lock();
        // whoever held the lock before may have published
        if let Some(fragments) = slot.value.get() {
            slot.touch(self.time_provider.now());
            return Ok(Arc::clone(fragments));
        }

        let result = compute();
        // touched while still locked, so a slow failure does not leave an expired slot behind
        // for the callers waiting on it
        slot.touch(self.time_provider.now());
        let fragments = result?;
        Ok(Arc::clone(slot.value.get_or_init(|| fragments)))
    }

    /// Return the list cached under `key`, if any. Counts as an access.
    pub fn get(&self, key: &CacheKey) -> Option<FragmentList> {
        let now = self.time_provider.now();
        let mut entries = self.entries.lock();
        self.maybe_evict_expired(&mut entries, now);

        let slot = Arc::clone(entries.slots.get(key)?);
        if slot.is_expired(now, self.idle_expiry) {
            entries.slots.remove(key);
            return None;
        }

        let fragments = slot.value.get()?;
        slot.touch(now);
        Some(Arc::clone(fragments))
    }

    /// Number of published, unexpired entries. Computations in flight are not counted.
    pub fn len(&self) -> usize {
        let now = self.time_provider.now();
        self.entries
            .lock()
            .slots
            .values()
            .filter(|slot| slot.value.get().is_some() && !slot.is_expired(now, self.idle_expiry))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run an eviction pass now.
    pub fn clean_up(&self) {
        let now = self.time_provider.now();
        let mut entries = self.entries.lock();
        self.evict_expired(&mut entries, now);
    }

    fn maybe_evict_expired(&self, entries: &mut Entries, now: Time) {
        if now.saturating_duration_since(entries.last_eviction) >= self.idle_expiry {
            self.evict_expired(entries, now);
        }
    }

    fn evict_expired(&self, entries: &mut Entries, now: Time) {
        entries.last_eviction = now;

        let before = entries.slots.len();
        entries
            .slots
            .retain(|_, slot| !slot.is_expired(now, self.idle_expiry));

        let evicted = before - entries.slots.len();
        if evicted > 0 {
            debug!(
                evicted,
                remaining = entries.slots.len(),
                "evicted idle fragment cache entries"
            );
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.entries.lock().slots.len()
    }
}

impl std::fmt::Debug for FragmentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentCache")
            .field("idle_expiry", &self.idle_expiry)
            .field("time_provider", &self.time_provider)
            .finish_non_exhaustive()
    }
}

fn background_eviction_process(
    cache: Arc<FragmentCache>,
    eviction_interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(eviction_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("fragment cache eviction stopped");
                    return;
                }
                _ = interval.tick() => cache.clean_up(),
            }
        }
    })
}
