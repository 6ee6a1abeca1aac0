//! # Time-Based Expiry
//!
//! Entries of the LFU store live for a fixed TTL measured from their last
//! write or hit. Rather than one timer per entry, each store owns a single
//! [`ExpiryScheduler`] (a [`DeadlineHeap`] of `(deadline, key)` pairs) and a
//! single background thread, the [`ExpiryWorker`], that sleeps until the
//! earliest deadline.
//!
//! ## Architecture
//!
//! ```text
//!   request threads                           expiry worker thread
//!   ───────────────                           ────────────────────
//!   put / take / delete                       loop {
//!        │                                      lock state
//!        ▼                                      expire_due(now)  ──► removes due
//!   ┌──────────────────────────────────────┐    park(next)            entries
//!   │ ExpiryShared<T>                      │    wait_until(next) ◄──┐
//!   │                                      │  }                     │
//!   │   Mutex<T>  ◄─── one lock for map,   │                        │
//!   │                  index and deadlines │                        │
//!   │   Condvar   ─────────────────────────┼── notify when a new ───┘
//!   │                                      │   deadline precedes the
//!   │   shutdown: AtomicBool               │   one the worker sleeps on
//!   └──────────────────────────────────────┘
//! ```
//!
//! ## Race Freedom
//!
//! Firing happens under the same mutex as `put`/`take`/`delete`. A deadline
//! that was rescheduled or cancelled is only stale in the heap; the
//! authoritative per-key deadline no longer matches it, so it is skipped.
//! A late firing therefore never removes a newer entry for the same key.
//!
//! The worker re-evaluates the heap every time it re-acquires the lock, and
//! request threads only skip the notification when the worker is already
//! parked on an earlier (or equal) deadline, so no wakeup is lost.
//!
//! ## Shutdown
//!
//! Dropping the [`ExpiryWorker`] raises the shutdown flag under the lock,
//! wakes the thread, and joins it. Stores hold the worker behind an `Arc`, so
//! the thread stops when the last store handle goes away.

use std::hash::Hash;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::ds::DeadlineHeap;

/// What the worker was doing when it last released the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parked {
    /// Not parked; it will re-evaluate before sleeping.
    Running,
    /// Parked with nothing scheduled.
    Idle,
    /// Parked until this instant.
    Until(Instant),
}

/// Per-store TTL bookkeeping: the TTL, the pending deadlines, and the
/// worker's parking state.
#[derive(Debug)]
pub struct ExpiryScheduler<K> {
    ttl: Duration,
    deadlines: DeadlineHeap<K>,
    parked: Parked,
}

impl<K> ExpiryScheduler<K> {
    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<K> ExpiryScheduler<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, 0)
    }

    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            deadlines: DeadlineHeap::with_capacity(capacity),
            parked: Parked::Running,
        }
    }

    /// Number of keys with a pending deadline.
    #[inline]
    pub fn pending(&self) -> usize {
        self.deadlines.len()
    }

    /// (Re)schedules `key` to expire one TTL after `now`.
    ///
    /// A TTL too large to be represented as an [`Instant`] means the entry
    /// never expires: any earlier deadline is dropped and nothing is queued.
    ///
    /// Returns `true` when the worker must be woken because the new deadline
    /// precedes the one it is parked on.
    pub fn schedule(&mut self, key: K, now: Instant) -> bool {
        let Some(deadline) = now.checked_add(self.ttl) else {
            self.deadlines.cancel(&key);
            return false;
        };
        self.deadlines.schedule(key, deadline);
        match self.parked {
            Parked::Running => false,
            Parked::Idle => true,
            Parked::Until(parked) => deadline < parked,
        }
    }

    /// Cancels the pending deadline for `key`.
    #[inline]
    pub fn cancel(&mut self, key: &K) -> Option<Instant> {
        self.deadlines.cancel(key)
    }

    #[inline]
    pub fn deadline_of(&self, key: &K) -> Option<Instant> {
        self.deadlines.deadline_of(key)
    }

    /// Pops the next key whose deadline has passed.
    #[inline]
    pub fn pop_due(&mut self, now: Instant) -> Option<K> {
        self.deadlines.pop_due(now)
    }

    #[inline]
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.deadlines.next_deadline()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    pub(crate) fn park(&mut self, until: Option<Instant>) {
        self.parked = match until {
            Some(deadline) => Parked::Until(deadline),
            None => Parked::Idle,
        };
    }

    pub(crate) fn resume(&mut self) {
        self.parked = Parked::Running;
    }
}

/// State that an [`ExpiryWorker`] can purge.
pub trait Expire: Send + 'static {
    /// Item reported for every expired entry.
    type Expired: Send + 'static;

    /// Removes every entry due at `now`, pushing them onto `expired`.
    /// Returns the next pending deadline.
    fn expire_due(&mut self, now: Instant, expired: &mut Vec<Self::Expired>) -> Option<Instant>;

    /// Records that the worker is about to sleep until `until`.
    fn park(&mut self, until: Option<Instant>);

    /// Records that the worker is awake and holding the lock.
    fn resume(&mut self);
}

/// A store's lock, plus the condition variable and shutdown flag the expiry
/// worker sleeps on.
#[derive(Debug)]
pub struct ExpiryShared<T> {
    state: Mutex<T>,
    wake: Condvar,
    shutdown: AtomicBool,
}

impl<T> ExpiryShared<T> {
    pub fn new(state: T) -> Self {
        Self {
            state: Mutex::new(state),
            wake: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock()
    }

    /// Wakes the worker so it re-reads the earliest deadline.
    #[inline]
    pub fn notify(&self) {
        self.wake.notify_one();
    }
}

/// Background thread purging expired entries from an [`ExpiryShared`] state.
pub struct ExpiryWorker<T> {
    shared: Arc<ExpiryShared<T>>,
    handle: Option<JoinHandle<()>>,
}

impl<T> ExpiryWorker<T>
where
    T: Expire,
{
    /// Starts the worker thread.
    ///
    /// `on_expired` runs on the worker thread, outside the lock, once per
    /// purged batch.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn<F>(shared: Arc<ExpiryShared<T>>, name: &str, on_expired: F) -> io::Result<Self>
    where
        F: FnMut(Vec<T::Expired>) + Send + 'static,
    {
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(worker_shared, on_expired))?;
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }
}

fn run<T, F>(shared: Arc<ExpiryShared<T>>, mut on_expired: F)
where
    T: Expire,
    F: FnMut(Vec<T::Expired>),
{
    debug!("expiry worker started");
    let mut expired = Vec::new();
    let mut state = shared.state.lock();

    while !shared.shutdown.load(Ordering::Acquire) {
        state.resume();
        let next = state.expire_due(Instant::now(), &mut expired);

        if !expired.is_empty() {
            let batch = std::mem::take(&mut expired);
            trace!(count = batch.len(), "purged expired entries");
            MutexGuard::unlocked(&mut state, || on_expired(batch));
            continue;
        }

        state.park(next);
        match next {
            Some(deadline) => {
                shared.wake.wait_until(&mut state, deadline);
            },
            None => shared.wake.wait(&mut state),
        }
    }

    debug!("expiry worker stopped");
}

impl<T> Drop for ExpiryWorker<T> {
    fn drop(&mut self) {
        {
            let _state = self.shared.state.lock();
            self.shared.shutdown.store(true, Ordering::Release);
            self.shared.wake.notify_all();
        }
        if let Some(handle) = self.handle.take()
            && handle.thread().id() != thread::current().id()
        {
            let _ = handle.join();
        }
    }
}

impl<T> std::fmt::Debug for ExpiryWorker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryWorker")
            .field("running", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}
