//! Lazy min-heap of expiry deadlines.
//!
//! A priority queue of `(deadline, key)` pairs that supports O(1)
//! cancellation and O(log n) rescheduling by deferring cleanup. Rescheduling a
//! key pushes a fresh heap entry and overwrites the authoritative deadline;
//! the old heap entry becomes stale and is skipped when it reaches the top.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                         DeadlineHeap Layout                                 │
//! │                                                                             │
//! │   ┌───────────────────────────────────────────────────────────────────┐    │
//! │   │  deadlines: FxHashMap<K, Instant>   (authoritative)                │    │
//! │   │                                                                   │    │
//! │   │    ┌─────────┬──────────┐                                         │    │
//! │   │    │  key    │ deadline │                                         │    │
//! │   │    ├─────────┼──────────┤                                         │    │
//! │   │    │  "A"    │  t+40    │   (rescheduled from t+10)               │    │
//! │   │    │  "B"    │  t+20    │                                         │    │
//! │   │    └─────────┴──────────┘                                         │    │
//! │   └───────────────────────────────────────────────────────────────────┘    │
//! │                                                                             │
//! │   ┌───────────────────────────────────────────────────────────────────┐    │
//! │   │  heap: BinaryHeap<Reverse<Slot>>   (may hold stale entries)        │    │
//! │   │                                                                   │    │
//! │   │    ("A", t+10, seq=0) ← STALE: deadlines["A"] = t+40              │    │
//! │   │    ("B", t+20, seq=1) ← next to fire                              │    │
//! │   │    ("C", t+30, seq=2) ← STALE: "C" was cancelled                  │    │
//! │   │    ("A", t+40, seq=3) ← valid                                     │    │
//! │   └───────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A heap slot is live only while `deadlines[key]` still holds exactly the
//! slot's deadline *and* sequence number. Matching on the sequence number
//! (not just the instant) means a key rescheduled to the same instant is
//! never fired twice, and a cancelled-then-rescheduled key is never fired by
//! its older slot.
//!
//! ## Operations
//!
//! | Operation       | Description                                 | Complexity         |
//! |-----------------|---------------------------------------------|--------------------|
//! | `schedule`      | Set/replace deadline, push heap slot        | O(log n)           |
//! | `cancel`        | Drop authoritative deadline only            | O(1)               |
//! | `pop_due(now)`  | Pop next live slot with deadline <= now     | Amortized O(log n) |
//! | `next_deadline` | Earliest live deadline (discards stale top) | Amortized O(log n) |
//! | `deadline_of`   | Current deadline for a key                  | O(1)               |
//!
//! ## Example Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use cachegate::ds::DeadlineHeap;
//!
//! let start = Instant::now();
//! let mut heap = DeadlineHeap::new();
//!
//! heap.schedule("a", start + Duration::from_millis(10));
//! heap.schedule("b", start + Duration::from_millis(20));
//! heap.schedule("a", start + Duration::from_millis(30)); // "a" rescheduled
//!
//! let now = start + Duration::from_millis(25);
//! assert_eq!(heap.pop_due(now), Some("b"));
//! assert_eq!(heap.pop_due(now), None); // "a" now fires at +30
//! assert_eq!(heap.next_deadline(), Some(start + Duration::from_millis(30)));
//! ```
//!
//! ## Thread Safety
//!
//! `DeadlineHeap` is not thread-safe. The LFU store keeps it inside the same
//! mutex as its entry map, so firing and cancelling are serialized with every
//! other store operation.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::hash::Hash;
use std::time::Instant;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct Slot<K> {
    deadline: Instant,
    seq: u64,
    key: K,
}

impl<K> PartialEq for Slot<K> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<K> Eq for Slot<K> {}

impl<K> PartialOrd for Slot<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Slot<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.deadline.cmp(&other.deadline) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ordering => ordering,
        }
    }
}

/// Min-heap of deadlines with O(1) cancellation via lazy deletion.
#[derive(Debug)]
pub struct DeadlineHeap<K> {
    deadlines: FxHashMap<K, (Instant, u64)>,
    heap: BinaryHeap<Reverse<Slot<K>>>,
    seq: u64,
}

impl<K> DeadlineHeap<K>
where
    K: Eq + Hash + Clone,
{
    /// Stale slots tolerated per live deadline before a rebuild.
    const MAX_STALE_FACTOR: usize = 4;

    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            deadlines: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            heap: BinaryHeap::with_capacity(capacity),
            seq: 0,
        }
    }

    /// Number of keys with a pending deadline.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Heap length including stale slots.
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    /// Current deadline for `key`, if scheduled.
    pub fn deadline_of(&self, key: &K) -> Option<Instant> {
        self.deadlines.get(key).map(|&(deadline, _)| deadline)
    }

    /// Schedules `key` to fire at `deadline`, replacing any pending deadline.
    ///
    /// Returns the replaced deadline.
    pub fn schedule(&mut self, key: K, deadline: Instant) -> Option<Instant> {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);

        let previous = self
            .deadlines
            .insert(key.clone(), (deadline, seq))
            .map(|(previous, _)| previous);
        self.heap.push(Reverse(Slot { deadline, seq, key }));
        self.maybe_rebuild();
        previous
    }

    /// Cancels the pending deadline for `key`.
    ///
    /// The heap slot stays behind and is discarded when it surfaces.
    pub fn cancel(&mut self, key: &K) -> Option<Instant> {
        self.deadlines.remove(key).map(|(deadline, _)| deadline)
    }

    /// Pops the next key whose live deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<K> {
        self.discard_stale_top();
        let due = matches!(self.heap.peek(), Some(Reverse(slot)) if slot.deadline <= now);
        if !due {
            return None;
        }
        let Reverse(slot) = self.heap.pop()?;
        self.deadlines.remove(&slot.key);
        Some(slot.key)
    }

    /// Earliest live deadline.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_stale_top();
        self.heap.peek().map(|Reverse(slot)| slot.deadline)
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
        self.heap.clear();
    }

    fn is_live(&self, slot: &Slot<K>) -> bool {
        matches!(
            self.deadlines.get(&slot.key),
            Some(&(deadline, seq)) if deadline == slot.deadline && seq == slot.seq
        )
    }

    fn discard_stale_top(&mut self) {
        while let Some(Reverse(slot)) = self.heap.peek() {
            if self.is_live(slot) {
                return;
            }
            self.heap.pop();
        }
    }

    fn maybe_rebuild(&mut self) {
        let limit = self
            .deadlines
            .len()
            .max(1)
            .saturating_mul(Self::MAX_STALE_FACTOR);
        if self.heap.len() <= limit {
            return;
        }
        self.heap.clear();
        for (key, &(deadline, seq)) in &self.deadlines {
            self.heap.push(Reverse(Slot {
                deadline,
                seq,
                key: key.clone(),
            }));
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert!(self.heap.len() >= self.deadlines.len());
        for (key, &(deadline, seq)) in &self.deadlines {
            let present = self
                .heap
                .iter()
                .any(|Reverse(slot)| slot.key == *key && slot.deadline == deadline && slot.seq == seq);
            assert!(present, "live deadline missing from heap");
        }
    }
}

impl<K> Default for DeadlineHeap<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn pops_in_deadline_order() {
        let base = Instant::now();
        let mut heap = DeadlineHeap::new();
        heap.schedule("c", at(base, 30));
        heap.schedule("a", at(base, 10));
        heap.schedule("b", at(base, 20));

        let later = at(base, 100);
        assert_eq!(heap.pop_due(later), Some("a"));
        assert_eq!(heap.pop_due(later), Some("b"));
        assert_eq!(heap.pop_due(later), Some("c"));
        assert_eq!(heap.pop_due(later), None);
        assert!(heap.is_empty());
    }

    #[test]
    fn nothing_due_before_deadline() {
        let base = Instant::now();
        let mut heap = DeadlineHeap::new();
        heap.schedule(1u32, at(base, 50));

        assert_eq!(heap.pop_due(at(base, 49)), None);
        assert_eq!(heap.pop_due(at(base, 50)), Some(1));
    }

    #[test]
    fn reschedule_makes_old_slot_stale() {
        let base = Instant::now();
        let mut heap = DeadlineHeap::new();
        heap.schedule("a", at(base, 10));
        assert_eq!(heap.schedule("a", at(base, 40)), Some(at(base, 10)));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.heap_len(), 2);

        assert_eq!(heap.pop_due(at(base, 20)), None);
        assert_eq!(heap.next_deadline(), Some(at(base, 40)));
        assert_eq!(heap.pop_due(at(base, 40)), Some("a"));
    }

    #[test]
    fn reschedule_to_same_instant_fires_once() {
        let base = Instant::now();
        let mut heap = DeadlineHeap::new();
        heap.schedule("a", at(base, 10));
        heap.schedule("a", at(base, 10));

        assert_eq!(heap.pop_due(at(base, 10)), Some("a"));
        assert_eq!(heap.pop_due(at(base, 10)), None);
    }

    #[test]
    fn cancel_then_reschedule_ignores_old_slot() {
        let base = Instant::now();
        let mut heap = DeadlineHeap::new();
        heap.schedule("a", at(base, 10));
        assert_eq!(heap.cancel(&"a"), Some(at(base, 10)));
        heap.schedule("a", at(base, 50));

        assert_eq!(heap.pop_due(at(base, 20)), None);
        assert_eq!(heap.deadline_of(&"a"), Some(at(base, 50)));
        assert_eq!(heap.pop_due(at(base, 60)), Some("a"));
    }

    #[test]
    fn cancel_missing_key_is_noop() {
        let mut heap: DeadlineHeap<&str> = DeadlineHeap::new();
        assert_eq!(heap.cancel(&"missing"), None);
        assert_eq!(heap.next_deadline(), None);
    }

    #[test]
    fn stale_slots_are_bounded() {
        let base = Instant::now();
        let mut heap = DeadlineHeap::new();
        for round in 0..100u64 {
            heap.schedule("hot", at(base, round));
        }
        assert_eq!(heap.len(), 1);
        assert!(heap.heap_len() <= DeadlineHeap::<&str>::MAX_STALE_FACTOR + 1);
        heap.debug_validate_invariants();
    }

    #[test]
    fn clear_drops_everything() {
        let base = Instant::now();
        let mut heap = DeadlineHeap::new();
        heap.schedule(1, at(base, 1));
        heap.schedule(2, at(base, 2));
        heap.clear();
        assert!(heap.is_empty());
        assert_eq!(heap.heap_len(), 0);
        assert_eq!(heap.pop_due(at(base, 10)), None);
    }
}
