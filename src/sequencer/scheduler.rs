// Event Scheduler - Timed actions on the engine's logical clock
//
// Min-heap ordered by (time, insertion sequence), so actions due at the same
// instant fire in the order they were scheduled. Cancellation is lazy: a
// cancelled entry stays in the heap and is skipped when it surfaces.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Tolerance when comparing a due time against the clock
pub const TIME_EPSILON: f64 = 1e-9;

/// Handle returned by `schedule_at`, used to cancel the action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(u64);

struct Entry<A> {
    time: f64,
    seq: u64,
    action: A,
}

impl<A> PartialEq for Entry<A> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<A> Eq for Entry<A> {}

impl<A> PartialOrd for Entry<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for Entry<A> {
    // Reversed: BinaryHeap is a max-heap, we want the earliest entry on top
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct EventScheduler<A> {
    heap: BinaryHeap<Entry<A>>,
    pending: HashSet<u64>,
    next_seq: u64,
}

impl<A> EventScheduler<A> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Schedule `action` to fire at `time` (seconds on the engine clock)
    ///
    /// A non-finite time is treated as "now" (0.0 is always due).
    pub fn schedule_at(&mut self, time: f64, action: A) -> ScheduleHandle {
        let time = if time.is_finite() { time } else { 0.0 };
        let seq = self.next_seq;
        self.next_seq += 1;

        self.heap.push(Entry { time, seq, action });
        self.pending.insert(seq);
        ScheduleHandle(seq)
    }

    /// Cancel a pending action
    ///
    /// Returns `false` if it already fired or was already cancelled.
    pub fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        self.pending.remove(&handle.0)
    }

    /// Cancel every handle in `handles`
    pub fn cancel_all(&mut self, handles: impl IntoIterator<Item = ScheduleHandle>) {
        for handle in handles {
            self.cancel(handle);
        }
    }

    /// Pop the next action due at or before `now`
    ///
    /// Returns the action's own due time along with it.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, A)> {
        while let Some(top) = self.heap.peek() {
            if top.time > now + TIME_EPSILON {
                return None;
            }
            let entry = self.heap.pop()?;
            if self.pending.remove(&entry.seq) {
                return Some((entry.time, entry.action));
            }
        }
        None
    }

    /// Due time of the earliest pending action
    pub fn next_due_time(&mut self) -> Option<f64> {
        while let Some(top) = self.heap.peek() {
            if self.pending.contains(&top.seq) {
                return Some(top.time);
            }
            self.heap.pop();
        }
        None
    }

    /// Number of pending (not cancelled, not fired) actions
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending action
    pub fn clear(&mut self) {
        self.heap.clear();
        self.pending.clear();
    }
}

impl<A> Default for EventScheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}
