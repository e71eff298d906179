//! Priority queue of pending operations.

use profsync_protocol::QueuedOperation;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use uuid::Uuid;

/// A heap slot: priority descending, then sequence ascending.
///
/// Sequence numbers implement both tie-break rules: `push` hands out
/// increasing numbers (FIFO among equal priorities) and `push_front`
/// hands out decreasing negative numbers, so a retried operation sorts
/// ahead of every already queued peer without re-sorting anything.
#[derive(Debug, Clone)]
struct Slot {
    priority: u8,
    seq: i64,
    operation: QueuedOperation,
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then lower sequence.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// An ordered queue of pending operations.
///
/// # Invariants
///
/// - `pop` always returns the highest-priority operation
/// - Equal priorities come out in enqueue order (FIFO)
/// - `push_front` operations come out before everything already queued
///   at their priority
#[derive(Debug, Default)]
pub struct OperationQueue {
    heap: BinaryHeap<Slot>,
    next_seq: i64,
    front_seq: i64,
}

impl OperationQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 1,
            front_seq: 0,
        }
    }

    /// Enqueues an operation behind its priority peers.
    pub fn push(&mut self, operation: QueuedOperation) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Slot {
            priority: operation.priority,
            seq,
            operation,
        });
    }

    /// Enqueues an operation ahead of its priority peers, for immediate
    /// retry on the next drain.
    pub fn push_front(&mut self, operation: QueuedOperation) {
        let seq = self.front_seq;
        self.front_seq -= 1;
        self.heap.push(Slot {
            priority: operation.priority,
            seq,
            operation,
        });
    }

    /// Removes and returns the highest-priority operation.
    pub fn pop(&mut self) -> Option<QueuedOperation> {
        self.heap.pop().map(|slot| slot.operation)
    }

    /// Returns the highest-priority operation without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&QueuedOperation> {
        self.heap.peek().map(|slot| &slot.operation)
    }

    /// Removes the operation with the given ID, if queued.
    ///
    /// Returns the removed operation. O(n): rebuilds the heap.
    pub fn remove(&mut self, id: Uuid) -> Option<QueuedOperation> {
        let mut removed = None;
        let slots = std::mem::take(&mut self.heap).into_vec();
        for slot in slots {
            if removed.is_none() && slot.operation.id == id {
                removed = Some(slot.operation);
            } else {
                self.heap.push(slot);
            }
        }
        removed
    }

    /// Returns the number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns all queued operations in drain order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueuedOperation> {
        let mut slots: Vec<Slot> = self.heap.iter().cloned().collect();
        slots.sort_by(|a, b| b.cmp(a));
        slots.into_iter().map(|s| s.operation).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profsync_protocol::OperationPayload;

    fn op(priority: u8) -> QueuedOperation {
        QueuedOperation::new(OperationPayload::DeleteAvatar, priority, false).unwrap()
    }

    #[test]
    fn pops_highest_priority_first() {
        let mut queue = OperationQueue::new();
        let low = op(2);
        let high = op(9);
        let mid = op(5);
        queue.push(low.clone());
        queue.push(high.clone());
        queue.push(mid.clone());

        assert_eq!(queue.pop().unwrap().id, high.id);
        assert_eq!(queue.pop().unwrap().id, mid.id);
        assert_eq!(queue.pop().unwrap().id, low.id);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn equal_priorities_are_fifo() {
        let mut queue = OperationQueue::new();
        let first = op(5);
        let second = op(5);
        let third = op(5);
        queue.push(first.clone());
        queue.push(second.clone());
        queue.push(third.clone());

        assert_eq!(queue.pop().unwrap().id, first.id);
        assert_eq!(queue.pop().unwrap().id, second.id);
        assert_eq!(queue.pop().unwrap().id, third.id);
    }

    #[test]
    fn push_front_jumps_priority_peers() {
        let mut queue = OperationQueue::new();
        let a = op(5);
        let b = op(5);
        let retried = op(5);
        queue.push(a.clone());
        queue.push(b.clone());
        queue.push_front(retried.clone());

        assert_eq!(queue.pop().unwrap().id, retried.id);
        assert_eq!(queue.pop().unwrap().id, a.id);
        assert_eq!(queue.pop().unwrap().id, b.id);
    }

    #[test]
    fn push_front_does_not_outrank_higher_priority() {
        let mut queue = OperationQueue::new();
        let urgent = op(9);
        let retried = op(3);
        queue.push(urgent.clone());
        queue.push_front(retried.clone());

        assert_eq!(queue.pop().unwrap().id, urgent.id);
        assert_eq!(queue.pop().unwrap().id, retried.id);
    }

    #[test]
    fn remove_by_id() {
        let mut queue = OperationQueue::new();
        let a = op(5);
        let b = op(7);
        queue.push(a.clone());
        queue.push(b.clone());

        assert_eq!(queue.remove(a.id).unwrap().id, a.id);
        assert!(queue.remove(a.id).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().id, b.id);
    }

    #[test]
    fn snapshot_is_in_drain_order() {
        let mut queue = OperationQueue::new();
        let a = op(3);
        let b = op(8);
        let c = op(8);
        queue.push(a.clone());
        queue.push(b.clone());
        queue.push(c.clone());

        let ids: Vec<_> = queue.snapshot().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![b.id, c.id, a.id]);
        // Snapshot does not consume.
        assert_eq!(queue.len(), 3);
    }
}
