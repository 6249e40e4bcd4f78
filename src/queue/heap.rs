use super::EventQueue;
use crate::event::{EventId, EventNode};
use crate::time::SimTime;
use fxhash::FxHashMap;

///
/// An explicit array-backed min-heap with a slot index.
///
/// The slot index maps event ids to heap positions, buying logarithmic
/// interior removal at the price of one hash entry per event. The
/// [`PriorityQueue`](super::PriorityQueue) variant drops the index, and with
/// it the ability to remove anywhere but the top.
///
pub(crate) struct HeapQueue {
    heap: Vec<EventNode>,
    slots: FxHashMap<EventId, usize>,
}

impl HeapQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: Vec::with_capacity(64),
            slots: FxHashMap::default(),
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots.insert(self.heap[a].id, a);
        self.slots.insert(self.heap[b].id, b);
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.heap[idx] < self.heap[parent] {
                self.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;

            if left < self.heap.len() && self.heap[left] < self.heap[smallest] {
                smallest = left;
            }
            if right < self.heap.len() && self.heap[right] < self.heap[smallest] {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.swap(idx, smallest);
            idx = smallest;
        }
    }

    /// Detaches the node at `idx`, restoring the heap property afterwards.
    fn take(&mut self, idx: usize) -> EventNode {
        let last = self.heap.len() - 1;
        if idx == last {
            let node = self.heap.pop().unwrap();
            self.slots.remove(&node.id);
            return node;
        }

        self.heap.swap(idx, last);
        let node = self.heap.pop().unwrap();
        self.slots.remove(&node.id);
        self.slots.insert(self.heap[idx].id, idx);
        self.sift_down(idx);
        self.sift_up(idx);
        node
    }
}

impl EventQueue for HeapQueue {
    fn insert(&mut self, node: EventNode) {
        let idx = self.heap.len();
        self.slots.insert(node.id, idx);
        self.heap.push(node);
        self.sift_up(idx);
    }

    fn peek(&mut self) -> Option<&EventNode> {
        self.heap.first()
    }

    fn pop(&mut self) -> Option<EventNode> {
        if self.heap.is_empty() {
            None
        } else {
            Some(self.take(0))
        }
    }

    fn remove(&mut self, _time: SimTime, id: EventId) -> Option<EventNode> {
        let idx = *self.slots.get(&id)?;
        Some(self.take(idx))
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn descriptor(&self) -> String {
        "Heap".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NO_CONTEXT;

    fn node(time: i64, id: EventId) -> EventNode {
        EventNode {
            time: SimTime::from_ticks(time),
            id,
            context: NO_CONTEXT,
            payload: Box::new(|_| {}),
        }
    }

    #[test]
    fn interior_removal_keeps_order() {
        let mut q = HeapQueue::new();
        for (t, id) in [(50, 0), (10, 1), (30, 2), (20, 3), (40, 4)] {
            q.insert(node(t, id));
        }

        assert_eq!(q.remove(SimTime::from_ticks(30), 2).unwrap().id, 2);
        assert!(q.remove(SimTime::from_ticks(30), 2).is_none());

        let mut order = Vec::new();
        while let Some(n) = q.pop() {
            order.push(n.time.ticks());
        }
        assert_eq!(order, vec![10, 20, 40, 50]);
    }

    #[test]
    fn removing_the_minimum_promotes_the_next() {
        let mut q = HeapQueue::new();
        for (t, id) in [(5, 0), (1, 1), (3, 2)] {
            q.insert(node(t, id));
        }
        q.remove(SimTime::from_ticks(1), 1);
        assert_eq!(q.peek().unwrap().time.ticks(), 3);
    }
}
