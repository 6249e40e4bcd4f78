use super::EventQueue;
use crate::event::{EventId, EventNode};
use crate::time::SimTime;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

///
/// The standard-library binary heap, minimal per-event overhead.
///
/// There is no interior removal here: [`remove`](EventQueue::remove) always
/// reports `None` and the wrapper falls back to cancel-in-place, reclaiming
/// the slot when it reaches the top.
///
pub(crate) struct PriorityQueue {
    heap: BinaryHeap<Reverse<EventNode>>,
}

impl PriorityQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::with_capacity(64),
        }
    }
}

impl EventQueue for PriorityQueue {
    fn insert(&mut self, node: EventNode) {
        self.heap.push(Reverse(node));
    }

    fn peek(&mut self) -> Option<&EventNode> {
        self.heap.peek().map(|Reverse(node)| node)
    }

    fn pop(&mut self) -> Option<EventNode> {
        self.heap.pop().map(|Reverse(node)| node)
    }

    fn remove(&mut self, _time: SimTime, _id: EventId) -> Option<EventNode> {
        None
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn descriptor(&self) -> String {
        "Priority".to_string()
    }
}
