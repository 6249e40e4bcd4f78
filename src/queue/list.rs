use super::EventQueue;
use crate::event::{EventId, EventNode};
use crate::time::SimTime;
use std::collections::VecDeque;

///
/// A list kept sorted by `(time, id)`.
///
/// Popping the minimum is constant, inserting is linear. Worth it when the
/// model keeps only a handful of distinct future timestamps alive at once.
///
pub(crate) struct ListQueue {
    list: VecDeque<EventNode>,
}

impl ListQueue {
    pub(crate) fn new() -> Self {
        Self {
            list: VecDeque::with_capacity(32),
        }
    }

    fn position(&self, key: (SimTime, EventId)) -> usize {
        self.list.partition_point(|node| node.key() < key)
    }
}

impl EventQueue for ListQueue {
    fn insert(&mut self, node: EventNode) {
        let at = self.position(node.key());
        self.list.insert(at, node);
    }

    fn peek(&mut self) -> Option<&EventNode> {
        self.list.front()
    }

    fn pop(&mut self) -> Option<EventNode> {
        self.list.pop_front()
    }

    fn remove(&mut self, time: SimTime, id: EventId) -> Option<EventNode> {
        let at = self.position((time, id));
        if self.list.get(at).is_some_and(|node| node.id == id) {
            self.list.remove(at)
        } else {
            None
        }
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn descriptor(&self) -> String {
        "List".to_string()
    }
}
