use super::EventQueue;
use crate::event::{EventId, EventNode};
use crate::time::SimTime;
use std::collections::BTreeMap;

///
/// The default queue: a balanced ordered map keyed by `(time, id)`.
///
/// Logarithmic on every operation with a predictable worst case, which makes
/// it the safe choice when nothing is known about the event pattern.
///
pub(crate) struct MapQueue {
    map: BTreeMap<(SimTime, EventId), EventNode>,
}

impl MapQueue {
    pub(crate) fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl EventQueue for MapQueue {
    fn insert(&mut self, node: EventNode) {
        self.map.insert(node.key(), node);
    }

    fn peek(&mut self) -> Option<&EventNode> {
        self.map.values().next()
    }

    fn pop(&mut self) -> Option<EventNode> {
        let key = *self.map.keys().next()?;
        self.map.remove(&key)
    }

    fn remove(&mut self, time: SimTime, id: EventId) -> Option<EventNode> {
        self.map.remove(&(time, id))
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn descriptor(&self) -> String {
        "Map".to_string()
    }
}
