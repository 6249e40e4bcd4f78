use super::EventQueue;
use crate::event::{EventId, EventNode};
use crate::time::SimTime;
use std::collections::VecDeque;

///
/// A calendar queue: a ring of buckets, each covering a fixed tick interval
/// per "year" (one revolution of the ring).
///
/// With bucket width chosen near the mean inter-arrival time, insert and pop
/// are amortized constant. Inside a bucket, nodes stay sorted by the full
/// `(time, id)` key, so same-bucket ties keep their FIFO order.
///
pub(crate) struct CalendarQueue {
    n: usize,
    width: i64,

    buckets: Vec<VecDeque<EventNode>>,
    head: usize,
    /// Upper edge of the head bucket's current window.
    window_end: i128,
    /// Largest timestamp popped so far. Insertions below it would land in a
    /// ring slice the head has already passed.
    floor: SimTime,

    len: usize,
}

impl CalendarQueue {
    pub(crate) fn new(buckets: usize, width: SimTime) -> Self {
        assert!(buckets > 0, "calendar queue requires at least one bucket");
        assert!(
            width.is_positive(),
            "calendar queue requires a positive bucket width"
        );

        Self {
            n: buckets,
            width: width.ticks(),
            buckets: std::iter::repeat_with(|| VecDeque::with_capacity(16))
                .take(buckets)
                .collect(),
            head: 0,
            window_end: i128::from(width.ticks()),
            floor: SimTime::MIN,
            len: 0,
        }
    }

    fn bucket_of(&self, time: SimTime) -> usize {
        let slice = time.ticks().div_euclid(self.width);
        slice.rem_euclid(self.n as i64) as usize
    }

    /// Positions `head` on the bucket holding the global minimum.
    ///
    /// Walks the ring one window at a time; after a fruitless full
    /// revolution the remaining events are at least one year out, and the
    /// window jumps straight to the earliest of them.
    fn normalize(&mut self) {
        if self.len == 0 {
            return;
        }

        let mut steps = 0;
        loop {
            if let Some(front) = self.buckets[self.head].front() {
                if i128::from(front.time.ticks()) <= self.window_end {
                    return;
                }
            }

            self.head = (self.head + 1) % self.n;
            self.window_end += i128::from(self.width);
            steps += 1;

            if steps >= self.n {
                let min = self
                    .buckets
                    .iter()
                    .filter_map(VecDeque::front)
                    .min_by_key(|node| node.key())
                    .expect("normalize called on non-empty queue");
                let slice = min.time.ticks().div_euclid(self.width);
                self.head = slice.rem_euclid(self.n as i64) as usize;
                self.window_end = (i128::from(slice) + 1) * i128::from(self.width);
                return;
            }
        }
    }
}

impl EventQueue for CalendarQueue {
    fn insert(&mut self, node: EventNode) {
        assert!(
            node.time >= self.floor,
            "calendar queue requires non-decreasing insertions"
        );
        let idx = self.bucket_of(node.time);
        let key = node.key();
        let at = self.buckets[idx].partition_point(|other| other.key() < key);
        self.buckets[idx].insert(at, node);
        self.len += 1;
    }

    fn peek(&mut self) -> Option<&EventNode> {
        if self.len == 0 {
            return None;
        }
        self.normalize();
        self.buckets[self.head].front()
    }

    fn pop(&mut self) -> Option<EventNode> {
        if self.len == 0 {
            return None;
        }
        self.normalize();
        let node = self.buckets[self.head].pop_front()?;
        self.floor = node.time;
        self.len -= 1;
        Some(node)
    }

    fn remove(&mut self, time: SimTime, id: EventId) -> Option<EventNode> {
        let idx = self.bucket_of(time);
        let at = self.buckets[idx].partition_point(|other| other.key() < (time, id));
        if self.buckets[idx].get(at).is_some_and(|node| node.id == id) {
            self.len -= 1;
            self.buckets[idx].remove(at)
        } else {
            None
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn descriptor(&self) -> String {
        format!("Calendar({}, {})", self.n, SimTime::from_ticks(self.width))
    }
}
