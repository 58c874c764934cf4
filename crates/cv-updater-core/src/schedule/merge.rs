use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;

use super::stream::EventStream;
use crate::types::ScheduleEntry;

/// k-way merge of event streams into one sequence ordered by `when`.
///
/// Heap keys are `(when, registration index)`, so equal due times come out
/// in the order the streams were supplied. Each pop is `O(log n)` and pulls
/// exactly one entry from one stream.
#[derive(Debug)]
pub struct MergeScheduler<R = StdRng> {
    streams: Vec<EventStream<R>>,
    heap: BinaryHeap<Reverse<(DateTime<Utc>, usize)>>,
}

impl<R: Rng> MergeScheduler<R> {
    pub fn new(streams: Vec<EventStream<R>>) -> Self {
        let heap = streams
            .iter()
            .enumerate()
            .map(|(i, s)| Reverse((s.peek().when, i)))
            .collect();
        Self { streams, heap }
    }

    /// The entry the next call to [`pop`](Self::pop) will return.
    pub fn peek(&self) -> Option<ScheduleEntry> {
        let Reverse((_, i)) = self.heap.peek()?;
        Some(self.streams[*i].peek())
    }

    /// Emit the globally earliest pending entry.
    ///
    /// Returns `None` only when no streams were registered.
    pub fn pop(&mut self) -> Option<ScheduleEntry> {
        let Reverse((_, i)) = self.heap.pop()?;
        let stream = &mut self.streams[i];
        let entry = stream.advance();
        self.heap.push(Reverse((stream.peek().when, i)));
        Some(entry)
    }
}

impl<R: Rng> Iterator for MergeScheduler<R> {
    type Item = ScheduleEntry;

    fn next(&mut self) -> Option<ScheduleEntry> {
        self.pop()
    }
}
