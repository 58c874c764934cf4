use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::types::{ActionKind, IntervalSpec, ScheduleEntry};

/// Infinite sequence of due times for one action kind.
///
/// The first due time is `last_success + gap`, clamped to be no earlier than
/// the construction time. Every later due time adds a fresh gap to the
/// previous *scheduled* time, never to the wall clock, so the sequence is
/// strictly increasing and drift accumulates.
#[derive(Debug)]
pub struct EventStream<R = StdRng> {
    kind: ActionKind,
    spec: IntervalSpec,
    next: DateTime<Utc>,
    rng: R,
}

impl EventStream<StdRng> {
    /// Build a stream seeded from OS entropy.
    pub fn new(
        kind: ActionKind,
        last_success: DateTime<Utc>,
        spec: IntervalSpec,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Self::with_rng(kind, last_success, spec, now, StdRng::from_entropy())
    }
}

impl<R: Rng> EventStream<R> {
    pub fn with_rng(
        kind: ActionKind,
        last_success: DateTime<Utc>,
        spec: IntervalSpec,
        now: DateTime<Utc>,
        mut rng: R,
    ) -> Result<Self> {
        spec.validate(kind)?;
        let candidate = last_success + spec.sample(&mut rng);
        Ok(Self {
            kind,
            spec,
            next: candidate.max(now),
            rng,
        })
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// The entry [`advance`](Self::advance) will return next.
    pub fn peek(&self) -> ScheduleEntry {
        ScheduleEntry {
            when: self.next,
            what: self.kind,
        }
    }

    /// Emit the pending entry and draw the one after it.
    pub fn advance(&mut self) -> ScheduleEntry {
        let entry = self.peek();
        self.next = entry.when + self.spec.sample(&mut self.rng);
        entry
    }
}

impl<R: Rng> Iterator for EventStream<R> {
    type Item = ScheduleEntry;

    fn next(&mut self) -> Option<ScheduleEntry> {
        Some(self.advance())
    }
}
