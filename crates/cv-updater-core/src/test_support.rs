//! Mocks shared by the unit tests: a manual clock, a counting actor and a
//! scripted executor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;

use crate::actor::{ActionExecutor, Actor, ActorFactory};
use crate::clock::Clock;
use crate::error::{ActionError, ActorError};
use crate::types::ActionKind;

// ─── ManualClock ──────────────────────────────────────────────────────────

/// Wall clock that only moves when slept on or advanced.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
    sleeps: Arc<AtomicUsize>,
}

impl ManualClock {
    pub fn at(secs: i64) -> Self {
        Self {
            now: Arc::new(Mutex::new(DateTime::from_timestamp(secs, 0).unwrap())),
            sleeps: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(TimeDelta::from_std(duration).unwrap());
        tokio::task::yield_now().await;
    }
}

// ─── MockActor / MockFactory ──────────────────────────────────────────────

/// Counters shared between a factory and every actor it hands out.
#[derive(Debug, Default)]
pub struct ActorCounters {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub abandoned: AtomicUsize,
    pub captured: AtomicUsize,
}

impl ActorCounters {
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> usize {
        self.captured.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct MockActor {
    counters: Arc<ActorCounters>,
    capture_fails: bool,
    unresponsive: bool,
}

impl MockActor {
    pub fn new(counters: Arc<ActorCounters>) -> Self {
        Self {
            counters,
            capture_fails: false,
            unresponsive: false,
        }
    }
}

impl MockActor {
    /// Never returns when the actor is unresponsive, like a wedged browser.
    async fn stall(&self) {
        if self.unresponsive {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl Actor for MockActor {
    async fn location(&mut self) -> Result<String, ActorError> {
        self.stall().await;
        Ok("https://example.test/resumes/".to_string())
    }

    async fn session_state(&mut self) -> Result<serde_json::Value, ActorError> {
        self.stall().await;
        Ok(serde_json::json!([{ "name": "sid", "value": "abc" }]))
    }

    async fn capture(&mut self) -> Result<Vec<u8>, ActorError> {
        self.counters.captured.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        if self.capture_fails {
            return Err(ActorError::new("screenshot unavailable"));
        }
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn release(self) -> Result<(), ActorError> {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn abandon(&mut self) {
        self.counters.abandoned.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct MockFactory {
    pub counters: Arc<ActorCounters>,
    pub fail_acquire: bool,
    pub capture_fails: bool,
    /// Hand out actors whose location, state and capture calls never return.
    pub unresponsive: bool,
}

#[async_trait]
impl ActorFactory for MockFactory {
    type Actor = MockActor;

    async fn acquire(&self) -> Result<MockActor, ActorError> {
        if self.fail_acquire {
            return Err(ActorError::new("driver did not start"));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MockActor {
            counters: Arc::clone(&self.counters),
            capture_fails: self.capture_fails,
            unresponsive: self.unresponsive,
        })
    }
}

// ─── ScriptedExecutor ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    Fail(&'static str),
    ActorFault(&'static str),
    /// Never completes.
    Hang,
}

/// Plays back a script of outcomes, then succeeds.
///
/// Optionally cancels a token once a number of calls have been made, which
/// lets a control loop test stop after a known number of dispatches.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<ActionKind>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedExecutor {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn calls(&self) -> Vec<ActionKind> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<A: Actor> ActionExecutor<A> for ScriptedExecutor {
    async fn execute(
        &self,
        kind: ActionKind,
        _actor: &mut A,
        _wait_timeout: Duration,
    ) -> Result<(), ActionError> {
        let made = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(kind);
            calls.len()
        };
        if let Some((limit, token)) = &self.cancel_after {
            if made >= *limit {
                token.cancel();
            }
        }
        let step = self.script.lock().unwrap().pop_front();
        match step.unwrap_or(Step::Succeed) {
            Step::Succeed => Ok(()),
            Step::Fail(reason) => Err(ActionError::failed(reason)),
            Step::ActorFault(reason) => Err(ActorError::new(reason).into()),
            Step::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}
