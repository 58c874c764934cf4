//! The long-running dispatch loop.
//!
//! ```text
//! IDLE → WAITING(entry) → DISPATCHING → SUCCESS | FAILED → WAITING(next) → …
//! ```
//!
//! Entries come from a [`MergeScheduler`] built from the tracker's last
//! success times. A failed dispatch leaves the tracker untouched and the
//! loop moves on to the next merged entry; the failed occurrence is not
//! retried within this run. Only cancellation and a tracker that can no
//! longer be written end the loop.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::actor::{ActionExecutor, ActorFactory};
use crate::clock::{wall_clock_wait, Clock};
use crate::config::{Config, Intervals};
use crate::error::{Result, UpdaterError};
use crate::guard::{guarded, GuardSettings};
use crate::schedule::{EventStream, MergeScheduler};
use crate::tracker::Tracker;
use crate::types::ActionKind;

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub intervals: Intervals,
    pub poll_quantum: Duration,
    pub guard: GuardSettings,
}

impl LoopSettings {
    pub fn from_config(config: &Config, guard: GuardSettings) -> Self {
        Self {
            intervals: config.intervals.clone(),
            poll_quantum: config.poll_quantum(),
            guard,
        }
    }
}

pub struct ControlLoop<'a, F, E, C> {
    tracker: &'a Tracker,
    factory: F,
    executor: E,
    clock: C,
    settings: LoopSettings,
}

impl<'a, F, E, C> ControlLoop<'a, F, E, C>
where
    F: ActorFactory,
    E: ActionExecutor<F::Actor>,
    C: Clock,
{
    pub fn new(
        tracker: &'a Tracker,
        factory: F,
        executor: E,
        clock: C,
        settings: LoopSettings,
    ) -> Self {
        Self {
            tracker,
            factory,
            executor,
            clock,
            settings,
        }
    }

    /// Build one stream per kind from the tracker, in registration order.
    pub fn build_scheduler(&self) -> Result<MergeScheduler> {
        let now = self.clock.now();
        let mut streams = Vec::with_capacity(ActionKind::all().len());
        for &kind in ActionKind::all() {
            let last = self.tracker.last(kind)?;
            tracing::info!(%kind, last_success = %last, "last success");
            streams.push(EventStream::new(
                kind,
                last,
                self.settings.intervals.for_kind(kind),
                now,
            )?);
        }
        Ok(MergeScheduler::new(streams))
    }

    /// Run until `cancel` fires.
    ///
    /// Fails only if the tracker cannot be read at startup or written later.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        let scheduler = self.build_scheduler()?;
        self.run_with(scheduler, cancel).await
    }

    /// [`run`](Self::run) over an already built scheduler.
    pub async fn run_with<R: Rng>(
        &self,
        mut scheduler: MergeScheduler<R>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        async move {
            tracing::info!("starting scheduler");
            while let Some(entry) = scheduler.pop() {
                tracing::info!(what = %entry.what, when = %entry.when, "next event");
                if !wall_clock_wait(&self.clock, entry.when, self.settings.poll_quantum, cancel)
                    .await
                {
                    tracing::info!("cancelled while waiting");
                    return Ok(());
                }
                match self.dispatch(entry.what, cancel).await {
                    Ok(()) => {}
                    Err(UpdaterError::Cancelled) => {
                        tracing::info!(what = %entry.what, "cancelled during dispatch");
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        }
        .instrument(tracing::info_span!("evloop"))
        .await
    }

    /// Execute one action and record its success.
    ///
    /// Per-action failures are logged and swallowed. `Cancelled` and
    /// tracker write failures are returned.
    pub async fn dispatch(&self, kind: ActionKind, cancel: &CancellationToken) -> Result<()> {
        tracing::info!(%kind, "dispatching");
        let result = guarded(
            &self.factory,
            &self.executor,
            &self.clock,
            kind,
            &self.settings.guard,
            cancel,
        )
        .await;

        match result {
            Ok(()) => {
                let done = self.clock.now();
                if let Err(e) = self.tracker.record(kind, done) {
                    tracing::error!(%kind, error = %e, "cannot record success; stopping");
                    return Err(e);
                }
                tracing::info!(%kind, at = %done, "action succeeded");
                Ok(())
            }
            Err(UpdaterError::Cancelled) => Err(UpdaterError::Cancelled),
            Err(e @ UpdaterError::ActorFailure { .. }) => {
                let artifact = match &e {
                    UpdaterError::ActorFailure {
                        artifact: Some(path),
                        ..
                    } => path.display().to_string(),
                    _ => "none".to_string(),
                };
                tracing::error!(
                    %kind,
                    at = %self.clock.now(),
                    error = %e,
                    %artifact,
                    "action failed: actor failure"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(%kind, at = %self.clock.now(), error = %e, "action failed");
                Ok(())
            }
        }
    }
}
