//! Scoped ownership of one actor session.
//!
//! [`guarded`] acquires an actor, runs an executor on it under a time
//! budget and a cancellation token, and releases the actor on every path.
//! Actor faults get a forensic snapshot (location, session state, and a
//! screenshot written to the capture directory) before release. Ordinary
//! failures only log the location at debug level, and timed-out or cancelled
//! runs go straight to release. Post-run calls on the actor are bounded by
//! the wait timeout.
//!
//! [`ResourceGuard`] also releases on drop, synchronously and best-effort,
//! in case the surrounding future is torn down before the async release.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::actor::{ActionExecutor, Actor, ActorFactory};
use crate::clock::Clock;
use crate::error::{ActionError, ActorError, Result, UpdaterError};
use crate::io;
use crate::types::ActionKind;

#[derive(Debug, Clone)]
pub struct GuardSettings {
    /// Where actor-fault screenshots are kept.
    pub capture_dir: PathBuf,
    /// Bound on the whole executor call.
    pub action_budget: Duration,
    /// Passed through to the executor for each individual wait.
    pub wait_timeout: Duration,
}

/// How one guarded execution ended, before it is turned into a `Result`.
#[derive(Debug)]
enum Outcome {
    Succeeded,
    Failed(String),
    ActorFault(ActorError),
    TimedOut,
    Cancelled,
}

/// Owns one actor between acquisition and release.
pub struct ResourceGuard<A: Actor> {
    actor: Option<A>,
}

impl<A: Actor> ResourceGuard<A> {
    pub async fn acquire<F>(factory: &F) -> std::result::Result<Self, ActorError>
    where
        F: ActorFactory<Actor = A>,
    {
        let actor = factory.acquire().await?;
        tracing::debug!("actor acquired");
        Ok(Self { actor: Some(actor) })
    }

    /// The held actor; `None` once released.
    pub fn actor(&mut self) -> Option<&mut A> {
        self.actor.as_mut()
    }

    /// Release the actor. Later calls, and the drop, do nothing.
    pub async fn release(&mut self) {
        let Some(actor) = self.actor.take() else {
            return;
        };
        match actor.release().await {
            Ok(()) => tracing::debug!("actor released"),
            Err(e) => tracing::warn!(error = %e, "actor release failed"),
        }
    }
}

impl<A: Actor> Drop for ResourceGuard<A> {
    fn drop(&mut self) {
        if let Some(mut actor) = self.actor.take() {
            tracing::warn!("actor dropped without release; abandoning session");
            actor.abandon();
        }
    }
}

/// File name for a screenshot taken at `at`.
///
/// The timestamp in the name is UTC, not the host's local time.
pub fn capture_file_name(at: DateTime<Utc>) -> String {
    at.format("err-%Y-%m-%d-%H-%M-%S.png").to_string()
}

/// Run `executor` for `kind` inside a guarded actor session.
///
/// Executor failures come back as [`UpdaterError::ActionFailed`] or
/// [`UpdaterError::ActorFailure`], an exceeded budget as
/// [`UpdaterError::TimedOut`], and cancellation as
/// [`UpdaterError::Cancelled`]. The actor is released before returning in
/// all of these cases.
pub async fn guarded<F, E, C>(
    factory: &F,
    executor: &E,
    clock: &C,
    kind: ActionKind,
    settings: &GuardSettings,
    cancel: &CancellationToken,
) -> Result<()>
where
    F: ActorFactory,
    E: ActionExecutor<F::Actor>,
    C: Clock + ?Sized,
{
    let span = tracing::info_span!("guard", %kind);
    async move {
        let acquired = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpdaterError::Cancelled),
            acquired = ResourceGuard::acquire(factory) => acquired,
        };
        let mut guard = acquired.map_err(|source| UpdaterError::ActorFailure {
            kind,
            source,
            artifact: None,
        })?;

        let outcome = match guard.actor() {
            Some(actor) => {
                let call = tokio::time::timeout(
                    settings.action_budget,
                    executor.execute(kind, actor, settings.wait_timeout),
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Outcome::Cancelled,
                    res = call => match res {
                        Err(_) => Outcome::TimedOut,
                        Ok(Ok(())) => Outcome::Succeeded,
                        Ok(Err(ActionError::Failed(reason))) => Outcome::Failed(reason),
                        Ok(Err(ActionError::Actor(e))) => Outcome::ActorFault(e),
                    },
                }
            }
            None => Outcome::ActorFault(ActorError::new("actor released before use")),
        };

        // A timed-out or cancelled actor is likely wedged; go straight to release.
        let mut artifact = None;
        if let Some(actor) = guard.actor() {
            let limit = settings.wait_timeout;
            match &outcome {
                Outcome::TimedOut | Outcome::Cancelled => {}
                Outcome::ActorFault(e) => {
                    tracing::warn!(error = %e, "actor failure, saving diagnostics");
                    let save = save_diagnostics(actor, &settings.capture_dir, clock.now());
                    match tokio::time::timeout(limit, save).await {
                        Ok(saved) => artifact = saved,
                        Err(_) => tracing::warn!(?limit, "diagnostics timed out"),
                    }
                }
                _ => {
                    if tokio::time::timeout(limit, log_state(actor)).await.is_err() {
                        tracing::debug!(?limit, "state logging timed out");
                    }
                }
            }
        }
        guard.release().await;

        match outcome {
            Outcome::Succeeded => Ok(()),
            Outcome::Failed(reason) => Err(UpdaterError::ActionFailed { kind, reason }),
            Outcome::ActorFault(source) => Err(UpdaterError::ActorFailure {
                kind,
                source,
                artifact,
            }),
            Outcome::TimedOut => Err(UpdaterError::TimedOut {
                kind,
                budget: settings.action_budget,
            }),
            Outcome::Cancelled => Err(UpdaterError::Cancelled),
        }
    }
    .instrument(span)
    .await
}

async fn log_state<A: Actor>(actor: &mut A) {
    match actor.location().await {
        Ok(location) => tracing::debug!(%location, "current location"),
        Err(e) => tracing::debug!(error = %e, "location unavailable"),
    }
    match actor.session_state().await {
        Ok(state) => tracing::debug!("session state:\n{}", pretty(&state)),
        Err(e) => tracing::debug!(error = %e, "session state unavailable"),
    }
}

/// Log location and session state, then persist a screenshot.
///
/// Each call may fail on a broken actor; failures are logged and skipped.
async fn save_diagnostics<A: Actor>(
    actor: &mut A,
    dir: &Path,
    at: DateTime<Utc>,
) -> Option<PathBuf> {
    match actor.location().await {
        Ok(location) => tracing::warn!(%location, "current location"),
        Err(e) => tracing::warn!(error = %e, "location unavailable"),
    }
    match actor.session_state().await {
        Ok(state) => tracing::warn!("session state:\n{}", pretty(&state)),
        Err(e) => tracing::warn!(error = %e, "session state unavailable"),
    }
    let png = match actor.capture().await {
        Ok(png) => png,
        Err(e) => {
            tracing::warn!(error = %e, "screenshot unavailable");
            return None;
        }
    };
    let path = dir.join(capture_file_name(at));
    match io::atomic_write(&path, &png) {
        Ok(()) => {
            tracing::warn!(path = %path.display(), "screenshot saved");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "screenshot not saved");
            None
        }
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
