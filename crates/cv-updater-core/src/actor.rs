//! Seams between the scheduler and whatever performs the actions.
//!
//! An [`ActorFactory`] hands out one [`Actor`] session per dispatch, an
//! [`ActionExecutor`] drives that session through the steps for one
//! [`ActionKind`], and the [resource guard](crate::guard) sits between them.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ActionError, ActorError};
use crate::types::ActionKind;

/// A stateful external session, such as a browser.
#[async_trait]
pub trait Actor: Send {
    /// Where the actor currently is (for a browser, the current URL).
    async fn location(&mut self) -> Result<String, ActorError>;

    /// Opaque session state worth logging on failure (for a browser, cookies).
    async fn session_state(&mut self) -> Result<serde_json::Value, ActorError>;

    /// PNG snapshot of what the actor currently shows.
    async fn capture(&mut self) -> Result<Vec<u8>, ActorError>;

    /// Tear the session down. Consumes the actor so it runs at most once.
    async fn release(self) -> Result<(), ActorError>;

    /// Synchronous best-effort teardown for when `release` never ran.
    fn abandon(&mut self) {}
}

#[async_trait]
pub trait ActorFactory: Send + Sync {
    type Actor: Actor;

    async fn acquire(&self) -> Result<Self::Actor, ActorError>;
}

/// Performs the steps bound to an [`ActionKind`] on a borrowed actor.
///
/// `wait_timeout` bounds each individual wait inside the steps; the guard
/// bounds the call as a whole.
#[async_trait]
pub trait ActionExecutor<A: Actor>: Send + Sync {
    async fn execute(
        &self,
        kind: ActionKind,
        actor: &mut A,
        wait_timeout: Duration,
    ) -> Result<(), ActionError>;
}
