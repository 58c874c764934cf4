//! Scheduling and recovery core of `cv-updater`.
//!
//! ```text
//! Tracker ──last success──▶ EventStream ×N ──▶ MergeScheduler
//!    ▲                                               │
//!    └──record(kind, now)── ControlLoop ◀────────────┘
//!                               │
//!                          ResourceGuard ──▶ ActionExecutor(actor)
//! ```

pub mod actor;
pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod guard;
pub mod io;
pub mod paths;
pub mod schedule;
pub mod tracker;
pub mod types;

#[cfg(test)]
mod test_support;

pub use actor::{ActionExecutor, Actor, ActorFactory};
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use control::{ControlLoop, LoopSettings};
pub use error::{ActionError, ActorError, Result, UpdaterError};
pub use guard::{guarded, GuardSettings, ResourceGuard};
pub use schedule::{EventStream, MergeScheduler};
pub use tracker::Tracker;
pub use types::{ActionKind, IntervalSpec, ScheduleEntry};
