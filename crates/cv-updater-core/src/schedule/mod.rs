//! Due-time generation.
//!
//! Each [`EventStream`] yields an infinite, strictly increasing sequence of
//! jittered due times for one [`ActionKind`](crate::types::ActionKind).
//! [`MergeScheduler`] folds several streams into one time-ordered sequence
//! with a min-heap keyed by `(when, registration index)`.

pub mod merge;
pub mod stream;

pub use merge::MergeScheduler;
pub use stream::EventStream;
