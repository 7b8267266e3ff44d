//! Retry and backoff policy.
//!
//! This module classifies how a downloader launch ended (hung, crashed with a
//! fatal exit code, exited) and decides whether to relaunch, so the primary
//! and verification passes share one bounded policy.

mod classify;
mod policy;

pub use classify::{classify, Termination, TerminationKind};
pub use policy::{Mode, RetryDecision, RetryPolicy};
