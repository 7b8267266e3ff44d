//! Download supervisor.
//!
//! Drives the external downloader through the primary pass (hang detection,
//! bounded relaunch on stalls and fatal exit codes), then the verification
//! pass (expected listing vs. working directory, serial relaunch of the
//! missing scenes). Every run ends in a typed [`Outcome`].

mod guard;
mod job;
mod outcome;
mod run;

pub use job::DownloadJob;
pub use outcome::{Outcome, RunReport};
pub use run::{Supervisor, SupervisorSettings};
