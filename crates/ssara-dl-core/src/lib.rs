pub mod config;
pub mod logging;

pub mod control;
pub mod listing;
pub mod process;
pub mod retry;
pub mod sampler;
pub mod supervisor;
pub mod template;
pub mod verify;
