//! CLI command handlers. Each command is in its own file.

mod download;
mod list;
mod verify;

pub use download::run_download;
pub use list::run_list;
pub use verify::run_verify;
