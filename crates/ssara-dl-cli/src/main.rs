mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Parse CLI, set up config and logging, and dispatch.
    match CliCommand::run_from_args().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("ssara-dl error: {:#}", err);
            std::process::exit(1);
        }
    }
}
