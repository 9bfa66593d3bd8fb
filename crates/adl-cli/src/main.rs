use adl_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Log to the state file; fall back to stderr if it cannot be opened.
    if logging::init_logging().is_err() {
        let _ = logging::init_logging_stderr();
    }

    if let Err(err) = Cli::run_from_args().await {
        eprintln!("adl error: {:#}", err);
        std::process::exit(1);
    }
}
