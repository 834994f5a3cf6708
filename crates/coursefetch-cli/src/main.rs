use coursefetch_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; stderr if the state dir is unusable.
    if let Err(e) = logging::init_logging() {
        match logging::init_logging_stderr() {
            Ok(()) => tracing::warn!("file logging unavailable: {:#}", e),
            Err(e2) => eprintln!("coursefetch: logging disabled: {:#}; {:#}", e, e2),
        }
    }

    if let Err(err) = Cli::run_from_args().await {
        eprintln!("coursefetch error: {:#}", err);
        std::process::exit(1);
    }
}
