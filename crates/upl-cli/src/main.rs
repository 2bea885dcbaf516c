use clap::Parser;
use upl_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Log to the state dir; stderr if that is not writable.
    let directive = cli.log_directive();
    if let Err(e) = logging::init_logging(directive) {
        logging::init_logging_stderr(directive);
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }

    match cli.run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("upl error: {:#}", err);
            std::process::exit(1);
        }
    }
}
