use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand, Debug)]
enum Service {
    /// Public API with the click buffer
    Api,
    /// Data access layer in front of Redis
    Dal,
}

#[tokio::main]
async fn main() -> ExitCode {
    tally::telemetry::init_tracing();

    let args = Args::parse();

    let result = match args.service {
        Service::Api => server::start_server().await,
        Service::Dal => dal::start_dal().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
