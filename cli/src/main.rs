//! cloudimg CLI - manage images on the cloudimg service

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cloudimg_cli::cli::{Cli, log_directive};
use cloudimg_cli::domain::error::error_code;
use cloudimg_cli::output::json::format_error;

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env("CLOUDIMG_LOG")
        .unwrap_or_else(|_| EnvFilter::new(log_directive(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let json = cli.json;

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            match format_error(&message, error_code(&e)) {
                Ok(obj) if json => println!("{obj}"),
                _ => eprintln!("Error: {message}"),
            }
            ExitCode::FAILURE
        }
    }
}
