//! rgather command-line entry point.

use std::process::ExitCode;

use clap::Parser;
use rgather::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

/// Initializes logging on stderr so stdout stays clean for results.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects `debug` and the
/// default is `warn`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "rgather=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

#[allow(clippy::print_stdout, clippy::print_stderr)]
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let report = anyhow::Error::new(e);
            eprintln!("Error: {report:#}");
            ExitCode::FAILURE
        }
    }
}
