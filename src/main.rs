//! The host never sees the cipher key in the clear: the trusted application
//! chooses it, and only a sealed form is written next to the ciphertext.

use clap::Parser;
use std::process::ExitCode;
use teeencrypt::{cli, commands};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to install logger: {e}");
    }
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose);

    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("teeencrypt: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
