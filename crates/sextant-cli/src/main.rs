//! `sextant` binary: copies a selection out of a snapshot and pastes it back.

use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info};

use sextant_cli::{Args, error_adapter};

/// Installs env_logger at `level`, falling back to `warn` for unknown names.
fn init_logging(level: &str) -> LevelFilter {
    let filter = match LevelFilter::from_str(level) {
        Ok(filter) => filter,
        Err(_) => {
            eprintln!("Invalid log level: {level}. Using 'warn' instead.");
            LevelFilter::Warn
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(filter)
        .init();
    filter
}

fn main() {
    miette::set_panic_hook();

    let args = Args::parse();
    let log_level = init_logging(&args.log_level);
    debug!(log_level:?, args:?; "Sextant starting");

    match sextant_cli::run(&args) {
        Ok(()) => info!(output = args.output; "Done"),
        Err(err) => {
            error!("{}", error_adapter::render(&err));
            process::exit(1);
        }
    }
}
