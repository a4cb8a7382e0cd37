//! Command-line argument definitions for the Sextant CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select what to copy from the input snapshot,
//! where to paste it and how often, plus configuration and logging.

use clap::Parser;

/// Command-line arguments for the Sextant copy/paste tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input document snapshot (JSON)
    #[arg(help = "Path to the input snapshot")]
    pub input: String,

    /// Ids of the diagram elements to copy
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub select: Vec<String>,

    /// Drop point of the pasted elements, as `x,y`
    #[arg(long, default_value = "0,0", value_parser = parse_point)]
    pub at: (f32, f32),

    /// Element to paste into; the document root when omitted
    #[arg(short, long)]
    pub target: Option<String>,

    /// Number of times to paste the copied selection
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,

    /// Path to the output snapshot
    #[arg(short, long, default_value = "out.json")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn parse_point(value: &str) -> Result<(f32, f32), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{value}`"))?;
    let coordinate = |text: &str| {
        text.trim()
            .parse::<f32>()
            .map_err(|err| format!("invalid coordinate `{text}`: {err}"))
    };
    Ok((coordinate(x)?, coordinate(y)?))
}
