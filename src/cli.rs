//! Command-line interface for circlecast
//!
//! Supports both the viewer (default) and headless scenario runs.

use clap::Parser;
use std::path::PathBuf;

/// Spell-casting engine sandbox
#[derive(Parser, Debug)]
#[command(name = "circlecast")]
#[command(about = "Spell-casting engine sandbox and scenario runner")]
#[command(version)]
pub struct Args {
    /// Run in headless mode with the specified JSON scenario file
    #[arg(long, value_name = "SCENARIO_FILE")]
    pub headless: Option<PathBuf>,

    /// Output path for the scenario result (headless mode only)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Random seed, overriding the scenario's own (headless mode only)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Spell catalog to load instead of the built-in one
    #[arg(long, value_name = "CATALOG_FILE")]
    pub catalog: Option<PathBuf>,
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_flags_parse() {
        let args = Args::parse_from(["circlecast", "--headless", "demo.json", "--seed", "7"]);
        assert_eq!(args.headless, Some(PathBuf::from("demo.json")));
        assert_eq!(args.seed, Some(7));
        assert!(args.output.is_none());
    }
}
