//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shutter Tester - three-channel focal-plane shutter timing bench
#[derive(Parser, Debug)]
#[command(
    name = "shutter-tester",
    author,
    version,
    about = "Three-channel shutter speed and curtain travel tester",
    long_about = "Measures per-slit exposure time and curtain travel time from three\n\
                  light-beam interrupters placed across the shutter gate.\n\n\
                  Without bench hardware attached, `simulate` drives the full\n\
                  measurement pipeline from a simulated focal-plane shutter."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SHUTTER_TESTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SHUTTER_TESTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the measurement pipeline against a simulated shutter
    Simulate(SimulateArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to bench configuration file (TOML or JSON); built-in defaults if omitted
    #[arg(short, long, env = "SHUTTER_TESTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Exposure time of each slit position (µs)
    #[arg(long, default_value = "8000", env = "SHUTTER_TESTER_EXPOSURE_US")]
    pub exposure_us: u32,

    /// Leading curtain travel time across the gate (µs)
    #[arg(long, default_value = "6000", env = "SHUTTER_TESTER_LEADING_US")]
    pub leading_us: u32,

    /// Trailing curtain travel time across the gate (µs)
    #[arg(long, default_value = "6000", env = "SHUTTER_TESTER_TRAILING_US")]
    pub trailing_us: u32,

    /// Curtain travel direction
    #[arg(long, value_enum, default_value = "forward")]
    pub direction: Direction,

    /// Number of shutter firings (0 = until Ctrl+C)
    #[arg(long, default_value = "5", env = "SHUTTER_TESTER_SHOTS")]
    pub shots: u32,

    /// Virtual time between firings (µs)
    #[arg(long, default_value = "500000")]
    pub shot_gap_us: u32,

    /// Real time between firings (ms)
    #[arg(long, default_value = "100")]
    pub pace_ms: u64,

    /// Initial value of the microsecond counter (use a value near 4294967295 to exercise wraparound)
    #[arg(long, default_value = "0")]
    pub start_us: u32,

    /// Publish every calculation immediately, overriding the configured policy
    #[arg(long)]
    pub immediate: bool,

    /// Capacity of the snapshot queue between measurement loop and dispatcher
    #[arg(long, default_value = "64", env = "SHUTTER_TESTER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SHUTTER_TESTER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bench.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bench.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Curtain travel direction across the three beams
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// S1 is uncovered first
    #[default]
    Forward,
    /// S3 is uncovered first
    Reverse,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
