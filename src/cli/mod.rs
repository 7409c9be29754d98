//! CLI Module
//!
//! Command-line front end for inspecting wavetable behavior.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wavecache - inspect wavetable lookups and configurations
#[derive(Parser, Debug)]
#[command(name = "wavecache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a test-pattern table and look up one frequency
    #[command(name = "probe")]
    Probe {
        /// Row frequencies in Hz, ascending
        #[arg(short, long, value_delimiter = ',', default_value = "110,220,440")]
        freqs: Vec<f32>,

        /// Frequency to look up
        #[arg(short, long)]
        query: f32,

        /// Samples per slice (overrides the config file)
        #[arg(short, long)]
        buffer_size: Option<usize>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a JSON configuration file and print it normalized
    #[command(name = "check-config")]
    CheckConfig {
        /// Path to the configuration file
        path: PathBuf,
    },
}
