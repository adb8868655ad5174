//! Command-line argument definitions for the Flowsync CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. A subcommand selects the operation on a `.bpmn` file; the
//! global flags select the configuration file and logging verbosity.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Flowsync diagram tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Operations on a BPMN document
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resize text annotations and re-route associations, then save
    Realign {
        /// Path to the input BPMN file
        input: String,

        /// Write the result here instead of overwriting the input
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Render the diagram to an SVG image
    Export {
        /// Path to the input BPMN file
        input: String,

        /// Path to the output SVG file [default: <input base name>.svg]
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Load the diagram and report problems
    Check {
        /// Path to the input BPMN file
        input: String,
    },
}

impl Command {
    /// The BPMN file the command operates on.
    pub fn input(&self) -> &str {
        match self {
            Self::Realign { input, .. } | Self::Export { input, .. } | Self::Check { input } => {
                input
            }
        }
    }
}
