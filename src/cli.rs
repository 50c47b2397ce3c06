//! CLI Argument Parsing
//!
//! Global flags (--json, --color, --verbose) are inherited by all subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

/// Kiln - incremental build core for web component compilers
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print compiler events as NDJSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Color output mode
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorWhen>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build once and exit
    Build {
        /// Project root (where kiln.toml lives)
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Collect type errors at the end of the build
        #[arg(long)]
        validate_types: bool,

        /// Production build (turns dev mode off)
        #[arg(long)]
        prod: bool,

        /// Write source maps next to bundled chunks
        #[arg(long)]
        sourcemap: bool,
    },

    /// Build, then rebuild on every change until Ctrl+C
    Watch {
        /// Project root (where kiln.toml lives)
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Collect type errors at the end of every build
        #[arg(long)]
        validate_types: bool,
    },
}

impl Commands {
    pub fn root(&self) -> &PathBuf {
        match self {
            Commands::Build { root, .. } | Commands::Watch { root, .. } => root,
        }
    }
}
