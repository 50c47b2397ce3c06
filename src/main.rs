//! Kiln CLI - incremental build core for web component compilers
//!
//! Usage: kiln <COMMAND>
//!
//! Commands:
//!   build   Build once and exit
//!   watch   Build, then rebuild on every change

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

use kiln::config::LogLevel;
use kiln::presentation::{create_compiler, ConfigOverrides};

use cli::{Cli, Commands};
use commands::UiContext;

/// Environment variable holding a tracing filter directive
const LOG_ENV_VAR: &str = "KILN_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();
    let ui = UiContext::new(cli.json, cli.verbose, cli.color);

    let overrides = match &cli.command {
        Commands::Build {
            validate_types,
            prod,
            sourcemap,
            ..
        } => ConfigOverrides {
            validate_types: validate_types.then_some(true),
            dev_mode: prod.then_some(false),
            sourcemap: sourcemap.then_some(true),
        },
        Commands::Watch { validate_types, .. } => ConfigOverrides {
            validate_types: validate_types.then_some(true),
            ..Default::default()
        },
    };

    let (compiler, warnings) = create_compiler(cli.command.root(), &overrides)?;
    init_tracing(compiler.config().logging.level, cli.verbose);
    ui.print_config_warnings(&warnings);

    let code = match cli.command {
        Commands::Build { .. } => commands::build::cmd_build(&compiler, &ui)?,
        Commands::Watch { .. } => commands::watch::cmd_watch(&compiler, &ui)?,
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Logs go to stderr; `KILN_LOG` wins over the config level and `-v`
fn init_tracing(level: LogLevel, verbose: u8) {
    let default = match verbose {
        0 => level.as_filter(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(verbose > 0)
        .init();
}
