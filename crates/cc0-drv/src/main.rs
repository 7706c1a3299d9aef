//! The `cc0` command-line compiler.
//!
//! `cc0 [options] input [-o file]` translates a c0 source file into a
//! textual assembly listing (`-s`) or a binary object file (`-c`).

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cc0_drv::{Emit, Session};

/// A compiler for the c0 language.
#[derive(Parser, Debug)]
#[command(name = "cc0")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Translates c0 source into VM assembly or object files", long_about = None)]
struct Cli {
    /// Translate the input into a textual assembly listing
    #[arg(short = 's')]
    text: bool,

    /// Translate the input into a binary object file
    #[arg(short = 'c')]
    binary: bool,

    /// Output destination
    #[arg(short = 'o', value_name = "FILE", default_value = "out")]
    output: PathBuf,

    /// Enable verbose logging
    #[arg(long, env = "CC0_VERBOSE")]
    verbose: bool,

    /// Input c0 source file
    input: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.verbose) {
        eprintln!("error: {:#}", err);
        process::exit(1);
    }

    // `-c` wins when both are given; with neither there is nothing to
    // do, so show the usage text.
    let emit = if cli.binary {
        Emit::Object
    } else if cli.text {
        Emit::Listing
    } else {
        let _ = Cli::command().print_help();
        process::exit(0);
    };

    let session = Session::new(cli.input, cli.output, emit);
    let result = session.run();

    for warning in session.warnings() {
        eprintln!("{}", warning);
    }

    if let Err(err) = result {
        eprintln!("Fatal: {}", err);
        process::exit(err.exit_code());
    }
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .context("failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_text_mode() {
        let cli = Cli::parse_from(["cc0", "-s", "prog.c0"]);
        assert!(cli.text);
        assert!(!cli.binary);
        assert_eq!(cli.input, PathBuf::from("prog.c0"));
        assert_eq!(cli.output, PathBuf::from("out"));
    }

    #[test]
    fn test_cli_parse_binary_mode_with_output() {
        let cli = Cli::parse_from(["cc0", "-c", "prog.c0", "-o", "prog.o"]);
        assert!(cli.binary);
        assert_eq!(cli.output, PathBuf::from("prog.o"));
    }

    #[test]
    fn test_cli_requires_an_input() {
        assert!(Cli::try_parse_from(["cc0", "-s"]).is_err());
    }
}
