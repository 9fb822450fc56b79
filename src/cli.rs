//! Command-line surface: `--help`/`--version` only, no subcommands or
//! positional args. `spec.md` §6.
//!
//! Grounded in the teacher's own `#[derive(Parser)]` use in `main.rs`, with
//! the `Commands` subcommand enum dropped since this proxy's default (and
//! only) action is to run.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "tzig")]
#[command(version)]
#[command(about = "Terminal multiplexing proxy: overlay floating PTY shells on a live main shell")]
pub struct Cli {}
