//! Spawns the real `tzig` binary directly (no PTY needed here) to verify the
//! process exit codes `spec.md` §6 specifies, since clap's own default
//! `Error::exit()` would give an unknown flag exit code 2, not the 1 the
//! spec requires — a class of bug a unit test against `ErrorKind` alone
//! can't catch (`src/cli.rs`'s tests only check clap's classification, not
//! what `main` does with it).

use std::process::Command;

fn tzig() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tzig"))
}

#[test]
fn unknown_flag_exits_one() {
    let status = tzig().arg("--bogus").status().expect("spawn tzig");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn help_exits_zero() {
    let status = tzig().arg("--help").status().expect("spawn tzig");
    assert_eq!(status.code(), Some(0));
}

#[test]
fn version_exits_zero() {
    let status = tzig().arg("--version").status().expect("spawn tzig");
    assert_eq!(status.code(), Some(0));
}
