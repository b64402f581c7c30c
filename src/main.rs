mod args;
mod commands;
mod service;
mod shared;

use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;

use args::{Cli, DaemonSettings};
use commands::run_daemon;
use shared::detach::DetachError;

// Top-level entrypoint: parse CLI args, run the daemon, and map failures to exit statuses.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_daemon(DaemonSettings::from(&cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(report_failure(&mut io::stderr(), &err)),
    }
}

// Best-effort diagnostic: stderr may point at a terminal that has already hung up.
fn report_failure(out: &mut impl Write, err: &anyhow::Error) -> u8 {
    let _ = writeln!(out, "{err:#}");
    exit_code_for(err)
}

// Detachment failures carry a per-step status; anything else is a generic failure.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DetachError>() {
        Some(detach) => detach.step.exit_code(),
        None => 1,
    }
}
