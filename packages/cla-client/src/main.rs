//! `cla`: the client half of the command line assistant (spec.md §6).
//!
//! Grounded on `original_source/command_line_assistant/utils/cli.py`'s
//! subcommand-dispatch shape and on `tty_wrapper::main`'s bootstrap
//! (`clap::Parser` + `tracing_subscriber::fmt` + a single `#[tokio::main]`
//! entry point), adapted to dispatch into per-subcommand modules instead of
//! serving HTTP.

mod cli;
mod commands;
mod error;
mod input;
mod proxies;
mod session;

use std::io::IsTerminal;

use clap::Parser;

use cli::{Cli, Command};

/// Subcommand literals `normalize_args` must not intercept, so
/// `cla chat`/`cla --help` etc. keep working unmolested.
const KNOWN_FIRST_ARGS: &[&str] = &[
    "chat", "history", "shell", "status", "help", "-h", "--help", "-V", "--version",
];

/// Spec.md §6: a bare prompt on argv, or piped stdin with nothing else on the
/// command line, both default to `chat` without the user typing the word.
fn normalize_args() -> Vec<String> {
    let args: Vec<String> = std::env::args().collect();

    if let Some(first) = args.get(1) {
        if KNOWN_FIRST_ARGS.contains(&first.as_str()) {
            return args;
        }
        let mut normalized = vec![args[0].clone(), "chat".to_string()];
        normalized.extend(args[1..].iter().cloned());
        return normalized;
    }

    if !std::io::stdin().is_terminal() {
        return vec![args[0].clone(), "chat".to_string()];
    }

    args
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "cla=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_from(normalize_args());

    let Some(command) = cli.command else {
        eprintln!("No input provided. Please provide input via file, stdin, or direct query.");
        return std::process::ExitCode::FAILURE;
    };

    let result = match command {
        Command::Chat(args) => commands::chat::run(args).await,
        Command::History(args) => commands::history::run(args).await,
        Command::Shell(args) => commands::shell::run(args).await,
        Command::Status(args) => commands::status::run(args).await,
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            std::process::ExitCode::FAILURE
        }
    }
}
