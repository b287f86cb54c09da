//! Clap-derive CLI surface (spec.md §6), shaped after `crab_city/src/main.rs`'s
//! `Cli`/`Commands` enum and per-subcommand `Args` struct pattern.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cla", version, about = "Command line assistant powered by a remote LLM backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ask a question, or manage named chats.
    Chat(ChatArgs),
    /// Read or clear conversation history.
    History(HistoryArgs),
    /// Manage the recorded, shell-integration-aware terminal session.
    Shell(ShellArgs),
    /// Report on daemon/subscription status.
    Status(StatusArgs),
}

#[derive(Parser, Default)]
pub struct ChatArgs {
    /// The question to send to the LLM.
    pub query: Option<String>,

    /// File attachment to read and send alongside the query.
    #[arg(short = 'a', long)]
    pub attachment: Option<PathBuf>,

    /// Include the most recent recorded terminal output as context.
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,

    /// Include the Nth-previous recorded command's output (negative counts
    /// from the end; bare flag defaults to the last one).
    #[arg(long = "last-output", num_args = 0..=1, default_missing_value = "-1", allow_hyphen_values = true)]
    pub last_output: Option<i64>,

    /// List this user's chats instead of asking a question.
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Delete the named chat.
    #[arg(short = 'd', long = "delete")]
    pub delete: Option<String>,

    /// Delete every chat belonging to this user.
    #[arg(long = "delete-all")]
    pub delete_all: bool,

    /// Name of the chat to use or create (defaults to "default").
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,

    /// Description to use when creating a new chat.
    #[arg(long = "description")]
    pub description: Option<String>,
}

#[derive(Parser, Default)]
pub struct HistoryArgs {
    /// Show only the first (oldest) conversation.
    #[arg(short = 'f', long = "first")]
    pub first: bool,

    /// Show only the last (newest) conversation.
    #[arg(short = 'l', long = "last")]
    pub last: bool,

    /// Show only conversations whose question or response contains KEYWORD
    /// (case-sensitive substring match).
    #[arg(long = "filter", value_name = "KEYWORD")]
    pub filter: Option<String>,

    /// Show every conversation (the default when no other flag is given).
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Clear all history for this user.
    #[arg(short = 'c', long = "clear")]
    pub clear: bool,
}

#[derive(Parser, Default)]
pub struct ShellArgs {
    /// Install the bash shell-integration drop-in.
    #[arg(long = "enable-integration")]
    pub enable_integration: bool,

    /// Remove the bash shell-integration drop-in.
    #[arg(long = "disable-integration")]
    pub disable_integration: bool,

    /// Start a recorded interactive shell session.
    #[arg(long = "enable-capture")]
    pub enable_capture: bool,

    /// Enable the prompt-marker sanity check before recording.
    #[arg(long = "enable-prompt-check")]
    pub enable_prompt_check: bool,

    /// Disable the prompt-marker sanity check.
    #[arg(long = "disable-prompt-check")]
    pub disable_prompt_check: bool,
}

#[derive(Parser, Default)]
pub struct StatusArgs {
    /// Check everything (daemon reachability and subscription status).
    #[arg(long)]
    pub all: bool,

    /// Check only daemon reachability.
    #[arg(long)]
    pub daemon: bool,

    /// Check only subscription status.
    #[arg(long)]
    pub subscription: bool,
}
