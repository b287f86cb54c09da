//! Subcommand handlers dispatched from `main`. Each module owns its own
//! `DaemonSession` and error-to-stderr mapping is left to the caller.

pub mod chat;
pub mod history;
pub mod shell;
pub mod status;
