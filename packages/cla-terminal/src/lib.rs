//! Client-side shell recorder (spec.md §4.10, component C10).
//!
//! `cla shell` spawns the user's shell under a PTY and records every
//! command/output pair to a log file, so a later `cla chat --last-output` can
//! pull the most recent shell output into the question it submits. The
//! recording state machine and log format are grounded on
//! `original_source/terminal/{reader,parser}.py`; the PTY plumbing itself
//! (opening a pty, a dedicated blocking reader thread forwarding over a
//! channel) is grounded on `pty_manager::pty::PtyActor`.

mod blocks;
mod error;
mod parser;
mod recorder;

pub use blocks::{BlockAccumulator, TerminalBlock, strip_ansi};
pub use error::TerminalError;
pub use parser::{find_output_by_index, parse_log};
pub use recorder::{default_log_path, record_session};
