//! The byte-chunk state machine from spec.md §4.10, grounded directly in
//! `original_source/terminal/reader.py`'s `TerminalRecorder.read`/
//! `write_json_block`. Kept pure (no I/O) so it can be driven with synthetic
//! byte chunks in tests.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Compiled once at first use, matching `original_source/terminal/parser.py`'s
/// module-scope `ANSI_ESCAPE_SEQ` — the `regex` crate's own docs warn against
/// recompiling a pattern on every call.
static ANSI_ESCAPE_SEQ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("static ANSI regex is valid")
});

/// One recorded command/output pair, emitted to the terminal log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalBlock {
    pub command: String,
    pub output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InCommand,
    InOutput,
}

/// Accumulates bytes from a recorded PTY session into `TerminalBlock`s,
/// delimited by a marker byte sequence injected into the shell prompt.
pub struct BlockAccumulator {
    marker: Vec<u8>,
    state: State,
    current_command: Vec<u8>,
    current_output: Vec<u8>,
}

impl BlockAccumulator {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.as_bytes().to_vec(),
            // Starts InCommand, matching the Python reader's `_in_command = True`.
            state: State::InCommand,
            current_command: Vec::new(),
            current_output: Vec::new(),
        }
    }

    /// Feed one chunk of bytes read from the PTY. Returns a completed block
    /// whenever a marker closes out a prior output section.
    pub fn feed(&mut self, data: &[u8]) -> Option<TerminalBlock> {
        let mut flushed = None;
        // The chunk that triggers a transition still belongs to the state it
        // was read in (the newline ending the command is part of the command
        // line itself), so the append target is resolved before `self.state`
        // is updated for that case.
        let append_state;

        if contains_subsequence(data, &self.marker) {
            if self.state == State::InOutput {
                flushed = self.flush();
            }
            self.state = State::InCommand;
            append_state = self.state;
        } else if self.state == State::InCommand && data.contains(&b'\n') {
            append_state = self.state;
            self.state = State::InOutput;
        } else {
            append_state = self.state;
        }

        let cleaned = remove_subsequence(data, &self.marker);
        match append_state {
            State::InCommand => self.current_command.extend_from_slice(&cleaned),
            State::InOutput => self.current_output.extend_from_slice(&cleaned),
        }

        flushed
    }

    /// Flush whatever has been accumulated so far, even without a trailing
    /// marker (used when the recorded shell exits).
    pub fn flush(&mut self) -> Option<TerminalBlock> {
        if self.current_command.is_empty() {
            return None;
        }

        let command = strip_ansi(String::from_utf8_lossy(&self.current_command).trim());
        let output = strip_ansi(String::from_utf8_lossy(&self.current_output).trim());
        self.current_command.clear();
        self.current_output.clear();
        Some(TerminalBlock { command, output })
    }
}

fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn remove_subsequence(haystack: &[u8], needle: &[u8]) -> Vec<u8> {
    if needle.is_empty() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(needle) {
            i += needle.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}

/// ANSI escape sequence stripping, shared with the parser (spec.md §4.10:
/// "ANSI escape sequences are stripped from both fields before writing").
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE_SEQ.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_command_and_output_yields_one_block() {
        let mut acc = BlockAccumulator::new("%c");
        assert!(acc.feed(b"ls\n").is_none());
        assert!(acc.feed(b"a b c\n").is_none());
        let block = acc.feed(b"%c").unwrap();
        assert_eq!(block.command, "ls");
        assert_eq!(block.output, "a b c");
    }

    #[test]
    fn marker_while_in_command_just_resets_for_next_command() {
        let mut acc = BlockAccumulator::new("%c");
        // First prompt marker before any command has been typed yet.
        assert!(acc.feed(b"%c").is_none());
        assert!(acc.feed(b"echo hi\n").is_none());
        assert!(acc.feed(b"hi\n").is_none());
        let block = acc.feed(b"%c").unwrap();
        assert_eq!(block.command, "echo hi");
        assert_eq!(block.output, "hi");
    }

    #[test]
    fn ansi_sequences_are_stripped() {
        let mut acc = BlockAccumulator::new("%c");
        acc.feed(b"\x1b[32mls\x1b[0m\n");
        acc.feed(b"\x1b[1ma b c\x1b[0m\n");
        let block = acc.feed(b"%c").unwrap();
        assert_eq!(block.command, "ls");
        assert_eq!(block.output, "a b c");
    }

    #[test]
    fn empty_command_does_not_emit_a_block() {
        let mut acc = BlockAccumulator::new("%c");
        assert!(acc.feed(b"%c").is_none());
        assert!(acc.flush().is_none());
    }
}
