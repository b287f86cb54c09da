//! Spawns the user's shell under a PTY and records it, mirroring
//! `pty_manager::pty::PtyActor::spawn`'s blocking-reader-thread-plus-channel
//! shape but driven as a single foreground proxy loop instead of an actor
//! with a request/response handle, since nothing else in this process needs
//! to address the PTY concurrently (spec.md §4.10: one recorded shell per
//! `cla shell` invocation).

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;

use crossterm::terminal;
use portable_pty::{CommandBuilder, PtySize, native_pty_system};
use tracing::{info, warn};

use crate::blocks::{BlockAccumulator, TerminalBlock};
use crate::error::TerminalError;

/// Marker injected into the shell prompt so the recorder can tell commands
/// from output, matching `original_source/terminal/reader.py`'s `%c` marker
/// convention, overridable the same way the original respects
/// `CLA_USER_SHELL_PROMPT_COMMAND`.
const DEFAULT_MARKER: &str = "%c";

/// Default path for the recorded session log, under the XDG state dir.
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("command-line-assistant")
        .join("terminal.log")
}

/// Whether `cla shell --enable-prompt-check` left its flag file behind next
/// to the terminal log. When set, `record_session` verifies the marker
/// actually showed up in the shell's first output chunk and warns if not,
/// rather than silently recording a session whose prompt never injected it.
fn prompt_check_enabled() -> bool {
    default_log_path()
        .parent()
        .map(|dir| dir.join("prompt-check-enabled").exists())
        .unwrap_or(false)
}

/// Runs an interactive, recorded shell session: spawns `shell` under a PTY,
/// proxies the controlling terminal's stdin/stdout to it while the terminal
/// is in raw mode, and appends each completed command/output block to
/// `log_path` as one JSON line.
///
/// Returns once the recorded shell exits.
pub fn record_session(shell: &str, log_path: &Path) -> Result<(), TerminalError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    let pty_system = native_pty_system();
    let mut pair = pty_system
        .openpty(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| TerminalError::Spawn(e.to_string()))?;

    let mut cmd = CommandBuilder::new(shell);
    cmd.env("TERM", "xterm-256color");
    let prompt_marker_var = std::env::var("CLA_USER_SHELL_PROMPT_COMMAND")
        .unwrap_or_else(|_| DEFAULT_MARKER.to_string());
    // Echo the marker ahead of every prompt redraw, the same trick the
    // original recorder plays through `PROMPT_COMMAND`.
    cmd.env(
        "PROMPT_COMMAND",
        format!("printf '%s' '{prompt_marker_var}'"),
    );

    info!(shell, "spawning recorded shell session");
    let mut child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| TerminalError::Spawn(e.to_string()))?;
    drop(pair.slave);

    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| TerminalError::Read(e.to_string()))?;
    let mut writer = pair
        .master
        .take_writer()
        .map_err(|e| TerminalError::Write(e.to_string()))?;

    // Blocking PTY-output reader thread, forwarding raw bytes to the async
    // side through a plain channel (no tokio runtime needed here, since the
    // recorder itself is a synchronous foreground loop).
    let (output_tx, output_rx) = std_mpsc::channel::<Vec<u8>>();
    let reader_handle = std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if output_tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("error reading pty output: {e}");
                    break;
                }
            }
        }
    });

    let mut accumulator = BlockAccumulator::new(&prompt_marker_var);
    let check_prompt = prompt_check_enabled();

    terminal::enable_raw_mode().map_err(|e| TerminalError::Spawn(e.to_string()))?;
    let result = proxy_loop(
        &mut writer,
        &output_rx,
        &mut accumulator,
        &mut log_file,
        &mut child,
        check_prompt,
        &prompt_marker_var,
    );
    let _ = terminal::disable_raw_mode();

    let _ = reader_handle.join();

    if let Some(block) = accumulator.flush() {
        write_block(&mut log_file, &block)?;
    }

    result
}

fn proxy_loop(
    pty_writer: &mut Box<dyn Write + Send>,
    output_rx: &std_mpsc::Receiver<Vec<u8>>,
    accumulator: &mut BlockAccumulator,
    log_file: &mut std::fs::File,
    child: &mut Box<dyn portable_pty::Child + Send + Sync>,
    check_prompt: bool,
    marker: &str,
) -> Result<(), TerminalError> {
    use std::time::{Duration, Instant};

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut marker_seen = !check_prompt;
    let mut warned = false;

    loop {
        if let Ok(Some(_status)) = child.try_wait() {
            break;
        }

        if check_prompt && !marker_seen && !warned && Instant::now() > deadline {
            warn!(
                marker,
                "prompt marker was not seen within the sanity-check window; \
                 PROMPT_COMMAND may not be wired into this shell's prompt"
            );
            warned = true;
        }

        match output_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(chunk) => {
                std::io::stdout()
                    .write_all(&chunk)
                    .map_err(TerminalError::Io)?;
                std::io::stdout().flush().map_err(TerminalError::Io)?;

                if check_prompt && !marker_seen && chunk.windows(marker.len().max(1)).any(|w| w == marker.as_bytes()) {
                    marker_seen = true;
                }

                if let Some(block) = accumulator.feed(&chunk) {
                    write_block(log_file, &block)?;
                }
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                forward_stdin(pty_writer)?;
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Drains any input already waiting on stdin without blocking the proxy
/// loop's output polling.
fn forward_stdin(pty_writer: &mut Box<dyn Write + Send>) -> Result<(), TerminalError> {
    use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

    while event::poll(std::time::Duration::from_millis(0)).unwrap_or(false) {
        if let Ok(Event::Key(KeyEvent { code, kind, .. })) = event::read() {
            if kind != KeyEventKind::Press {
                continue;
            }
            let bytes: Vec<u8> = match code {
                KeyCode::Char(c) => c.to_string().into_bytes(),
                KeyCode::Enter => vec![b'\r'],
                KeyCode::Backspace => vec![0x7f],
                KeyCode::Tab => vec![b'\t'],
                KeyCode::Esc => vec![0x1b],
                _ => continue,
            };
            pty_writer
                .write_all(&bytes)
                .map_err(|e| TerminalError::Write(e.to_string()))?;
            pty_writer
                .flush()
                .map_err(|e| TerminalError::Write(e.to_string()))?;
        }
    }
    Ok(())
}

fn write_block(log_file: &mut std::fs::File, block: &TerminalBlock) -> Result<(), TerminalError> {
    let line = serde_json::to_string(block).map_err(|e| TerminalError::Write(e.to_string()))?;
    writeln!(log_file, "{line}").map_err(TerminalError::Io)?;
    log_file.flush().map_err(TerminalError::Io)
}
