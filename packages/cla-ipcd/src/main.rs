//! `cla-daemon`: the privileged, long-lived half of the command line
//! assistant. See `cla_ipcd::run` for the bootstrap sequence.

use anyhow::{Context, Result};

/// The audit channel is a separate JSON-lines stream from the operational
/// log (spec.md §4.9), so it gets its own file under the XDG state dir
/// rather than sharing the console writer.
fn open_audit_log() -> Result<std::fs::File> {
    let dir = dirs::state_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("command-line-assistant");
    std::fs::create_dir_all(&dir)?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("audit.log"))
        .context("failed to open audit log file")
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = cla_config::load_config(None).context("failed to load configuration")?;

    let audit_log = open_audit_log()?;
    cla_audit::init(&config.logging.level, audit_log)
        .context("failed to initialize the audit/tracing subscriber")?;

    cla_ipcd::run(config).await
}
