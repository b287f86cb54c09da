//! Bus server bootstrap (spec.md §4.8, component C8): loads configuration,
//! opens the database, builds the HTTP submitter, publishes the three
//! interfaces named in §4.5–§4.7 on the system bus, and runs until a
//! termination signal.
//!
//! Grounded on `crab_city/src/main.rs::run_server`'s bootstrap shape (config
//! load -> tracing init -> DB open -> build long-lived clients -> serve ->
//! signal-driven graceful shutdown), re-pointed at
//! `zbus::connection::Builder::system()` instead of an axum `TcpListener`.

mod chat;
mod error;
mod history;
pub mod structures;
mod user;

pub use error::IpcError;

use std::time::Duration;

use cla_auth::{Authorizer, BusSenderResolver, SessionManager};
use cla_config::Config;
use cla_db::Database;
use cla_http::{Submitter, SubmitterConfig};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use chat::ChatInterface;
use history::HistoryInterface;
use user::UserInterface;

/// Well-known bus names and object paths (spec.md §6: "the client depends on
/// these literally").
const CHAT_NAME: &str = "com.redhat.lightspeed.chat";
const HISTORY_NAME: &str = "com.redhat.lightspeed.history";
const USER_NAME: &str = "com.redhat.lightspeed.user";

const CHAT_PATH: &str = "/com/redhat/lightspeed/chat";
const HISTORY_PATH: &str = "/com/redhat/lightspeed/history";
const USER_PATH: &str = "/com/redhat/lightspeed/user";

/// Runs the daemon to completion: connects to the system bus, registers the
/// three interfaces, and blocks until `SIGTERM`/`SIGINT`. All three name
/// registrations happen on one `zbus::Connection` (spec.md §4.8: "system-wide
/// connection, not per-user") and are transactional at the builder level --
/// a failure to register any one of them aborts startup before the bus
/// daemon ever has a chance to see a half-published service.
pub async fn run(config: Config) -> anyhow::Result<()> {
    cla_audit::log_active_policy(config.logging.audit_verbose);

    let db = Database::connect(
        &config.history.database.connection_url(),
        config.history.database.pool_size,
        Duration::from_millis(config.history.database.pool_timeout_ms),
    )
    .await?;

    let submitter = Submitter::new(&SubmitterConfig {
        endpoint: config.backend.endpoint.clone(),
        verify_ssl: config.backend.verify_ssl,
    })?;

    let connection = zbus::connection::Builder::system()?.build().await?;
    let resolver = BusSenderResolver::new(connection.clone());
    let sessions = SessionManager::new(db.clone());
    let authorizer = Authorizer::new(resolver, sessions.clone());

    let chat_iface = ChatInterface::new(
        db.clone(),
        submitter,
        config.backend.endpoint.clone(),
        authorizer.clone(),
        config.logging.audit_verbose,
    );
    let history_iface = HistoryInterface::new(db, authorizer.clone());
    let user_iface = UserInterface::new(sessions, authorizer);

    connection.object_server().at(CHAT_PATH, chat_iface).await?;
    connection.object_server().at(HISTORY_PATH, history_iface).await?;
    connection.object_server().at(USER_PATH, user_iface).await?;

    connection.request_name(CHAT_NAME).await?;
    connection.request_name(HISTORY_NAME).await?;
    connection.request_name(USER_NAME).await?;

    info!(
        chat = CHAT_NAME,
        history = HISTORY_NAME,
        user = USER_NAME,
        "published D-Bus interfaces, entering event loop"
    );

    wait_for_shutdown().await?;

    info!("shutdown signal received, disconnecting from the bus");
    Ok(())
}

/// Blocks until `SIGTERM` or `SIGINT`, matching spec.md §4.8's "run an event
/// loop until termination signal" / "on shutdown... disconnect cleanly so the
/// bus daemon reclaims names" (dropping `connection` on return does that).
async fn wait_for_shutdown() -> anyhow::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }

    Ok(())
}
