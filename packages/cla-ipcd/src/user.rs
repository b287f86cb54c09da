//! `com.redhat.lightspeed.user` interface (spec.md §4.7), grounded on
//! `original_source/dbus/interfaces/user.py`'s `UserInterface`: a single
//! method, auth-checked against the caller's own unix uid rather than an
//! internal user uuid (the one interface that uses `verify_unix`, not
//! `verify_internal`).

use cla_auth::{Authorizer, BusSenderResolver, SessionManager};
use zbus::message::Header;

use crate::error::IpcError;

fn sender_of<'h>(header: &'h Header<'h>) -> Result<&'h str, IpcError> {
    header
        .sender()
        .map(|n| n.as_str())
        .ok_or_else(|| IpcError::NotAuthorizedUser("request carries no bus sender".into()))
}

pub struct UserInterface {
    sessions: SessionManager,
    authorizer: Authorizer<BusSenderResolver>,
}

impl UserInterface {
    pub fn new(sessions: SessionManager, authorizer: Authorizer<BusSenderResolver>) -> Self {
        Self { sessions, authorizer }
    }
}

#[zbus::interface(name = "com.redhat.lightspeed.user")]
impl UserInterface {
    /// `GetUserId(effective_uid) -> uuid` (spec.md §4.7). The caller's real
    /// uid (resolved via the bus daemon) must equal `effective_uid` — this is
    /// `verify_unix`, since there is no internal user id yet to check against.
    #[zbus(name = "GetUserId")]
    async fn get_user_id(
        &self,
        effective_uid: i32,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<String, IpcError> {
        self.authorizer
            .verify_unix(sender_of(&header)?, effective_uid as u32)
            .await?;
        Ok(self.sessions.get_user_id(effective_uid as u32).await?)
    }

    #[zbus(name = "IsAllowed")]
    async fn is_allowed(&self) -> bool {
        true
    }
}
