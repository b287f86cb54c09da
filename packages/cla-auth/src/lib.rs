//! Session/user-id service (spec.md §4.3) and the D-Bus caller authorization
//! mixin (spec.md §4.4).
//!
//! Grounded on `original_source/dbus/interfaces/authorization.py`
//! (`_verify_unix_user_authorization`, `_verify_internal_user_authorization`,
//! `_get_sender_unix_user_id` via `org.freedesktop.DBus.GetConnectionUnixUser`)
//! for exact semantics, and on `crab_city::auth`'s "verify, then
//! delegate" wrapper-function shape (its `auth_middleware` is axum-specific,
//! but the pattern of a function wrapping a handler rather than a mixin
//! discovered by reflection carries over, per spec.md §9).

mod error;
pub use error::AuthError;

use cla_db::Database;
use tracing::warn;

/// C3's backing service: maps OS uid -> stable internal user UUID.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
}

impl SessionManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Idempotent; inserts on miss (spec.md §4.3).
    pub async fn get_user_id(&self, os_uid: u32) -> Result<String, AuthError> {
        Ok(self.db.users().get_or_create(os_uid).await?)
    }
}

/// Resolves a D-Bus sender's bus-assigned unique name to its real unix uid.
/// Kept as a trait so `Authorizer` can be exercised in tests without a live
/// bus connection.
pub trait SenderUidResolver: Send + Sync {
    fn resolve_unix_uid(
        &self,
        sender: &str,
    ) -> impl std::future::Future<Output = Result<u32, AuthError>> + Send;
}

/// Production resolver: asks the bus daemon itself via
/// `org.freedesktop.DBus.GetConnectionUnixUser`, exactly as
/// `_get_sender_unix_user_id` does in the source.
#[derive(Clone)]
pub struct BusSenderResolver {
    connection: zbus::Connection,
}

impl BusSenderResolver {
    pub fn new(connection: zbus::Connection) -> Self {
        Self { connection }
    }
}

impl SenderUidResolver for BusSenderResolver {
    async fn resolve_unix_uid(&self, sender: &str) -> Result<u32, AuthError> {
        let proxy = zbus::fdo::DBusProxy::new(&self.connection)
            .await
            .map_err(|e| AuthError::SenderResolution(e.to_string()))?;

        proxy
            .get_connection_unix_user(
                sender
                    .try_into()
                    .map_err(|e: zbus::names::Error| AuthError::SenderResolution(e.to_string()))?,
            )
            .await
            .map_err(|e| AuthError::SenderResolution(e.to_string()))
    }
}

/// C4's authorization mixin, generic over how the sender's unix uid is
/// resolved. Failure policy is closed: any error resolving the sender is
/// treated as a denial by the caller (every fallible step here returns
/// `Err`, never a default-allow).
#[derive(Clone)]
pub struct Authorizer<R: SenderUidResolver> {
    resolver: R,
    sessions: SessionManager,
}

impl<R: SenderUidResolver> Authorizer<R> {
    pub fn new(resolver: R, sessions: SessionManager) -> Self {
        Self { resolver, sessions }
    }

    /// `verify_unix(sender, requested_uid)` — spec.md §4.4.
    pub async fn verify_unix(&self, sender: &str, requested_uid: u32) -> Result<(), AuthError> {
        let actual_uid = self.resolver.resolve_unix_uid(sender).await?;
        if actual_uid != requested_uid {
            warn!(
                audit = true,
                claimed_uid = requested_uid,
                actual_uid,
                "unix user authorization denied"
            );
            return Err(AuthError::PermissionDenied);
        }
        Ok(())
    }

    /// `verify_internal(sender, requested_user_uuid)` — spec.md §4.4.
    pub async fn verify_internal(
        &self,
        sender: &str,
        requested_user_uuid: &str,
    ) -> Result<(), AuthError> {
        let actual_uid = self.resolver.resolve_unix_uid(sender).await?;
        let actual_uuid = self.sessions.get_user_id(actual_uid).await?;
        if actual_uuid != requested_user_uuid {
            warn!(
                audit = true,
                claimed_user_id = requested_user_uuid,
                actual_user_id = %actual_uuid,
                "internal user authorization denied"
            );
            return Err(AuthError::PermissionDenied);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedUidResolver(u32);

    impl SenderUidResolver for FixedUidResolver {
        async fn resolve_unix_uid(&self, _sender: &str) -> Result<u32, AuthError> {
            Ok(self.0)
        }
    }

    struct FailingResolver;

    impl SenderUidResolver for FailingResolver {
        async fn resolve_unix_uid(&self, _sender: &str) -> Result<u32, AuthError> {
            Err(AuthError::SenderResolution("bus unreachable".to_string()))
        }
    }

    async fn sessions() -> SessionManager {
        SessionManager::new(Database::connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn get_user_id_is_idempotent_across_calls() {
        let sessions = sessions().await;
        let first = sessions.get_user_id(1000).await.unwrap();
        let second = sessions.get_user_id(1000).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn verify_unix_allows_matching_uid() {
        let authorizer = Authorizer::new(FixedUidResolver(1000), sessions().await);
        assert!(authorizer.verify_unix(":1.1", 1000).await.is_ok());
    }

    #[tokio::test]
    async fn verify_unix_denies_mismatched_uid() {
        let authorizer = Authorizer::new(FixedUidResolver(1000), sessions().await);
        let err = authorizer.verify_unix(":1.1", 1001).await.unwrap_err();
        assert!(matches!(err, AuthError::PermissionDenied));
    }

    #[tokio::test]
    async fn verify_internal_allows_matching_user() {
        let sessions = sessions().await;
        let user_id = sessions.get_user_id(1000).await.unwrap();
        let authorizer = Authorizer::new(FixedUidResolver(1000), sessions);
        assert!(authorizer.verify_internal(":1.1", &user_id).await.is_ok());
    }

    #[tokio::test]
    async fn verify_internal_denies_spoofed_user_id() {
        let sessions = sessions().await;
        let victim_id = sessions.get_user_id(1001).await.unwrap();
        // Sender is actually uid 1000, but claims to be uid 1001's user.
        let authorizer = Authorizer::new(FixedUidResolver(1000), sessions);
        let err = authorizer
            .verify_internal(":1.1", &victim_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PermissionDenied));
    }

    #[tokio::test]
    async fn resolver_failure_denies_closed() {
        let authorizer = Authorizer::new(FailingResolver, sessions().await);
        let err = authorizer.verify_unix(":1.1", 1000).await.unwrap_err();
        assert!(matches!(err, AuthError::SenderResolution(_)));
    }
}
