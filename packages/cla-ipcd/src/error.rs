//! Named D-Bus errors carried on the wire (spec.md §6), grounded on
//! `original_source/dbus/exceptions.py`'s `@dbus_error(...)`-decorated
//! exception hierarchy — one named error per namespace, everything else
//! wrapped as a generic failure.

use zbus::DBusError;

/// Mirrors the original's per-namespace `@dbus_error` decorations, collapsed
/// onto one enum since zbus attaches the wire name per-variant instead of
/// per-class.
#[derive(Debug, DBusError)]
#[zbus(prefix = "com.redhat.lightspeed")]
pub enum IpcError {
    NotAuthorizedUser(String),
    RequestFailedError(String),
    ChatNotFoundError(String),
    HistoryNotAvailable(String),
    CorruptedHistoryError(String),
    MissingHistoryFileError(String),
    #[zbus(error)]
    ZBus(zbus::Error),
}

impl From<cla_db::DbError> for IpcError {
    fn from(err: cla_db::DbError) -> Self {
        match err {
            cla_db::DbError::ChatNotFound | cla_db::DbError::ChatAlreadyExists(_) => {
                IpcError::ChatNotFoundError(err.to_string())
            }
            other => IpcError::RequestFailedError(other.to_string()),
        }
    }
}

impl From<cla_http::HttpError> for IpcError {
    fn from(err: cla_http::HttpError) -> Self {
        IpcError::RequestFailedError(err.to_string())
    }
}

impl From<cla_auth::AuthError> for IpcError {
    fn from(err: cla_auth::AuthError) -> Self {
        match err {
            cla_auth::AuthError::PermissionDenied => {
                IpcError::NotAuthorizedUser("the caller is not authorized for this request".into())
            }
            other => IpcError::NotAuthorizedUser(other.to_string()),
        }
    }
}
