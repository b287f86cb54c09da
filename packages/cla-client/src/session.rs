//! Connects to the system bus and resolves this process's internal user id,
//! bundling the three proxies every command needs.

use crate::error::ClientError;
use crate::proxies::{ChatProxy, HistoryProxy, UserProxy};

pub struct DaemonSession {
    pub chat: ChatProxy<'static>,
    pub history: HistoryProxy<'static>,
    pub user_id: String,
}

impl DaemonSession {
    pub async fn connect() -> Result<DaemonSession, ClientError> {
        let connection = zbus::Connection::system().await?;

        let user = UserProxy::new(&connection).await?;
        let chat = ChatProxy::new(&connection).await?;
        let history = HistoryProxy::new(&connection).await?;

        let effective_uid = nix::unistd::Uid::effective().as_raw();
        let user_id = user.get_user_id(effective_uid as i32).await?;

        Ok(DaemonSession { chat, history, user_id })
    }
}
