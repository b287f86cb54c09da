//! `com.redhat.lightspeed.history` interface (spec.md §4.6), grounded on
//! `original_source/dbus/interfaces/history.py`'s `HistoryInterface`: empty
//! history raises `HistoryNotAvailable`, `WriteHistory` is the one place an
//! interaction is actually persisted.

use cla_auth::{Authorizer, BusSenderResolver};
use cla_db::Database;
use tracing::info;
use zbus::message::Header;

use crate::error::IpcError;
use crate::structures::{HistoryEntry, HistoryList};

fn sender_of<'h>(header: &'h Header<'h>) -> Result<&'h str, IpcError> {
    header
        .sender()
        .map(|n| n.as_str())
        .ok_or_else(|| IpcError::NotAuthorizedUser("request carries no bus sender".into()))
}

pub struct HistoryInterface {
    db: Database,
    authorizer: Authorizer<BusSenderResolver>,
}

impl HistoryInterface {
    pub fn new(db: Database, authorizer: Authorizer<BusSenderResolver>) -> Self {
        Self { db, authorizer }
    }

    async fn require_nonempty(&self, user_id: &str) -> Result<Vec<cla_db::Interaction>, IpcError> {
        let interactions = self.db.interactions().list_for_user(user_id).await?;
        if interactions.is_empty() {
            return Err(IpcError::HistoryNotAvailable(
                "Unfortunately, no history was found.".into(),
            ));
        }
        Ok(interactions)
    }
}

#[zbus::interface(name = "com.redhat.lightspeed.history")]
impl HistoryInterface {
    #[zbus(name = "GetHistory")]
    async fn get_history(
        &self,
        user_id: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<HistoryList, IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        let interactions = self.require_nonempty(&user_id).await?;
        Ok(HistoryList {
            histories: interactions.into_iter().map(HistoryEntry::from).collect(),
        })
    }

    #[zbus(name = "GetFirstConversation")]
    async fn get_first_conversation(
        &self,
        user_id: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<HistoryList, IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        let interactions = self.require_nonempty(&user_id).await?;
        Ok(HistoryList {
            histories: interactions.into_iter().take(1).map(HistoryEntry::from).collect(),
        })
    }

    #[zbus(name = "GetLastConversation")]
    async fn get_last_conversation(
        &self,
        user_id: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<HistoryList, IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        let mut interactions = self.require_nonempty(&user_id).await?;
        let last = interactions.pop().expect("require_nonempty guarantees at least one entry");
        Ok(HistoryList {
            histories: vec![HistoryEntry::from(last)],
        })
    }

    /// Case-sensitive substring match (DESIGN.md's pinned Open Question #4).
    /// `HistoryNotAvailable` is raised only when the user has no history at
    /// all, not when the filter itself matches nothing — an empty-but-valid
    /// `HistoryList` is a legitimate filtered result.
    #[zbus(name = "GetFilteredConversation")]
    async fn get_filtered_conversation(
        &self,
        user_id: String,
        filter_words: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<HistoryList, IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        self.require_nonempty(&user_id).await?;
        let filtered = self.db.interactions().filter_for_user(&user_id, &filter_words).await?;
        Ok(HistoryList {
            histories: filtered.into_iter().map(HistoryEntry::from).collect(),
        })
    }

    #[zbus(name = "ClearHistory")]
    async fn clear_history(
        &self,
        user_id: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<(), IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        self.db.interactions().clear_for_user(&user_id).await?;
        info!(audit = true, user_id = %user_id, "cleared all history entries for user");
        Ok(())
    }

    #[zbus(name = "WriteHistory")]
    async fn write_history(
        &self,
        chat_id: String,
        user_id: String,
        question: String,
        response: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<(), IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        self.db.interactions().insert(&chat_id, &question, &response).await?;
        info!(audit = true, user_id = %user_id, chat_id = %chat_id, "wrote a new entry to the user history");
        Ok(())
    }

    #[zbus(name = "IsAllowed")]
    async fn is_allowed(&self) -> bool {
        true
    }
}
