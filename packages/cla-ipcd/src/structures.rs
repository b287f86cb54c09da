//! D-Bus value-object structures exchanged with the three interfaces,
//! grounded on `original_source/dbus/structures/chat.py`'s `DBusData`
//! dataclasses (`ChatEntry`, `ChatList`, `Question`, `StdinInput`,
//! `AttachmentInput`, `Response`) and the analogous history structures it
//! implies. Each becomes a D-Bus STRUCT (tuple) via `zbus::zvariant::Type`.

use serde::{Deserialize, Serialize};
use zbus::zvariant::Type;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Type)]
pub struct ChatEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: String,
}

impl From<cla_db::Chat> for ChatEntry {
    fn from(chat: cla_db::Chat) -> Self {
        Self {
            id: chat.id,
            name: chat.name,
            description: chat.description,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            deleted_at: chat.deleted_at.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Type)]
pub struct ChatList {
    pub chats: Vec<ChatEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Type)]
pub struct StdinInput {
    pub stdin: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Type)]
pub struct AttachmentInput {
    pub contents: String,
    pub mimetype: String,
}

/// The question payload a client submits to `AskQuestion`, matching the
/// original's `Question` structure: a message plus the optional stdin and
/// attachment context the client composed per spec.md §4.11.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Type)]
pub struct Question {
    pub message: String,
    pub stdin: StdinInput,
    pub attachment: AttachmentInput,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Type)]
pub struct Response {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Type)]
pub struct HistoryEntry {
    pub question: String,
    pub response: String,
    pub created_at: String,
}

impl From<cla_db::Interaction> for HistoryEntry {
    fn from(interaction: cla_db::Interaction) -> Self {
        Self {
            question: interaction.question,
            response: interaction.response,
            created_at: interaction.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Type)]
pub struct HistoryList {
    pub histories: Vec<HistoryEntry>,
}
