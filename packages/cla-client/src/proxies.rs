//! D-Bus proxy definitions for the three daemon interfaces, generated with
//! `#[zbus::proxy]` from the method signatures in spec.md §4.5–§4.7 and
//! mirroring `cla_ipcd`'s server-side `#[zbus::interface]` impls
//! method-for-method so the wire contract can't drift between binaries.

use cla_ipcd::structures::{ChatList, HistoryList, Question, Response};

#[zbus::proxy(
    interface = "com.redhat.lightspeed.chat",
    default_service = "com.redhat.lightspeed.chat",
    default_path = "/com/redhat/lightspeed/chat"
)]
pub trait Chat {
    #[zbus(name = "GetAllChatFromUser")]
    fn get_all_chat_from_user(&self, user_id: &str) -> zbus::Result<ChatList>;

    #[zbus(name = "CreateChat")]
    fn create_chat(&self, user_id: &str, name: &str, description: &str) -> zbus::Result<String>;

    #[zbus(name = "GetChatId")]
    fn get_chat_id(&self, user_id: &str, name: &str) -> zbus::Result<String>;

    #[zbus(name = "GetLatestChatFromUser")]
    fn get_latest_chat_from_user(&self, user_id: &str) -> zbus::Result<String>;

    #[zbus(name = "DeleteChatForUser")]
    fn delete_chat_for_user(&self, user_id: &str, name: &str) -> zbus::Result<()>;

    #[zbus(name = "DeleteAllChatForUser")]
    fn delete_all_chat_for_user(&self, user_id: &str) -> zbus::Result<()>;

    #[zbus(name = "AskQuestion")]
    fn ask_question(&self, chat_id: &str, user_id: &str, message_input: Question) -> zbus::Result<Response>;

    #[zbus(name = "IsAllowed")]
    fn is_allowed(&self) -> zbus::Result<bool>;
}

#[zbus::proxy(
    interface = "com.redhat.lightspeed.history",
    default_service = "com.redhat.lightspeed.history",
    default_path = "/com/redhat/lightspeed/history"
)]
pub trait History {
    #[zbus(name = "GetHistory")]
    fn get_history(&self, user_id: &str) -> zbus::Result<HistoryList>;

    #[zbus(name = "GetFirstConversation")]
    fn get_first_conversation(&self, user_id: &str) -> zbus::Result<HistoryList>;

    #[zbus(name = "GetLastConversation")]
    fn get_last_conversation(&self, user_id: &str) -> zbus::Result<HistoryList>;

    #[zbus(name = "GetFilteredConversation")]
    fn get_filtered_conversation(&self, user_id: &str, filter_words: &str) -> zbus::Result<HistoryList>;

    #[zbus(name = "ClearHistory")]
    fn clear_history(&self, user_id: &str) -> zbus::Result<()>;

    #[zbus(name = "WriteHistory")]
    fn write_history(&self, chat_id: &str, user_id: &str, question: &str, response: &str) -> zbus::Result<()>;

    #[zbus(name = "IsAllowed")]
    fn is_allowed(&self) -> zbus::Result<bool>;
}

#[zbus::proxy(
    interface = "com.redhat.lightspeed.user",
    default_service = "com.redhat.lightspeed.user",
    default_path = "/com/redhat/lightspeed/user"
)]
pub trait User {
    #[zbus(name = "GetUserId")]
    fn get_user_id(&self, effective_uid: i32) -> zbus::Result<String>;

    #[zbus(name = "IsAllowed")]
    fn is_allowed(&self) -> zbus::Result<bool>;
}
