//! `com.redhat.lightspeed.chat` interface (spec.md §4.5), grounded on
//! `original_source/dbus/interfaces/chat.py`'s `ChatInterface`: idempotent
//! `CreateChat`, name-keyed lookups, cascading delete, and `AskQuestion`'s
//! submit-without-writing-history algorithm.

use cla_auth::{Authorizer, BusSenderResolver};
use cla_db::Database;
use cla_http::{AttachmentInput as HttpAttachment, Context as HttpContext, Payload, StdinInput as HttpStdin, Submitter};
use tracing::info;
use zbus::message::Header;

use crate::error::IpcError;
use crate::structures::{ChatEntry, ChatList, Question, Response};

fn sender_of<'h>(header: &'h Header<'h>) -> Result<&'h str, IpcError> {
    header
        .sender()
        .map(|n| n.as_str())
        .ok_or_else(|| IpcError::NotAuthorizedUser("request carries no bus sender".into()))
}

pub struct ChatInterface {
    db: Database,
    http: Submitter,
    backend_endpoint: String,
    authorizer: Authorizer<BusSenderResolver>,
    audit_verbose: bool,
}

impl ChatInterface {
    pub fn new(
        db: Database,
        http: Submitter,
        backend_endpoint: String,
        authorizer: Authorizer<BusSenderResolver>,
        audit_verbose: bool,
    ) -> Self {
        Self {
            db,
            http,
            backend_endpoint,
            authorizer,
            audit_verbose,
        }
    }
}

#[zbus::interface(name = "com.redhat.lightspeed.chat")]
impl ChatInterface {
    #[zbus(name = "GetAllChatFromUser")]
    async fn get_all_chat_from_user(
        &self,
        user_id: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<ChatList, IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        let chats = self.db.chats().list_live(&user_id).await?;
        Ok(ChatList {
            chats: chats.into_iter().map(ChatEntry::from).collect(),
        })
    }

    /// Idempotent: a second `CreateChat` for the same (user, name) pair
    /// returns the existing chat's id rather than erroring, matching the
    /// original's "avoid duplicate chats" comment.
    #[zbus(name = "CreateChat")]
    async fn create_chat(
        &self,
        user_id: String,
        name: String,
        description: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<String, IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        if let Some(existing) = self.db.chats().find_by_name(&user_id, &name).await? {
            return Ok(existing.id);
        }
        match self.db.chats().insert(&user_id, &name, &description).await {
            Ok(id) => Ok(id),
            // Lost the create race to a concurrent caller between our check
            // above and the insert; read back the winner's id instead of
            // surfacing the conflict (spec.md §5: "read-after-conflict").
            Err(cla_db::DbError::ChatAlreadyExists(_)) => self
                .db
                .chats()
                .find_by_name(&user_id, &name)
                .await?
                .map(|c| c.id)
                .ok_or_else(|| {
                    IpcError::ChatNotFoundError(format!(
                        "No chat found with name '{name}'. Please, make sure that this chat exists first."
                    ))
                }),
            Err(e) => Err(e.into()),
        }
    }

    #[zbus(name = "GetChatId")]
    async fn get_chat_id(
        &self,
        user_id: String,
        name: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<String, IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        self.db
            .chats()
            .find_by_name(&user_id, &name)
            .await?
            .map(|c| c.id)
            .ok_or_else(|| {
                IpcError::ChatNotFoundError(format!(
                    "No chat found with name '{name}'. Please, make sure that this chat exists first."
                ))
            })
    }

    #[zbus(name = "GetLatestChatFromUser")]
    async fn get_latest_chat_from_user(
        &self,
        user_id: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<String, IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        self.db
            .chats()
            .latest(&user_id)
            .await?
            .map(|c| c.id)
            .ok_or_else(|| IpcError::ChatNotFoundError("No chat found to delete.".into()))
    }

    #[zbus(name = "DeleteChatForUser")]
    async fn delete_chat_for_user(
        &self,
        user_id: String,
        name: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<(), IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        let chat = self.db.chats().find_by_name(&user_id, &name).await?.ok_or_else(|| {
            IpcError::ChatNotFoundError(format!(
                "Couldn't find chat with name '{name}'. Check the name requested and try again."
            ))
        })?;
        self.db.chats().soft_delete(&chat.id).await?;
        Ok(())
    }

    #[zbus(name = "DeleteAllChatForUser")]
    async fn delete_all_chat_for_user(
        &self,
        user_id: String,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<(), IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;
        let chats = self.db.chats().list_live(&user_id).await?;
        if chats.is_empty() {
            return Err(IpcError::ChatNotFoundError("No chat found to delete.".into()));
        }
        for chat in chats {
            self.db.chats().soft_delete(&chat.id).await?;
        }
        Ok(())
    }

    /// Submits the question to the backend and returns its answer. Per
    /// spec.md §4.5 and the original's `AskQuestion`, this deliberately does
    /// NOT write the interaction to history — `WriteHistory` on the history
    /// interface is a separate, explicit call the client makes afterward.
    #[zbus(name = "AskQuestion")]
    async fn ask_question(
        &self,
        chat_id: String,
        user_id: String,
        message_input: Question,
        #[zbus(header)] header: Header<'_>,
    ) -> Result<Response, IpcError> {
        self.authorizer
            .verify_internal(sender_of(&header)?, &user_id)
            .await?;

        self.db
            .chats()
            .find_by_id(&chat_id)
            .await?
            .filter(|chat| chat.user_id == user_id)
            .ok_or_else(|| IpcError::ChatNotFoundError(format!("No chat found with id '{chat_id}'.")))?;

        let payload = Payload {
            question: message_input.message.clone(),
            context: HttpContext {
                stdin: HttpStdin {
                    stdin: message_input.stdin.stdin.clone(),
                },
                attachments: HttpAttachment {
                    contents: message_input.attachment.contents.clone(),
                    mimetype: message_input.attachment.mimetype.clone(),
                },
            },
        };

        let answer = self.http.submit(&self.backend_endpoint, &payload).await?;

        if self.audit_verbose {
            info!(
                audit = true,
                event = "ask",
                user_id = %user_id,
                chat_id = %chat_id,
                question = %message_input.message,
                response = %answer,
                "submitted a question to the backend"
            );
        } else {
            info!(
                audit = true,
                event = "ask",
                user_id = %user_id,
                chat_id = %chat_id,
                question_length = message_input.message.len(),
                response_length = answer.len(),
                "submitted a question to the backend"
            );
        }

        Ok(Response { message: answer })
    }

    /// Liveness probe only (DESIGN.md's pinned Open Question #2) — not a
    /// caller-identity check.
    #[zbus(name = "IsAllowed")]
    async fn is_allowed(&self) -> bool {
        true
    }
}
