//! `cla chat` (spec.md §4.5/§6), grounded on
//! `original_source/command_line_assistant/commands/chat.py`'s `ChatCommand`:
//! resolve the input source, ask the question, render the answer. The
//! `--list`/`--delete`/`--delete-all` branches never touch `AskQuestion` at
//! all, matching the chat D-Bus interface's separate lookup/delete methods.
//!
//! Writing the exchange to history is a second, explicit call after
//! `AskQuestion` returns (spec.md §4.5: the daemon interface deliberately
//! does not persist it), unlike the original's single-proxy-call flow.

use std::io::{IsTerminal, Read};

use cla_ipcd::structures::{AttachmentInput, Question, StdinInput};

use crate::cli::ChatArgs;
use crate::error::ClientError;
use crate::input::{self, Inputs};
use crate::session::DaemonSession;

const DEFAULT_CHAT_NAME: &str = "default";
/// Returned by `guess_mimetype` on mismatch, copying
/// `utils/files.py::guess_mimetype`'s `unknown_mimetype` sentinel exactly.
const UNKNOWN_MIMETYPE: &str = "unknown/unknown";

pub async fn run(args: ChatArgs) -> Result<(), ClientError> {
    let session = DaemonSession::connect().await?;

    if args.list {
        return list_chats(&session).await;
    }
    if args.delete_all {
        return delete_all(&session).await;
    }
    if let Some(name) = &args.delete {
        return delete_one(&session, name).await;
    }

    ask(&session, &args).await
}

async fn list_chats(session: &DaemonSession) -> Result<(), ClientError> {
    let chats = session.chat.get_all_chat_from_user(&session.user_id).await?;
    if chats.chats.is_empty() {
        println!("No chats found.");
        return Ok(());
    }
    for chat in chats.chats {
        println!("{}\t{}\t{}", chat.name, chat.id, chat.description);
    }
    Ok(())
}

async fn delete_all(session: &DaemonSession) -> Result<(), ClientError> {
    session.chat.delete_all_chat_for_user(&session.user_id).await?;
    println!("All chats deleted.");
    Ok(())
}

async fn delete_one(session: &DaemonSession, name: &str) -> Result<(), ClientError> {
    session.chat.delete_chat_for_user(&session.user_id, name).await?;
    println!("Chat '{name}' deleted.");
    Ok(())
}

async fn ask(session: &DaemonSession, args: &ChatArgs) -> Result<(), ClientError> {
    let stdin_text = read_piped_stdin();

    let attachment_contents = args
        .attachment
        .as_ref()
        .map(std::fs::read_to_string)
        .transpose()
        .map_err(|e| ClientError::InvalidInput(format!("could not read attachment: {e}")))?
        .map(|s| s.trim().to_string());

    let terminal_output = resolve_terminal_output(args)?;

    let inputs = Inputs {
        query: args.query.clone(),
        stdin: stdin_text,
        attachment: attachment_contents,
        terminal_output,
    };

    let message = input::compose(&inputs, |warning| eprintln!("{warning}"))?;

    let chat_name = args.name.clone().unwrap_or_else(|| DEFAULT_CHAT_NAME.to_string());
    let chat_id = resolve_chat_id(session, &chat_name, args.description.as_deref()).await?;

    let mimetype = args
        .attachment
        .as_deref()
        .map(guess_mimetype)
        .unwrap_or_else(|| UNKNOWN_MIMETYPE.to_string());

    let question = Question {
        message: message.clone(),
        stdin: StdinInput {
            stdin: inputs.stdin.unwrap_or_default(),
        },
        attachment: AttachmentInput {
            contents: inputs.attachment.unwrap_or_default(),
            mimetype,
        },
    };

    let response = session.chat.ask_question(&chat_id, &session.user_id, question).await?;
    println!("{}", response.message);

    session
        .history
        .write_history(&chat_id, &session.user_id, &message, &response.message)
        .await?;

    Ok(())
}

/// Reads stdin only when it is not a TTY (a bare invocation with nothing
/// piped in must not block waiting on a terminal read).
fn read_piped_stdin() -> Option<String> {
    if std::io::stdin().is_terminal() {
        return None;
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).ok()?;
    let trimmed = buf.trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// `-i` alone means "the last recorded output"; `--last-output [N]` picks a
/// specific (possibly negative, counted from the end) index.
fn resolve_terminal_output(args: &ChatArgs) -> Result<Option<String>, ClientError> {
    let index = match (args.interactive, args.last_output) {
        (_, Some(n)) => n,
        (true, None) => -1,
        (false, None) => return Ok(None),
    };

    let log_path = cla_terminal::default_log_path();
    let blocks = cla_terminal::parse_log(&log_path)
        .map_err(|e| ClientError::InvalidInput(format!("could not read recorded terminal output: {e}")))?;
    Ok(cla_terminal::find_output_by_index(index, &blocks).map(str::to_string))
}

/// Looks the chat up by name, creating it on first use. Matches the idempotent
/// `CreateChat`/`GetChatId` pairing the chat interface already guarantees.
async fn resolve_chat_id(
    session: &DaemonSession,
    name: &str,
    description: Option<&str>,
) -> Result<String, ClientError> {
    match session.chat.get_chat_id(&session.user_id, name).await {
        Ok(id) => Ok(id),
        Err(e) => match ClientError::from(e) {
            ClientError::ChatNotFound(_) => session
                .chat
                .create_chat(&session.user_id, name, description.unwrap_or(""))
                .await
                .map_err(ClientError::from),
            other => Err(other),
        },
    }
}

/// Extension-based mimetype guess, grounded on
/// `utils/files.py::guess_mimetype`'s use of Python's `mimetypes` module
/// (reimplemented as a small lookup table since the ecosystem's mimetype
/// crates aren't part of this stack).
fn guess_mimetype(path: &std::path::Path) -> String {
    let guessed = match path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase().as_str() {
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "py" => "text/x-python",
        "rs" => "text/x-rust",
        "sh" | "bash" => "application/x-sh",
        "log" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        _ => return UNKNOWN_MIMETYPE.to_string(),
    };
    guessed.to_string()
}
