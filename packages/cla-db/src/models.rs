use serde::Serialize;

/// `User.id` and `os_uid` per spec.md §3. `id` is never reused.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub os_uid: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Chat {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// An immutable question/response pair (spec.md §3 — "immutable once
/// written; only soft-deletion may mutate them").
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Interaction {
    pub id: String,
    pub chat_id: String,
    pub question: String,
    pub response: String,
    pub created_at: String,
    pub deleted_at: Option<String>,
}
