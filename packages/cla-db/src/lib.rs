//! Database layer (spec.md §4.1): schema plus repositories for users, chats,
//! and interactions, backed by sqlx/SQLite. Grounded on
//! `crab_city::db` (`Database::new`, idempotent `run_migrations`, PRAGMAs,
//! in-memory test pool) and on `original_source/daemon/database/repository/
//! history.py` for the soft-delete/ordering query shape.

mod error;
mod migrations;
mod models;

pub use error::DbError;
use error::is_unique_violation;
pub use models::{Chat, Interaction, User};

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if absent) the database at `connection_url`, run
    /// migrations, and apply the usual SQLite performance PRAGMAs.
    pub async fn connect(
        connection_url: &str,
        pool_size: u32,
        pool_timeout: Duration,
    ) -> Result<Self, DbError> {
        info!("connecting to database: {}", connection_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(pool_timeout)
            .connect(connection_url)
            .await
            .map_err(|e| match e {
                sqlx::Error::PoolTimedOut => DbError::StorageUnavailable(pool_timeout.as_millis() as u64),
                other => DbError::StorageError(other),
            })?;

        migrations::run_migrations(&pool)
            .await
            .map_err(|e| DbError::StorageError(sqlx::Error::Configuration(e.to_string().into())))?;

        for pragma in [
            "PRAGMA journal_mode = WAL",
            "PRAGMA synchronous = NORMAL",
            "PRAGMA foreign_keys = ON",
        ] {
            sqlx::query(pragma).execute(&pool).await?;
        }

        info!("database initialized");
        Ok(Self { pool })
    }

    /// An in-memory pool for tests, matching the `test_pool()`
    /// helper in `crab_city::db::tests`.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn connect_in_memory() -> Result<Self, DbError> {
        Self::connect("sqlite::memory:", 1, Duration::from_secs(5)).await
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository { pool: &self.pool }
    }

    pub fn chats(&self) -> ChatRepository<'_> {
        ChatRepository { pool: &self.pool }
    }

    pub fn interactions(&self) -> InteractionRepository<'_> {
        InteractionRepository { pool: &self.pool }
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// C3's backing store: `users.get_or_create`.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl UserRepository<'_> {
    /// Idempotent: two concurrent first-sees of the same `os_uid` yield one
    /// row, relying on the `UNIQUE(os_uid)` constraint to make the losing
    /// insert a no-op rather than a race.
    pub async fn get_or_create(&self, os_uid: u32) -> Result<String, DbError> {
        if let Some(row) = sqlx::query("SELECT id FROM users WHERE os_uid = ?")
            .bind(os_uid as i64)
            .fetch_optional(self.pool)
            .await?
        {
            return Ok(row.try_get("id")?);
        }

        let id = Uuid::new_v4().to_string();
        let inserted = sqlx::query("INSERT OR IGNORE INTO users (id, os_uid) VALUES (?, ?)")
            .bind(&id)
            .bind(os_uid as i64)
            .execute(self.pool)
            .await?;

        if inserted.rows_affected() == 1 {
            return Ok(id);
        }

        // Lost the race to a concurrent insert; read back the winner's row.
        let row = sqlx::query("SELECT id FROM users WHERE os_uid = ?")
            .bind(os_uid as i64)
            .fetch_one(self.pool)
            .await?;
        Ok(row.try_get("id")?)
    }
}

pub struct ChatRepository<'a> {
    pool: &'a SqlitePool,
}

impl ChatRepository<'_> {
    /// Check-then-insert, but the losing side of a concurrent race is still
    /// caught: `idx_chats_user_name_live` rejects the losing `INSERT` with a
    /// unique-constraint violation, which is mapped to the same
    /// `ChatAlreadyExists` the upfront check would have returned (spec.md §5:
    /// "exactly one `CreateChat` succeeds and the other returns the existing
    /// id").
    pub async fn insert(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<String, DbError> {
        if self.find_by_name(user_id, name).await?.is_some() {
            return Err(DbError::ChatAlreadyExists(name.to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = now_iso();
        sqlx::query(
            "INSERT INTO chats (id, user_id, name, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(name)
        .bind(description)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::ChatAlreadyExists(name.to_string())
            } else {
                DbError::StorageError(e)
            }
        })?;

        Ok(id)
    }

    pub async fn find_by_name(&self, user_id: &str, name: &str) -> Result<Option<Chat>, DbError> {
        let chat = sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats WHERE user_id = ? AND name = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(chat)
    }

    pub async fn find_by_id(&self, chat_id: &str) -> Result<Option<Chat>, DbError> {
        let chat = sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(chat_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(chat)
    }

    pub async fn list_live(&self, user_id: &str) -> Result<Vec<Chat>, DbError> {
        let chats = sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats WHERE user_id = ? AND deleted_at IS NULL ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(chats)
    }

    pub async fn latest(&self, user_id: &str) -> Result<Option<Chat>, DbError> {
        let chat = sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats WHERE user_id = ? AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(chat)
    }

    /// Soft-deletes the chat and cascades to its interactions in one
    /// transaction (spec.md §3: "cascading soft-delete on delete chat").
    pub async fn soft_delete(&self, chat_id: &str) -> Result<(), DbError> {
        let now = now_iso();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE chats SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(chat_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::ChatNotFound);
        }

        sqlx::query(
            "UPDATE interactions SET deleted_at = ? WHERE chat_id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(chat_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

pub struct InteractionRepository<'a> {
    pool: &'a SqlitePool,
}

impl InteractionRepository<'_> {
    pub async fn insert(
        &self,
        chat_id: &str,
        question: &str,
        response: &str,
    ) -> Result<String, DbError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO interactions (id, chat_id, question, response, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(chat_id)
        .bind(question)
        .bind(response)
        .bind(now_iso())
        .execute(self.pool)
        .await?;
        Ok(id)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Interaction>, DbError> {
        let rows = sqlx::query_as::<_, Interaction>(
            r#"
            SELECT i.* FROM interactions i
            JOIN chats c ON c.id = i.chat_id
            WHERE c.user_id = ? AND c.deleted_at IS NULL AND i.deleted_at IS NULL
            ORDER BY i.created_at ASC, i.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Case-sensitive substring match against `question OR response`, per
    /// spec.md §4.1 and the pinned Open Question in DESIGN.md about
    /// `GetFilteredConversation`.
    pub async fn filter_for_user(
        &self,
        user_id: &str,
        keyword: &str,
    ) -> Result<Vec<Interaction>, DbError> {
        let all = self.list_for_user(user_id).await?;
        Ok(all
            .into_iter()
            .filter(|i| i.question.contains(keyword) || i.response.contains(keyword))
            .collect())
    }

    /// Soft-deletes every interaction belonging to any of the user's chats;
    /// the chats themselves remain (spec.md §4.1).
    pub async fn clear_for_user(&self, user_id: &str) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE interactions SET deleted_at = ?
            WHERE deleted_at IS NULL AND chat_id IN (
                SELECT id FROM chats WHERE user_id = ?
            )
            "#,
        )
        .bind(now_iso())
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> Database {
        Database::connect_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let db = memory_db().await;
        let id1 = db.users().get_or_create(1000).await.unwrap();
        let id2 = db.users().get_or_create(1000).await.unwrap();
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn get_or_create_distinguishes_uids() {
        let db = memory_db().await;
        let id1 = db.users().get_or_create(1000).await.unwrap();
        let id2 = db.users().get_or_create(1001).await.unwrap();
        assert_ne!(id1, id2);
    }

    #[tokio::test]
    async fn create_chat_then_get_id_round_trips() {
        let db = memory_db().await;
        let user_id = db.users().get_or_create(1000).await.unwrap();
        let chat_id = db.chats().insert(&user_id, "default", "").await.unwrap();
        let found = db.chats().find_by_name(&user_id, "default").await.unwrap().unwrap();
        assert_eq!(found.id, chat_id);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_live_name() {
        let db = memory_db().await;
        let user_id = db.users().get_or_create(1000).await.unwrap();
        db.chats().insert(&user_id, "default", "").await.unwrap();
        let err = db.chats().insert(&user_id, "default", "").await.unwrap_err();
        assert!(matches!(err, DbError::ChatAlreadyExists(_)));
    }

    /// Two concurrent `insert`s for the same `(user_id, name)` must resolve
    /// to exactly one winner, and the loser must come back as
    /// `ChatAlreadyExists`, never a raw `StorageError` — whether the loser is
    /// caught by the upfront `find_by_name` check or by
    /// `idx_chats_user_name_live` rejecting its `INSERT` depends on exact
    /// timing, but both guards must map to the same error (spec.md §5/§8:
    /// "exactly one `CreateChat` succeeds and the other returns the existing
    /// id").
    #[tokio::test]
    async fn concurrent_inserts_for_the_same_name_yield_one_winner() {
        let db = memory_db().await;
        let user_id = db.users().get_or_create(1000).await.unwrap();
        let chats = db.chats();

        let (first, second) = tokio::join!(
            chats.insert(&user_id, "default", "a"),
            chats.insert(&user_id, "default", "b"),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.into_iter().find(Result::is_err).unwrap().unwrap_err();
        assert!(matches!(loser, DbError::ChatAlreadyExists(_)));
    }

    #[tokio::test]
    async fn soft_deleted_chat_is_invisible_to_reads() {
        let db = memory_db().await;
        let user_id = db.users().get_or_create(1000).await.unwrap();
        let chat_id = db.chats().insert(&user_id, "default", "").await.unwrap();
        db.chats().soft_delete(&chat_id).await.unwrap();

        assert!(db.chats().find_by_name(&user_id, "default").await.unwrap().is_none());
        assert!(db.chats().list_live(&user_id).await.unwrap().is_empty());
        assert!(db.chats().latest(&user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn soft_delete_cascades_to_interactions() {
        let db = memory_db().await;
        let user_id = db.users().get_or_create(1000).await.unwrap();
        let chat_id = db.chats().insert(&user_id, "default", "").await.unwrap();
        db.interactions().insert(&chat_id, "q", "a").await.unwrap();

        db.chats().soft_delete(&chat_id).await.unwrap();

        assert!(db.interactions().list_for_user(&user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn soft_delete_missing_chat_errors() {
        let db = memory_db().await;
        let err = db.chats().soft_delete("no-such-id").await.unwrap_err();
        assert!(matches!(err, DbError::ChatNotFound));
    }

    #[tokio::test]
    async fn interactions_ordered_ascending_by_created_at() {
        let db = memory_db().await;
        let user_id = db.users().get_or_create(1000).await.unwrap();
        let chat_id = db.chats().insert(&user_id, "default", "").await.unwrap();
        db.interactions().insert(&chat_id, "first", "a1").await.unwrap();
        db.interactions().insert(&chat_id, "second", "a2").await.unwrap();

        let list = db.interactions().list_for_user(&user_id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].question, "first");
        assert_eq!(list[1].question, "second");
    }

    #[tokio::test]
    async fn filter_is_case_sensitive() {
        let db = memory_db().await;
        let user_id = db.users().get_or_create(1000).await.unwrap();
        let chat_id = db.chats().insert(&user_id, "default", "").await.unwrap();
        db.interactions().insert(&chat_id, "How do I list files?", "Use ls").await.unwrap();

        let hits = db.interactions().filter_for_user(&user_id, "list").await.unwrap();
        assert_eq!(hits.len(), 1);

        let misses = db.interactions().filter_for_user(&user_id, "LIST").await.unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn clear_for_user_soft_deletes_interactions_but_keeps_chats() {
        let db = memory_db().await;
        let user_id = db.users().get_or_create(1000).await.unwrap();
        let chat_a = db.chats().insert(&user_id, "a", "").await.unwrap();
        let chat_b = db.chats().insert(&user_id, "b", "").await.unwrap();
        db.interactions().insert(&chat_a, "q1", "a1").await.unwrap();
        db.interactions().insert(&chat_b, "q2", "a2").await.unwrap();

        db.interactions().clear_for_user(&user_id).await.unwrap();

        assert!(db.interactions().list_for_user(&user_id).await.unwrap().is_empty());
        assert_eq!(db.chats().list_live(&user_id).await.unwrap().len(), 2);
        // CreateChat with an existing chat name still returns that chat's id
        // after a history clear (scenario 4 in spec.md §8).
        assert!(db.chats().find_by_name(&user_id, "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn interactions_are_immutable_once_written() {
        let db = memory_db().await;
        let user_id = db.users().get_or_create(1000).await.unwrap();
        let chat_id = db.chats().insert(&user_id, "default", "").await.unwrap();
        db.interactions().insert(&chat_id, "q", "a").await.unwrap();

        let first_read = db.interactions().list_for_user(&user_id).await.unwrap();
        let second_read = db.interactions().list_for_user(&user_id).await.unwrap();
        assert_eq!(first_read[0].question, second_read[0].question);
        assert_eq!(first_read[0].response, second_read[0].response);
    }
}
