use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Current schema version — increment when adding a migration step below.
const SCHEMA_VERSION: i64 = 1;

/// Runs migrations inline rather than from a `migrations/` directory, the
/// same idempotent pattern `crab_city::db::run_migrations` uses:
/// a `schema_version` table gates re-application, `CREATE TABLE IF NOT
/// EXISTS` makes every step safe to re-run, and future column additions use
/// `ALTER TABLE ... .ok()` rather than a bespoke up/down migration runner.
pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now')),
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    if current_version > SCHEMA_VERSION {
        anyhow::bail!(
            "database schema version {} is newer than supported version {}",
            current_version,
            SCHEMA_VERSION
        );
    }

    if current_version == SCHEMA_VERSION {
        info!("database schema is up to date (version {})", current_version);
        return Ok(());
    }

    info!(
        "migrating database from version {} to {}",
        current_version, SCHEMA_VERSION
    );

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            os_uid INTEGER NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chats (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Uniqueness only among live rows — a soft-deleted chat must not block
    // reuse of its name (spec.md §3: "name is unique among rows where
    // deleted_at IS NULL").
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_chats_user_name_live
        ON chats(user_id, name)
        WHERE deleted_at IS NULL
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chats_user_created ON chats(user_id, created_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interactions (
            id TEXT PRIMARY KEY,
            chat_id TEXT NOT NULL REFERENCES chats(id),
            question TEXT NOT NULL,
            response TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            deleted_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_interactions_chat_created ON interactions(chat_id, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT OR REPLACE INTO schema_version (version, description) VALUES (?, ?)",
    )
    .bind(SCHEMA_VERSION)
    .bind("users, chats, interactions")
    .execute(pool)
    .await?;

    Ok(())
}
