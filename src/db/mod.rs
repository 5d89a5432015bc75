//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod migrations;
mod repository;
mod seed;

pub use migrations::{run_migrations, CURRENT_SCHEMA_VERSION};
pub use repository::*;
pub use seed::seed_if_needed;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Open the connection pool without touching the schema.
pub async fn open_pool(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Open the database, run pending migrations and seed it on first open.
pub async fn init_database(db_path: &Path, seed_words: bool) -> Result<SqlitePool, sqlx::Error> {
    let pool = open_pool(db_path).await?;

    let version = run_migrations(&pool).await?;
    if version > CURRENT_SCHEMA_VERSION {
        tracing::warn!(
            schema_version = version,
            supported = CURRENT_SCHEMA_VERSION,
            "Store was written by a newer version"
        );
    } else {
        tracing::debug!(schema_version = version, "Schema is up to date");
    }

    if seed_if_needed(&pool, seed_words).await? {
        tracing::info!("Initialized a new word book store");
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use sqlx::Row;
    use tempfile::TempDir;

    use super::migrations::migrations;
    use super::seed::STARTER_WORDS;
    use super::*;

    #[tokio::test]
    async fn test_first_open_seeds_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.sqlite");

        let pool = init_database(&path, true).await.unwrap();
        let words: i64 = sqlx::query("SELECT COUNT(*) AS n FROM words")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(words, STARTER_WORDS.len() as i64);
        pool.close().await;

        // Second open must not add another starter book.
        let pool = init_database(&path, true).await.unwrap();
        let books: i64 = sqlx::query("SELECT COUNT(*) AS n FROM books")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(books, 1);
        let settings: i64 = sqlx::query("SELECT COUNT(*) AS n FROM settings")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(settings, 1);
    }

    #[tokio::test]
    async fn test_seed_without_words() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("store.sqlite"), false)
            .await
            .unwrap();

        let words: i64 = sqlx::query("SELECT COUNT(*) AS n FROM words")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(words, 0);
        let version: i64 = sqlx::query("SELECT schema_version FROM meta WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("schema_version");
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_upgrade_from_v1_backfills_new_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.sqlite");

        // Build a store as the first schema version left it.
        let pool = open_pool(&path).await.unwrap();
        sqlx::query(
            "CREATE TABLE meta (id INTEGER PRIMARY KEY CHECK (id = 1), schema_version INTEGER NOT NULL DEFAULT 0, revision_id INTEGER NOT NULL DEFAULT 0, seeded INTEGER NOT NULL DEFAULT 0, generated_at TEXT NOT NULL DEFAULT '')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO meta (id, schema_version) VALUES (1, 1)")
            .execute(&pool)
            .await
            .unwrap();
        for statement in migrations()[0].statements {
            sqlx::query(*statement).execute(&pool).await.unwrap();
        }
        sqlx::query("INSERT INTO settings (id, per_page, updated_at) VALUES (1, 42, '2023-01-01T00:00:00.000Z')")
            .execute(&pool)
            .await
            .unwrap();
        for term in ["old", "older"] {
            sqlx::query("INSERT INTO words (term, meaning, learned, created_at, updated_at) VALUES (?, '', 0, '2023-01-01T00:00:00.000Z', '2023-01-01T00:00:00.000Z')")
                .bind(term)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool.close().await;

        let pool = init_database(&path, true).await.unwrap();

        let settings = sqlx::query("SELECT per_page, layout, selected_book_id FROM settings WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        let layout: String = settings.get("layout");
        let per_page: i64 = settings.get("per_page");
        let selected: Option<i64> = settings.get("selected_book_id");
        assert_eq!(layout, "two-column");
        assert_eq!(per_page, 20);

        let orphans: i64 = sqlx::query("SELECT COUNT(*) AS n FROM words WHERE book_id IS NULL")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(orphans, 0);

        // Existing data means no starter book on top of the backfill book.
        let books: Vec<i64> = sqlx::query("SELECT id FROM books")
            .fetch_all(&pool)
            .await
            .unwrap()
            .iter()
            .map(|r| r.get("id"))
            .collect();
        assert_eq!(books.len(), 1);
        assert_eq!(selected, Some(books[0]));
    }
}
