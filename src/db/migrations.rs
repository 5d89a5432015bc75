//! Versioned schema migrations.
//!
//! Each migration runs once, in its own transaction, keyed by
//! `meta.schema_version`. Migrations that add a column to populated tables
//! carry a backfill: rows are read, passed through a pure upgrade function and
//! written back, so no row is left with the new column unset.

use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::models::{now_timestamp, Language, Layout, DEFAULT_PER_PAGE, MAX_PER_PAGE};

/// Name of the book that collects words created before books existed.
pub const BACKFILL_BOOK_NAME: &str = "My Words";

pub const CURRENT_SCHEMA_VERSION: i64 = 4;

/// Row-level upgrade applied after a migration's DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backfill {
    None,
    SettingsLayout,
    WordsIntoBook,
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
    pub backfill: Backfill,
}

/// All migrations, ordered by version.
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "words and settings",
            statements: &[
                r#"CREATE TABLE IF NOT EXISTS words (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    term TEXT NOT NULL,
                    meaning TEXT NOT NULL DEFAULT '',
                    learned INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )"#,
                r#"CREATE TABLE IF NOT EXISTS settings (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    per_page INTEGER NOT NULL,
                    updated_at TEXT NOT NULL
                )"#,
            ],
            backfill: Backfill::None,
        },
        Migration {
            version: 2,
            name: "settings layout",
            statements: &["ALTER TABLE settings ADD COLUMN layout TEXT"],
            backfill: Backfill::SettingsLayout,
        },
        Migration {
            version: 3,
            name: "books",
            statements: &[
                r#"CREATE TABLE IF NOT EXISTS books (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    color TEXT NOT NULL DEFAULT 'default',
                    type TEXT NOT NULL DEFAULT 'en',
                    value TEXT NOT NULL DEFAULT 'en',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )"#,
                "ALTER TABLE words ADD COLUMN book_id INTEGER",
                "ALTER TABLE settings ADD COLUMN hide_meanings INTEGER NOT NULL DEFAULT 1",
                "ALTER TABLE settings ADD COLUMN selected_book_id INTEGER",
            ],
            backfill: Backfill::WordsIntoBook,
        },
        Migration {
            version: 4,
            name: "listing indexes",
            statements: &[
                "CREATE INDEX IF NOT EXISTS idx_words_book_created ON words(book_id, created_at)",
                "CREATE INDEX IF NOT EXISTS idx_words_created ON words(created_at)",
                "CREATE INDEX IF NOT EXISTS idx_books_created ON books(created_at)",
            ],
            backfill: Backfill::None,
        },
    ]
}

/// Settings as stored before `layout` existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsV1 {
    pub per_page: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsV2 {
    pub per_page: i64,
    pub layout: Layout,
}

/// v1 had no page size bounds; bring it into range while adding the layout.
pub fn upgrade_settings_v2(old: SettingsV1) -> SettingsV2 {
    let per_page = if old.per_page < 1 {
        DEFAULT_PER_PAGE
    } else {
        old.per_page.min(MAX_PER_PAGE)
    };
    SettingsV2 {
        per_page,
        layout: Layout::default(),
    }
}

/// A word as stored before books existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordV2 {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordV3 {
    pub id: i64,
    pub book_id: i64,
}

pub fn upgrade_word_v3(old: WordV2, book_id: i64) -> WordV3 {
    WordV3 { id: old.id, book_id }
}

/// Create `meta` if needed and apply every pending migration.
pub async fn run_migrations(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 0,
            revision_id INTEGER NOT NULL DEFAULT 0,
            seeded INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, seeded)
        VALUES (1, 0, 0, 0);
        "#,
    )
    .execute(pool)
    .await?;

    let start_version: i64 = sqlx::query("SELECT schema_version FROM meta WHERE id = 1")
        .fetch_one(pool)
        .await?
        .get("schema_version");

    let mut version = start_version;
    for migration in migrations()
        .into_iter()
        .filter(|m| m.version > start_version)
    {
        let mut tx = pool.begin().await?;

        for statement in migration.statements {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }
        apply_backfill(&mut *tx, migration.backfill).await?;

        sqlx::query("UPDATE meta SET schema_version = ? WHERE id = 1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied schema migration"
        );
        version = migration.version;
    }

    Ok(version)
}

async fn apply_backfill(conn: &mut SqliteConnection, backfill: Backfill) -> Result<(), sqlx::Error> {
    match backfill {
        Backfill::None => Ok(()),
        Backfill::SettingsLayout => {
            let rows = sqlx::query("SELECT id, per_page FROM settings WHERE layout IS NULL")
                .fetch_all(&mut *conn)
                .await?;
            for row in rows {
                let id: i64 = row.get("id");
                let upgraded = upgrade_settings_v2(SettingsV1 {
                    per_page: row.get("per_page"),
                });
                sqlx::query("UPDATE settings SET per_page = ?, layout = ? WHERE id = ?")
                    .bind(upgraded.per_page)
                    .bind(upgraded.layout.as_str())
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
            }
            Ok(())
        }
        Backfill::WordsIntoBook => {
            let orphans: Vec<WordV2> = sqlx::query("SELECT id FROM words WHERE book_id IS NULL")
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(|row| WordV2 { id: row.get("id") })
                .collect();
            if orphans.is_empty() {
                return Ok(());
            }

            let now = now_timestamp();
            let book_id = sqlx::query(
                "INSERT INTO books (name, color, type, value, created_at, updated_at) VALUES (?, 'default', ?, ?, ?, ?)",
            )
            .bind(BACKFILL_BOOK_NAME)
            .bind(Language::En.as_str())
            .bind(Language::En.as_str())
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();

            for word in orphans {
                let upgraded = upgrade_word_v3(word, book_id);
                sqlx::query("UPDATE words SET book_id = ? WHERE id = ?")
                    .bind(upgraded.book_id)
                    .bind(upgraded.id)
                    .execute(&mut *conn)
                    .await?;
            }

            sqlx::query(
                "UPDATE settings SET selected_book_id = ? WHERE selected_book_id IS NULL",
            )
            .bind(book_id)
            .execute(&mut *conn)
            .await?;

            tracing::info!(book_id, "Moved existing words into a backfill book");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::db::open_pool;

    #[tokio::test]
    async fn test_run_migrations_applies_each_pending_version_once() {
        let dir = TempDir::new().unwrap();
        let pool = open_pool(&dir.path().join("store.sqlite")).await.unwrap();

        assert_eq!(run_migrations(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
        // A second open finds nothing pending and keeps the stored version.
        assert_eq!(run_migrations(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

        let indexes: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
        )
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
        assert_eq!(indexes, 3);
    }

    #[tokio::test]
    async fn test_run_migrations_resumes_from_stored_version() {
        let dir = TempDir::new().unwrap();
        let pool = open_pool(&dir.path().join("store.sqlite")).await.unwrap();
        run_migrations(&pool).await.unwrap();

        // Pretend v4 never ran; only it should be applied again.
        sqlx::query("UPDATE meta SET schema_version = 3 WHERE id = 1")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(run_migrations(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_migrations_are_ordered() {
        let versions: Vec<i64> = migrations().iter().map(|m| m.version).collect();
        assert_eq!(versions, (1..=CURRENT_SCHEMA_VERSION).collect::<Vec<_>>());
    }

    #[test]
    fn test_upgrade_settings_v2() {
        assert_eq!(
            upgrade_settings_v2(SettingsV1 { per_page: 7 }),
            SettingsV2 {
                per_page: 7,
                layout: Layout::TwoColumn
            }
        );
        assert_eq!(upgrade_settings_v2(SettingsV1 { per_page: 100 }).per_page, 20);
        assert_eq!(upgrade_settings_v2(SettingsV1 { per_page: 0 }).per_page, 10);
    }

    #[test]
    fn test_upgrade_word_v3() {
        assert_eq!(
            upgrade_word_v3(WordV2 { id: 5 }, 2),
            WordV3 { id: 5, book_id: 2 }
        );
    }
}
