//! Database repository for CRUD operations.
//!
//! Every write runs in one transaction under the repository write lock, bumps
//! the store revision, commits, and only then announces the touched tables.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::Mutex;

use super::seed;
use crate::errors::AppError;
use crate::live::{ChangeNotifier, Table};
use crate::models::{
    now_timestamp, validate_per_page, Book, CreateBookRequest, CreateWordRequest, ExportDocument,
    ImportDocument, Language, Layout, RevisionInfo, Settings, UpdateBookRequest,
    UpdateSettingsRequest, UpdateWordRequest, Word,
};
use crate::pagination::{paginate, Page};

const WORD_COLUMNS: &str = "id, term, meaning, learned, book_id, created_at, updated_at";
const BOOK_COLUMNS: &str = "id, name, color, type, value, created_at, updated_at";
const SETTINGS_COLUMNS: &str = "per_page, layout, hide_meanings, selected_book_id, updated_at";

/// Outcome of deleting a book.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDeletion {
    pub book_id: i64,
    pub words_deleted: u64,
}

/// Outcome of an import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub words: usize,
    pub books: usize,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
    write_lock: Arc<Mutex<()>>,
    seed_words: bool,
}

impl Repository {
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        Self {
            pool,
            notifier,
            write_lock: Arc::new(Mutex::new(())),
            seed_words: true,
        }
    }

    /// Whether `reset` reseeds the starter book.
    pub fn with_seed_words(mut self, seed_words: bool) -> Self {
        self.seed_words = seed_words;
        self
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query(
            "SELECT revision_id, schema_version, generated_at FROM meta WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            schema_version: row.get("schema_version"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Bump the revision, commit and announce the touched tables.
    async fn finish(
        &self,
        mut tx: Transaction<'_, Sqlite>,
        tables: &[Table],
    ) -> Result<i64, AppError> {
        let now = now_timestamp();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        let revision_id: i64 = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?
            .get("revision_id");

        tx.commit().await?;
        self.notifier.publish(tables, revision_id);
        Ok(revision_id)
    }

    // ==================== BOOK OPERATIONS ====================

    /// List all books, newest first.
    pub async fn list_books(&self) -> Result<Vec<Book>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_books(&mut conn).await
    }

    /// Get a book by ID.
    pub async fn get_book(&self, id: i64) -> Result<Option<Book>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_book(&mut conn, id).await
    }

    /// Create a new book.
    pub async fn create_book(&self, request: &CreateBookRequest) -> Result<Book, AppError> {
        request.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let now = now_timestamp();

        let id = sqlx::query(
            "INSERT INTO books (name, color, type, value, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(request.name.trim())
        .bind(&request.color)
        .bind(request.kind.as_str())
        .bind(request.value.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        self.finish(tx, &[Table::Books]).await?;
        tracing::debug!(book_id = id, "Created book");

        Ok(Book {
            id,
            name: request.name.trim().to_string(),
            color: request.color.clone(),
            kind: request.kind,
            value: request.value,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Update a book, keeping fields the request leaves out.
    pub async fn update_book(&self, id: i64, request: &UpdateBookRequest) -> Result<Book, AppError> {
        request.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing = fetch_book(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        let now = now_timestamp();
        let updated = Book {
            id,
            name: request
                .name
                .as_deref()
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.name),
            color: request.color.clone().unwrap_or(existing.color),
            kind: request.kind.unwrap_or(existing.kind),
            value: request.value.unwrap_or(existing.value),
            created_at: existing.created_at,
            updated_at: now,
        };

        sqlx::query(
            "UPDATE books SET name = ?, color = ?, type = ?, value = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&updated.name)
        .bind(&updated.color)
        .bind(updated.kind.as_str())
        .bind(updated.value.as_str())
        .bind(&updated.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        self.finish(tx, &[Table::Books]).await?;
        Ok(updated)
    }

    /// Delete a book together with all of its words.
    ///
    /// The store does not enforce the word → book reference, so the words go
    /// first, in the same transaction as the book itself.
    pub async fn delete_book(&self, id: i64) -> Result<BookDeletion, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        if fetch_book(&mut tx, id).await?.is_none() {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }

        let words_deleted = sqlx::query("DELETE FROM words WHERE book_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let mut tables = vec![Table::Words, Table::Books];
        let cleared = sqlx::query(
            "UPDATE settings SET selected_book_id = NULL, updated_at = ? WHERE selected_book_id = ?",
        )
        .bind(now_timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if cleared > 0 {
            tables.push(Table::Settings);
        }

        self.finish(tx, &tables).await?;
        tracing::info!(book_id = id, words_deleted, "Deleted book");

        Ok(BookDeletion {
            book_id: id,
            words_deleted,
        })
    }

    // ==================== WORD OPERATIONS ====================

    /// List words newest first, optionally narrowed to one book.
    pub async fn list_words(&self, book_id: Option<i64>) -> Result<Vec<Word>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_words(&mut conn, book_id).await
    }

    /// One page of a book's words.
    ///
    /// Uses the configured page size unless `per_page` overrides it; the page
    /// number is clamped to the pages that exist.
    pub async fn list_words_page(
        &self,
        book_id: i64,
        page: usize,
        per_page: Option<i64>,
    ) -> Result<Page<Word>, AppError> {
        if let Some(per_page) = per_page {
            validate_per_page(per_page)?;
        }

        let mut tx = self.pool.begin().await?;
        if fetch_book(&mut tx, book_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Book {} not found", book_id)));
        }
        let per_page = match per_page {
            Some(per_page) => per_page,
            None => fetch_settings(&mut tx)
                .await?
                .unwrap_or_else(|| Settings::defaults(now_timestamp()))
                .per_page,
        };
        let words = fetch_words(&mut tx, Some(book_id)).await?;
        tx.commit().await?;

        Ok(paginate(words, page, per_page as usize))
    }

    /// Get a word by ID.
    pub async fn get_word(&self, id: i64) -> Result<Option<Word>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_word(&mut conn, id).await
    }

    /// Create a new word in an existing book.
    pub async fn create_word(&self, request: &CreateWordRequest) -> Result<Word, AppError> {
        request.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        ensure_book_exists(&mut tx, request.book_id).await?;

        let now = now_timestamp();
        let id = sqlx::query(
            "INSERT INTO words (term, meaning, learned, book_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(request.term.trim())
        .bind(&request.meaning)
        .bind(request.learned as i32)
        .bind(request.book_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        self.finish(tx, &[Table::Words]).await?;

        Ok(Word {
            id,
            term: request.term.trim().to_string(),
            meaning: request.meaning.clone(),
            learned: request.learned,
            book_id: request.book_id,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Update a word, keeping fields the request leaves out.
    pub async fn update_word(&self, id: i64, request: &UpdateWordRequest) -> Result<Word, AppError> {
        request.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing = fetch_word(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Word {} not found", id)))?;

        if let Some(book_id) = request.book_id {
            if book_id != existing.book_id {
                ensure_book_exists(&mut tx, book_id).await?;
            }
        }

        let updated = Word {
            id,
            term: request
                .term
                .as_deref()
                .map(|t| t.trim().to_string())
                .unwrap_or(existing.term),
            meaning: request.meaning.clone().unwrap_or(existing.meaning),
            learned: request.learned.unwrap_or(existing.learned),
            book_id: request.book_id.unwrap_or(existing.book_id),
            created_at: existing.created_at,
            updated_at: now_timestamp(),
        };

        sqlx::query(
            "UPDATE words SET term = ?, meaning = ?, learned = ?, book_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&updated.term)
        .bind(&updated.meaning)
        .bind(updated.learned as i32)
        .bind(updated.book_id)
        .bind(&updated.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        self.finish(tx, &[Table::Words]).await?;
        Ok(updated)
    }

    /// Delete a word.
    pub async fn delete_word(&self, id: i64) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM words WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Word {} not found", id)));
        }

        self.finish(tx, &[Table::Words]).await?;
        Ok(())
    }

    // ==================== SETTINGS OPERATIONS ====================

    /// The settings row, if it exists.
    pub async fn get_settings(&self) -> Result<Option<Settings>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_settings(&mut conn).await
    }

    /// The settings row, or the defaults when it is missing.
    pub async fn settings_or_default(&self) -> Result<Settings, AppError> {
        Ok(self
            .get_settings()
            .await?
            .unwrap_or_else(|| Settings::defaults(now_timestamp())))
    }

    /// Merge the given fields into the settings row.
    pub async fn update_settings(
        &self,
        request: &UpdateSettingsRequest,
    ) -> Result<Settings, AppError> {
        request.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        if let Some(book_id) = request.selected_book_id {
            ensure_book_exists(&mut tx, book_id).await?;
        }

        let now = now_timestamp();
        let existing = fetch_settings(&mut tx)
            .await?
            .unwrap_or_else(|| Settings::defaults(now.clone()));
        let updated = Settings {
            per_page: request.per_page.unwrap_or(existing.per_page),
            layout: request.layout.unwrap_or(existing.layout),
            hide_meanings: request.hide_meanings.unwrap_or(existing.hide_meanings),
            selected_book_id: request.selected_book_id.or(existing.selected_book_id),
            updated_at: now,
        };

        write_settings(&mut tx, &updated).await?;
        self.finish(tx, &[Table::Settings]).await?;
        Ok(updated)
    }

    /// Remember the last-viewed book, or forget it with `None`.
    pub async fn select_book(&self, book_id: Option<i64>) -> Result<Settings, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        if let Some(book_id) = book_id {
            ensure_book_exists(&mut tx, book_id).await?;
        }

        let now = now_timestamp();
        let mut settings = fetch_settings(&mut tx)
            .await?
            .unwrap_or_else(|| Settings::defaults(now.clone()));
        settings.selected_book_id = book_id;
        settings.updated_at = now;

        write_settings(&mut tx, &settings).await?;
        self.finish(tx, &[Table::Settings]).await?;
        Ok(settings)
    }

    // ==================== IMPORT / EXPORT ====================

    /// Snapshot every table as one document.
    pub async fn export_data(&self) -> Result<ExportDocument, AppError> {
        let mut tx = self.pool.begin().await?;
        let words = fetch_words(&mut tx, None).await?;
        let books = fetch_books(&mut tx).await?;
        let settings = fetch_settings(&mut tx)
            .await?
            .unwrap_or_else(|| Settings::defaults(now_timestamp()));
        tx.commit().await?;

        Ok(ExportDocument {
            words,
            settings,
            books,
        })
    }

    /// Replace the stored words and settings (and books, when the document
    /// carries them) with the document's contents.
    ///
    /// The document is validated before anything is deleted, and the whole
    /// replacement is one transaction: on any failure the store is unchanged.
    pub async fn import_data(&self, document: &ImportDocument) -> Result<ImportSummary, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let live_book_ids = fetch_book_ids(&mut tx).await?;
        document.validate(&live_book_ids)?;
        let incoming = document.settings()?;

        let now = now_timestamp();
        let mut tables = vec![Table::Words, Table::Settings];

        // Map document book ids to the ids the store assigns.
        let book_ids: HashMap<i64, i64> = match &document.books {
            Some(_) => {
                sqlx::query("DELETE FROM books").execute(&mut *tx).await?;
                let mut mapped = HashMap::new();
                for book in document.books_in_creation_order() {
                    let new_id = sqlx::query(
                        "INSERT INTO books (name, color, type, value, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(book.name.trim())
                    .bind(&book.color)
                    .bind(book.kind.as_str())
                    .bind(book.value.as_str())
                    .bind(&now)
                    .bind(&now)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid();
                    mapped.insert(book.id, new_id);
                }
                tables.push(Table::Books);
                mapped
            }
            None => live_book_ids.iter().map(|&id| (id, id)).collect(),
        };

        sqlx::query("DELETE FROM words").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM settings").execute(&mut *tx).await?;

        let words = document.words_in_creation_order();
        for word in &words {
            let book_id = book_ids.get(&word.book_id).copied().ok_or_else(|| {
                AppError::Validation(format!("Unknown book {} in import", word.book_id))
            })?;
            sqlx::query(
                "INSERT INTO words (term, meaning, learned, book_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(word.term.trim())
            .bind(&word.meaning)
            .bind(word.learned as i32)
            .bind(book_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        let settings = Settings {
            per_page: incoming.per_page,
            layout: incoming.layout,
            hide_meanings: incoming.hide_meanings.unwrap_or(true),
            selected_book_id: incoming
                .selected_book_id
                .and_then(|id| book_ids.get(&id).copied()),
            updated_at: now.clone(),
        };
        write_settings(&mut tx, &settings).await?;

        self.finish(tx, &tables).await?;

        let summary = ImportSummary {
            words: words.len(),
            books: document.books.as_ref().map_or(0, Vec::len),
        };
        tracing::info!(words = summary.words, books = summary.books, "Imported data");
        Ok(summary)
    }

    /// Wipe every table and seed the store as on first open.
    pub async fn reset(&self) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM words").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM books").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM settings").execute(&mut *tx).await?;
        seed::seed(&mut tx, self.seed_words).await?;

        self.finish(tx, &Table::ALL).await?;
        tracing::warn!("Store reset to its initial state");
        Ok(())
    }
}

// Reads shared by pooled and transactional callers

async fn fetch_books(conn: &mut SqliteConnection) -> Result<Vec<Book>, AppError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM books ORDER BY created_at DESC, id DESC",
        BOOK_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(book_from_row).collect())
}

async fn fetch_book(conn: &mut SqliteConnection, id: i64) -> Result<Option<Book>, AppError> {
    let row = sqlx::query(&format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(book_from_row))
}

async fn fetch_book_ids(conn: &mut SqliteConnection) -> Result<HashSet<i64>, AppError> {
    let rows = sqlx::query("SELECT id FROM books")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.iter().map(|row| row.get("id")).collect())
}

async fn ensure_book_exists(conn: &mut SqliteConnection, book_id: i64) -> Result<(), AppError> {
    let exists = sqlx::query("SELECT 1 FROM books WHERE id = ?")
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?
        .is_some();
    if !exists {
        return Err(AppError::Validation(format!(
            "Book {} does not exist",
            book_id
        )));
    }
    Ok(())
}

async fn fetch_words(
    conn: &mut SqliteConnection,
    book_id: Option<i64>,
) -> Result<Vec<Word>, AppError> {
    let rows = match book_id {
        Some(book_id) => {
            sqlx::query(&format!(
                "SELECT {} FROM words WHERE book_id = ? ORDER BY created_at DESC, id DESC",
                WORD_COLUMNS
            ))
            .bind(book_id)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM words ORDER BY created_at DESC, id DESC",
                WORD_COLUMNS
            ))
            .fetch_all(&mut *conn)
            .await?
        }
    };
    Ok(rows.iter().map(word_from_row).collect())
}

async fn fetch_word(conn: &mut SqliteConnection, id: i64) -> Result<Option<Word>, AppError> {
    let row = sqlx::query(&format!("SELECT {} FROM words WHERE id = ?", WORD_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(word_from_row))
}

async fn fetch_settings(conn: &mut SqliteConnection) -> Result<Option<Settings>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM settings WHERE id = 1",
        SETTINGS_COLUMNS
    ))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.as_ref().map(settings_from_row))
}

/// Upsert the singleton settings row.
async fn write_settings(conn: &mut SqliteConnection, settings: &Settings) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO settings (id, per_page, layout, hide_meanings, selected_book_id, updated_at)
           VALUES (1, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
               per_page = excluded.per_page,
               layout = excluded.layout,
               hide_meanings = excluded.hide_meanings,
               selected_book_id = excluded.selected_book_id,
               updated_at = excluded.updated_at"#,
    )
    .bind(settings.per_page)
    .bind(settings.layout.as_str())
    .bind(settings.hide_meanings as i32)
    .bind(settings.selected_book_id)
    .bind(&settings.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// Helper functions for row conversion

fn word_from_row(row: &sqlx::sqlite::SqliteRow) -> Word {
    let learned: i32 = row.get("learned");
    Word {
        id: row.get("id"),
        term: row.get("term"),
        meaning: row.get("meaning"),
        learned: learned != 0,
        book_id: row.get("book_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn book_from_row(row: &sqlx::sqlite::SqliteRow) -> Book {
    let kind: String = row.get("type");
    let value: String = row.get("value");
    Book {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        kind: Language::parse(&kind).unwrap_or_default(),
        value: Language::parse(&value).unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn settings_from_row(row: &sqlx::sqlite::SqliteRow) -> Settings {
    let layout: Option<String> = row.get("layout");
    let hide_meanings: i32 = row.get("hide_meanings");
    Settings {
        per_page: row.get("per_page"),
        layout: layout
            .as_deref()
            .and_then(Layout::parse)
            .unwrap_or_default(),
        hide_meanings: hide_meanings != 0,
        selected_book_id: row.get("selected_book_id"),
        updated_at: row.get("updated_at"),
    }
}
