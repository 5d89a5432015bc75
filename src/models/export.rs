//! Backup document written by export and read by import.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{validate_per_page, validate_term, Book, Language, Layout, Settings, Word};
use crate::errors::AppError;

/// Full-state backup of the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub words: Vec<Word>,
    pub settings: Settings,
    pub books: Vec<Book>,
}

/// A word as it appears in an import document. Any `id` is dropped on parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportWord {
    pub term: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub learned: bool,
    pub book_id: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A book as it appears in an import document. Its `id` only links words.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBook {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_book_color")]
    pub color: String,
    #[serde(default, rename = "type")]
    pub kind: Language,
    #[serde(default)]
    pub value: Language,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_book_color() -> String {
    super::DEFAULT_BOOK_COLOR.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    pub per_page: i64,
    /// Exports older than the layout option carry none.
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub hide_meanings: Option<bool>,
    #[serde(default)]
    pub selected_book_id: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Settings are a single object now; older exports wrapped them in an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SettingsPayload {
    Single(ImportSettings),
    Legacy(Vec<ImportSettings>),
}

/// Document accepted by import.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    pub words: Vec<ImportWord>,
    pub settings: SettingsPayload,
    #[serde(default)]
    pub books: Option<Vec<ImportBook>>,
}

impl ImportDocument {
    /// Parse a raw JSON backup.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Validation(format!("Invalid import document: {}", e)))
    }

    /// The settings object, whichever shape the document used.
    pub fn settings(&self) -> Result<&ImportSettings, AppError> {
        match &self.settings {
            SettingsPayload::Single(settings) => Ok(settings),
            SettingsPayload::Legacy(list) => list.first().ok_or_else(|| {
                AppError::Validation("Import document has an empty settings list".to_string())
            }),
        }
    }

    /// Check the whole document before anything destructive happens.
    ///
    /// `live_book_ids` is consulted only when the document carries no books.
    pub fn validate(&self, live_book_ids: &HashSet<i64>) -> Result<(), AppError> {
        let settings = self.settings()?;
        validate_per_page(settings.per_page)?;
        parse_timestamp(settings.updated_at.as_deref())?;

        let known_books: HashSet<i64> = match &self.books {
            Some(books) => {
                let mut ids = HashSet::with_capacity(books.len());
                for book in books {
                    if book.name.trim().is_empty() {
                        return Err(AppError::Validation(format!(
                            "Imported book {} has no name",
                            book.id
                        )));
                    }
                    if !ids.insert(book.id) {
                        return Err(AppError::Validation(format!(
                            "Imported book id {} appears more than once",
                            book.id
                        )));
                    }
                    parse_timestamp(book.created_at.as_deref())?;
                }
                ids
            }
            None => live_book_ids.clone(),
        };

        for (idx, word) in self.words.iter().enumerate() {
            validate_term(&word.term).map_err(|_| {
                AppError::Validation(format!("Imported word #{} has an empty term", idx + 1))
            })?;
            if !known_books.contains(&word.book_id) {
                return Err(AppError::Validation(format!(
                    "Imported word '{}' references unknown book {}",
                    word.term, word.book_id
                )));
            }
            parse_timestamp(word.created_at.as_deref())?;
            parse_timestamp(word.updated_at.as_deref())?;
        }

        Ok(())
    }

    /// Words ordered oldest first, so fresh ids follow the original creation order.
    pub fn words_in_creation_order(&self) -> Vec<&ImportWord> {
        creation_order(&self.words, |w| w.created_at.as_deref())
    }

    /// Books ordered oldest first; empty when the document carries no books.
    pub fn books_in_creation_order(&self) -> Vec<&ImportBook> {
        match &self.books {
            Some(books) => creation_order(books, |b| b.created_at.as_deref()),
            None => Vec::new(),
        }
    }
}

/// Sort oldest first. Exports list newest first, so undated items and ties
/// fall back to reversed document order.
fn creation_order<'a, T>(items: &'a [T], created_at: impl Fn(&T) -> Option<&str>) -> Vec<&'a T> {
    let mut keyed: Vec<(usize, Option<DateTime<Utc>>, &T)> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let created = parse_timestamp(created_at(item)).ok().flatten();
            (idx, created, item)
        })
        .collect();
    keyed.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => x.cmp(&y).then(b.0.cmp(&a.0)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.0.cmp(&a.0),
    });
    keyed.into_iter().map(|(_, _, item)| item).collect()
}

fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    match value {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| AppError::Validation(format!("Invalid timestamp '{}'", s))),
    }
}
