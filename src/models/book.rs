//! Book model: a named collection of words.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const DEFAULT_BOOK_COLOR: &str = "default";

/// Language of a book. Only English is supported for now.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

/// A user-created grouping of vocabulary words.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub color: String,
    #[serde(rename = "type")]
    pub kind: Language,
    pub value: Language,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a new book.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, rename = "type")]
    pub kind: Language,
    #[serde(default)]
    pub value: Language,
}

fn default_color() -> String {
    DEFAULT_BOOK_COLOR.to_string()
}

impl CreateBookRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: default_color(),
            kind: Language::En,
            value: Language::En,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        validate_color(&self.color)
    }
}

/// Request body for updating an existing book.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<Language>,
    #[serde(default)]
    pub value: Option<Language>,
}

impl UpdateBookRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(color) = &self.color {
            validate_color(color)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Book name is required".to_string()));
    }
    Ok(())
}

fn validate_color(color: &str) -> Result<(), AppError> {
    if color.trim().is_empty() {
        return Err(AppError::Validation("Book color must not be empty".to_string()));
    }
    Ok(())
}
