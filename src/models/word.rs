//! Word model: one vocabulary entry.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A term/meaning pair belonging to one book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: i64,
    pub term: String,
    pub meaning: String,
    pub learned: bool,
    pub book_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a new word.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWordRequest {
    pub term: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub learned: bool,
    pub book_id: i64,
}

impl CreateWordRequest {
    pub fn new(book_id: i64, term: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            meaning: meaning.into(),
            learned: false,
            book_id,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_term(&self.term)
    }
}

/// Request body for updating an existing word.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWordRequest {
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub learned: Option<bool>,
    #[serde(default)]
    pub book_id: Option<i64>,
}

impl UpdateWordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(term) = &self.term {
            validate_term(term)?;
        }
        Ok(())
    }
}

pub fn validate_term(term: &str) -> Result<(), AppError> {
    if term.trim().is_empty() {
        return Err(AppError::Validation("Term is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_word_defaults() {
        let request: CreateWordRequest =
            serde_json::from_str(r#"{"term": "Ambiguous", "bookId": 3}"#).unwrap();
        assert_eq!(request.meaning, "");
        assert!(!request.learned);
        assert_eq!(request.book_id, 3);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_blank_term_rejected() {
        let request = CreateWordRequest::new(1, " \t", "meaning");
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));

        let update = UpdateWordRequest {
            term: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_create_word_rejects_missing_book() {
        let result: Result<CreateWordRequest, _> = serde_json::from_str(r#"{"term": "Yield"}"#);
        assert!(result.is_err());
    }
}
