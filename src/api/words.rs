//! Word API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateWordRequest, UpdateWordRequest, Word};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordsQuery {
    pub book_id: Option<i64>,
}

/// GET /api/words - List words, optionally for one book.
pub async fn list_words(
    State(state): State<AppState>,
    Query(query): Query<WordsQuery>,
) -> ApiResult<Vec<Word>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_words(query.book_id).await {
        Ok(words) => success(words, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/words/:id - Get a single word.
pub async fn get_word(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Word> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_word(id).await {
        Ok(Some(word)) => success(word, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Word {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/words - Add a word to a book.
pub async fn create_word(
    State(state): State<AppState>,
    Json(request): Json<CreateWordRequest>,
) -> ApiResult<Word> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_word(&request).await {
        Ok(word) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(word, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/words/:id - Update a word.
pub async fn update_word(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateWordRequest>,
) -> ApiResult<Word> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_word(id, &request).await {
        Ok(word) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(word, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/words/:id - Delete a word.
pub async fn delete_word(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_word(id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
