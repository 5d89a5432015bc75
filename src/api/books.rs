//! Book API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::db::BookDeletion;
use crate::errors::AppError;
use crate::models::{Book, CreateBookRequest, UpdateBookRequest, Word};
use crate::pagination::Page;
use crate::AppState;

/// Query parameters for a page of words.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: usize,
    pub per_page: Option<i64>,
}

fn first_page() -> usize {
    1
}

/// GET /api/books - List all books, newest first.
pub async fn list_books(State(state): State<AppState>) -> ApiResult<Vec<Book>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_books().await {
        Ok(books) => success(books, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/books/:id - Get a single book.
pub async fn get_book(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Book> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_book(id).await {
        Ok(Some(book)) => success(book, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Book {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/books - Create a new book.
pub async fn create_book(
    State(state): State<AppState>,
    Json(request): Json<CreateBookRequest>,
) -> ApiResult<Book> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_book(&request).await {
        Ok(book) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(book, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/books/:id - Update a book.
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateBookRequest>,
) -> ApiResult<Book> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_book(id, &request).await {
        Ok(book) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(book, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/books/:id - Delete a book and every word in it.
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<BookDeletion> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_book(id).await {
        Ok(deletion) => {
            let stopped = state.quizzes.stop_for_book(id).await;
            if stopped > 0 {
                tracing::debug!(book_id = id, stopped, "Stopped quizzes over deleted book");
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(deletion, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/books/:id/words - One page of a book's words.
pub async fn list_book_words(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<Word>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state
        .repo
        .list_words_page(id, query.page, query.per_page)
        .await
    {
        Ok(page) => success(page, revision_id),
        Err(e) => error(e, revision_id),
    }
}
