//! Quiz API endpoints.

use axum::extract::{Path, State};
use uuid::Uuid;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::quiz::QuizView;
use crate::AppState;

/// POST /api/books/:id/quiz - Start a quiz over a book's words.
pub async fn start_quiz(State(state): State<AppState>, Path(book_id): Path<i64>) -> ApiResult<QuizView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_book(book_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Book {} not found", book_id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    let words = match state.repo.list_words(Some(book_id)).await {
        Ok(words) => words,
        Err(e) => return error(e, revision_id),
    };

    match state.quizzes.start(book_id, words).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/quiz/:id - Current state of a quiz.
pub async fn get_quiz(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<QuizView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.quizzes.get(id).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/quiz/:id/next - Show the next word.
pub async fn next_quiz_word(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuizView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.quizzes.next(id).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/quiz/:id/previous - Show the previous word.
pub async fn previous_quiz_word(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuizView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.quizzes.previous(id).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/quiz/:id - Stop a quiz.
pub async fn stop_quiz(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.quizzes.stop(id).await {
        Ok(()) => success((), revision_id),
        Err(e) => error(e, revision_id),
    }
}
