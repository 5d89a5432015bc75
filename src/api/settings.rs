//! Settings API endpoints.

use axum::{extract::State, Json};

use super::{error, success, ApiResult};
use crate::models::{SelectBookRequest, Settings, UpdateSettingsRequest};
use crate::AppState;

/// GET /api/settings - Current settings, or the defaults if none are stored.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Settings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.settings_or_default().await {
        Ok(settings) => success(settings, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/settings - Merge the given fields into the settings.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<Settings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_settings(&request).await {
        Ok(settings) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(settings, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/settings/selected-book - Remember (or forget) the open book.
pub async fn select_book(
    State(state): State<AppState>,
    Json(request): Json<SelectBookRequest>,
) -> ApiResult<Settings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.select_book(request.book_id).await {
        Ok(settings) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(settings, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
