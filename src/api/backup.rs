//! Export, import and reset endpoints.

use axum::extract::State;

use super::{error, success, ApiResult};
use crate::db::ImportSummary;
use crate::errors::AppErrorWithRevision;
use crate::models::{ExportDocument, ImportDocument, RevisionInfo};
use crate::AppState;

/// GET /api/export - Full backup of the store.
pub async fn export_data(State(state): State<AppState>) -> ApiResult<ExportDocument> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.export_data().await {
        Ok(document) => success(document, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/import - Replace the store with a backup document.
///
/// The body is parsed by hand so a malformed document reports a validation
/// error in the usual envelope.
pub async fn import_data(State(state): State<AppState>, body: String) -> ApiResult<ImportSummary> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let document = match ImportDocument::from_json(&body) {
        Ok(document) => document,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.import_data(&document).await {
        Ok(summary) => {
            state.quizzes.clear().await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(summary, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/reset - Wipe everything and reseed.
pub async fn reset(State(state): State<AppState>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.reset().await {
        Ok(()) => {
            state.quizzes.clear().await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/revision - Get the current revision info.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_info = state
        .repo
        .get_revision_info()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
        })?;

    success(revision_info.clone(), revision_info.revision_id)
}
