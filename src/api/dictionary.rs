//! Dictionary lookup endpoint.

use axum::extract::{Path, State};

use super::{error, success, ApiResult};
use crate::dictionary::Lookup;
use crate::AppState;

/// GET /api/dictionary/:term - Fetch and format a word's definitions.
pub async fn lookup_word(State(state): State<AppState>, Path(term): Path<String>) -> ApiResult<Lookup> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.dictionary.lookup(&term).await {
        Ok(lookup) => success(lookup, revision_id),
        Err(e) => error(e, revision_id),
    }
}
