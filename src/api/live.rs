//! Server-sent event streams for live queries.
//!
//! Each stream sends a `snapshot` event with the current result right away
//! and again after every committed write to the tables it reads. `ping`
//! events keep idle connections open.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio::time::{interval_at, Instant};
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};

use super::WordsQuery;
use crate::errors::{AppError, ErrorDetails};
use crate::live::Table;
use crate::models::now_timestamp;
use crate::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

fn pings() -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    IntervalStream::new(interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL))
        .map(|_| Ok::<Event, Infallible>(Event::default().event("ping").data(now_timestamp())))
}

fn snapshot_event<T: Serialize>(result: Result<T, AppError>) -> Event {
    match result {
        Ok(data) => Event::default()
            .event("snapshot")
            .data(serde_json::to_string(&data).unwrap_or_else(|_| "null".to_string())),
        Err(e) => {
            let details = ErrorDetails {
                code: e.error_code().to_string(),
                message: e.message(),
            };
            Event::default()
                .event("error")
                .data(serde_json::to_string(&details).unwrap_or_else(|_| "{}".to_string()))
        }
    }
}

fn live_query<T, F, Fut>(
    state: &AppState,
    tables: &[Table],
    query: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static>
where
    T: Serialize + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, AppError>> + Send + 'static,
{
    let snapshots = state
        .repo
        .notifier()
        .watch(tables, query)
        .map(|result| Ok::<Event, Infallible>(snapshot_event(result)));

    Sse::new(stream::select(snapshots, pings()))
}

/// GET /api/live/books - Book list, re-sent on every book change.
pub async fn live_books(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let repo = state.repo.clone();
    live_query(&state, &[Table::Books], move || {
        let repo = repo.clone();
        async move { repo.list_books().await }
    })
}

/// GET /api/live/words - Word list (optionally one book's), re-sent on every word change.
pub async fn live_words(
    State(state): State<AppState>,
    Query(query): Query<WordsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let repo = state.repo.clone();
    let book_id = query.book_id;
    live_query(&state, &[Table::Words], move || {
        let repo = repo.clone();
        async move { repo.list_words(book_id).await }
    })
}

/// GET /api/live/settings - Settings, re-sent on every settings change.
pub async fn live_settings(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let repo = state.repo.clone();
    live_query(&state, &[Table::Settings], move || {
        let repo = repo.clone();
        async move { repo.settings_or_default().await }
    })
}

/// GET /api/live/changes - Raw table change events.
pub async fn live_changes(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let changes = BroadcastStream::new(state.repo.notifier().subscribe()).map(|msg| {
        let event = match msg {
            Ok(change) => Event::default()
                .event("change")
                .data(serde_json::to_string(&change).unwrap_or_else(|_| "{}".to_string())),
            Err(e) => {
                tracing::debug!("Change stream lagged: {}", e);
                Event::default().event("lagged").data(e.to_string())
            }
        };
        Ok::<Event, Infallible>(event)
    });

    Sse::new(stream::select(changes, pings()))
}
