//! Live queries over the store.
//!
//! The repository publishes a [`TableChange`] after every committed write.
//! A live query subscribes to the tables it reads and re-runs on each
//! relevant change, so its subscriber never sees stale data for long.

use std::future::Future;

use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::errors::AppError;

const CHANNEL_CAPACITY: usize = 256;

/// Tables a live query can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Words,
    Books,
    Settings,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Words, Table::Books, Table::Settings];
}

/// A committed write to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableChange {
    pub table: Table,
    pub revision_id: i64,
}

/// Fan-out of table change events to live queries.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<TableChange>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Announce committed writes. Having no subscribers is not an error.
    pub fn publish(&self, tables: &[Table], revision_id: i64) {
        for &table in tables {
            let delivered = self
                .sender
                .send(TableChange { table, revision_id })
                .unwrap_or(0);
            tracing::debug!(?table, revision_id, delivered, "Published table change");
        }
    }

    /// Raw change events, for callers that only need to know something moved.
    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.sender.subscribe()
    }

    /// Run `query` now and again after every change to one of `tables`.
    ///
    /// The subscription is taken before the first run, so a write that lands
    /// while the initial query is executing still triggers a re-run. A lagged
    /// receiver re-runs too: some change was missed, whichever it was.
    pub fn watch<T, F, Fut>(
        &self,
        tables: &[Table],
        query: F,
    ) -> impl Stream<Item = Result<T, AppError>> + Send + 'static
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let tables = tables.to_vec();
        let changes = BroadcastStream::new(self.sender.subscribe()).filter_map(move |msg| {
            let relevant = match msg {
                Ok(change) => tables.contains(&change.table),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Live query lagged, re-running");
                    true
                }
            };
            async move { relevant.then_some(()) }
        });

        stream::once(async {})
            .chain(changes)
            .then(move |()| query())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_watch_emits_initial_result_then_reruns() {
        let notifier = ChangeNotifier::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let stream = notifier.watch(&[Table::Words], move || {
            let counter = counter.clone();
            async move { Ok::<usize, AppError>(counter.fetch_add(1, Ordering::SeqCst) + 1) }
        });
        tokio::pin!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);

        notifier.publish(&[Table::Words], 1);
        assert_eq!(stream.next().await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_watch_ignores_other_tables() {
        let notifier = ChangeNotifier::new();
        let stream = notifier.watch(&[Table::Settings], || async { Ok::<_, AppError>(()) });
        tokio::pin!(stream);

        stream.next().await.unwrap().unwrap();

        notifier.publish(&[Table::Words, Table::Books], 3);
        let next = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(next.is_err(), "query re-ran for an unrelated table");

        notifier.publish(&[Table::Settings], 4);
        let next = tokio::time::timeout(Duration::from_millis(500), stream.next()).await;
        assert!(next.is_ok());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let notifier = ChangeNotifier::new();
        notifier.publish(&Table::ALL, 1);

        let mut rx = notifier.subscribe();
        notifier.publish(&[Table::Books], 2);
        let change = rx.recv().await.unwrap();
        assert_eq!(
            change,
            TableChange {
                table: Table::Books,
                revision_id: 2
            }
        );
    }
}
