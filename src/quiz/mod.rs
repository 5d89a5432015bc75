//! Flash-card quiz over a book's words.
//!
//! A session draws words in random order without replacement. Stepping back
//! replays words already shown; stepping forward past the end of the history
//! draws a fresh one.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Word;

/// One pass over a fixed set of items.
#[derive(Debug)]
pub struct QuizSession<T> {
    remaining: Vec<T>,
    shown: Vec<T>,
    cursor: usize,
    rng: StdRng,
}

impl<T> QuizSession<T> {
    /// Start a session by drawing the first item. `None` when there is nothing to quiz.
    pub fn start(items: Vec<T>, mut rng: StdRng) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        let mut remaining = items;
        let first = draw(&mut remaining, &mut rng);
        Some(Self {
            remaining,
            shown: vec![first],
            cursor: 0,
            rng,
        })
    }

    /// Move forward, replaying history before drawing. Returns whether the cursor moved.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.shown.len() {
            self.cursor += 1;
            return true;
        }
        if self.remaining.is_empty() {
            return false;
        }
        let item = draw(&mut self.remaining, &mut self.rng);
        self.shown.push(item);
        self.cursor += 1;
        true
    }

    /// Step back through items already shown.
    pub fn previous(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn current(&self) -> &T {
        &self.shown[self.cursor]
    }

    pub fn position(&self) -> usize {
        self.cursor + 1
    }

    pub fn is_first(&self) -> bool {
        self.cursor == 0
    }

    /// At the newest shown item with nothing left to draw.
    pub fn is_last(&self) -> bool {
        self.cursor + 1 == self.shown.len() && self.remaining.is_empty()
    }

    pub fn seen(&self) -> usize {
        self.shown.len()
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn total(&self) -> usize {
        self.shown.len() + self.remaining.len()
    }
}

fn draw<T>(items: &mut Vec<T>, rng: &mut StdRng) -> T {
    let idx = rng.gen_range(0..items.len());
    items.swap_remove(idx)
}

/// Fewest words a quiz can run over.
pub const MIN_QUIZ_WORDS: usize = 2;

/// Sessions untouched for this long are dropped when the next quiz starts.
pub const QUIZ_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

struct ActiveQuiz {
    book_id: i64,
    session: QuizSession<Word>,
    last_touched: Instant,
}

/// Client-facing state of a quiz session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub session_id: Uuid,
    pub book_id: i64,
    pub word: Word,
    pub position: usize,
    pub seen: usize,
    pub remaining: usize,
    pub total: usize,
    pub is_first: bool,
    pub is_last: bool,
}

impl QuizView {
    fn of(session_id: Uuid, quiz: &ActiveQuiz) -> Self {
        let session = &quiz.session;
        Self {
            session_id,
            book_id: quiz.book_id,
            word: session.current().clone(),
            position: session.position(),
            seen: session.seen(),
            remaining: session.remaining(),
            total: session.total(),
            is_first: session.is_first(),
            is_last: session.is_last(),
        }
    }
}

/// In-memory quiz sessions keyed by id.
pub struct QuizRegistry {
    sessions: RwLock<HashMap<Uuid, ActiveQuiz>>,
    idle_timeout: Duration,
}

impl Default for QuizRegistry {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: QUIZ_IDLE_TIMEOUT,
        }
    }
}

impl QuizRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Start a quiz over `words`. Needs at least [`MIN_QUIZ_WORDS`] words.
    pub async fn start(&self, book_id: i64, words: Vec<Word>) -> Result<QuizView, AppError> {
        if words.len() < MIN_QUIZ_WORDS {
            return Err(AppError::Validation(format!(
                "You need at least {} words to start a quiz",
                MIN_QUIZ_WORDS
            )));
        }
        let session = QuizSession::start(words, StdRng::from_entropy()).ok_or_else(|| {
            AppError::Validation(format!("Book {} has no words to quiz", book_id))
        })?;

        let id = Uuid::new_v4();
        let quiz = ActiveQuiz {
            book_id,
            session,
            last_touched: Instant::now(),
        };
        let view = QuizView::of(id, &quiz);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, quiz| quiz.last_touched.elapsed() < self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Dropped idle quiz sessions");
        }
        sessions.insert(id, quiz);

        tracing::debug!(session_id = %id, book_id, total = view.total, "Started quiz");
        Ok(view)
    }

    pub async fn get(&self, id: Uuid) -> Result<QuizView, AppError> {
        self.with_session(id, |_| {}).await
    }

    pub async fn next(&self, id: Uuid) -> Result<QuizView, AppError> {
        self.with_session(id, |session| {
            session.next();
        })
        .await
    }

    pub async fn previous(&self, id: Uuid) -> Result<QuizView, AppError> {
        self.with_session(id, |session| {
            session.previous();
        })
        .await
    }

    async fn with_session<F>(&self, id: Uuid, step: F) -> Result<QuizView, AppError>
    where
        F: FnOnce(&mut QuizSession<Word>),
    {
        let mut sessions = self.sessions.write().await;
        let quiz = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        step(&mut quiz.session);
        quiz.last_touched = Instant::now();
        Ok(QuizView::of(id, quiz))
    }

    /// End a session.
    pub async fn stop(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    /// Drop every session over `book_id`, e.g. after the book is deleted.
    pub async fn stop_for_book(&self, book_id: i64) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, quiz| quiz.book_id != book_id);
        before - sessions.len()
    }

    /// Drop every session, e.g. after an import or reset.
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Quiz session {} not found", id))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn session(n: u32, seed: u64) -> QuizSession<u32> {
        QuizSession::start((0..n).collect(), StdRng::seed_from_u64(seed)).unwrap()
    }

    fn word(id: i64, term: &str) -> Word {
        Word {
            id,
            term: term.to_string(),
            meaning: String::new(),
            learned: false,
            book_id: 1,
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_empty_items_start_nothing() {
        assert!(QuizSession::<u32>::start(Vec::new(), StdRng::seed_from_u64(1)).is_none());
    }

    #[test]
    fn test_visits_every_item_exactly_once() {
        for seed in 0..20 {
            let mut quiz = session(12, seed);
            let mut visited = vec![*quiz.current()];
            while quiz.next() {
                visited.push(*quiz.current());
            }

            assert_eq!(visited.len(), 12);
            let unique: HashSet<u32> = visited.iter().copied().collect();
            assert_eq!(unique.len(), 12);
            assert!(quiz.is_last());
            assert_eq!(quiz.remaining(), 0);
            assert!(!quiz.next());
        }
    }

    #[test]
    fn test_previous_replays_without_drawing() {
        let mut quiz = session(5, 7);
        assert!(quiz.is_first());
        assert!(!quiz.previous());

        let first = *quiz.current();
        quiz.next();
        let second = *quiz.current();
        quiz.next();
        assert_eq!(quiz.seen(), 3);

        assert!(quiz.previous());
        assert_eq!(*quiz.current(), second);
        assert!(quiz.previous());
        assert_eq!(*quiz.current(), first);

        // Forward again replays history before drawing anything new.
        quiz.next();
        assert_eq!(*quiz.current(), second);
        assert_eq!(quiz.seen(), 3);
        assert_eq!(quiz.remaining(), 2);
        assert_eq!(quiz.total(), 5);
    }

    #[test]
    fn test_single_item_is_first_and_last() {
        let quiz = session(1, 3);
        assert!(quiz.is_first());
        assert!(quiz.is_last());
        assert_eq!(quiz.position(), 1);
    }

    #[tokio::test]
    async fn test_registry_lifecycle() {
        let registry = QuizRegistry::new();
        let err = registry.start(1, Vec::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let view = registry
            .start(1, vec![word(1, "alpha"), word(2, "beta")])
            .await
            .unwrap();
        assert_eq!(view.total, 2);
        assert!(view.is_first);

        let next = registry.next(view.session_id).await.unwrap();
        assert_eq!(next.position, 2);
        assert!(next.is_last);
        assert_ne!(next.word.id, view.word.id);

        let back = registry.previous(view.session_id).await.unwrap();
        assert_eq!(back.word.id, view.word.id);

        registry.stop(view.session_id).await.unwrap();
        let err = registry.get(view.session_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_single_word_cannot_start_quiz() {
        let registry = QuizRegistry::new();
        let err = registry.start(1, vec![word(1, "alone")]).await.unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("at least 2 words")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(registry.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_for_book() {
        let registry = QuizRegistry::new();
        let kept = registry
            .start(1, vec![word(1, "one"), word(2, "two")])
            .await
            .unwrap();
        let mut others = vec![word(3, "three"), word(4, "four")];
        for other in &mut others {
            other.book_id = 2;
        }
        let dropped = registry.start(2, others).await.unwrap();

        assert_eq!(registry.stop_for_book(2).await, 1);
        assert!(registry.get(kept.session_id).await.is_ok());
        assert!(registry.get(dropped.session_id).await.is_err());
    }

    #[tokio::test]
    async fn test_idle_sessions_dropped_on_start() {
        let registry = QuizRegistry::new().with_idle_timeout(Duration::ZERO);
        let stale = registry
            .start(1, vec![word(1, "alpha"), word(2, "beta")])
            .await
            .unwrap();
        let fresh = registry
            .start(1, vec![word(1, "alpha"), word(2, "beta")])
            .await
            .unwrap();

        let err = registry.get(stale.session_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(registry.get(fresh.session_id).await.is_ok());
        assert_eq!(registry.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_active_sessions_survive_start() {
        let registry = QuizRegistry::new();
        let first = registry
            .start(1, vec![word(1, "alpha"), word(2, "beta")])
            .await
            .unwrap();
        registry
            .start(1, vec![word(1, "alpha"), word(2, "beta")])
            .await
            .unwrap();

        assert!(registry.next(first.session_id).await.is_ok());
        assert_eq!(registry.sessions.read().await.len(), 2);
    }
}
