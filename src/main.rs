//! Word Book Backend
//!
//! Local store for a vocabulary notebook: books of words, settings, live
//! queries over server-sent events, a quiz mode and dictionary lookups.

mod api;
mod config;
mod db;
mod dictionary;
mod errors;
mod live;
mod models;
mod pagination;
mod quiz;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use dictionary::DictionaryClient;
use live::ChangeNotifier;
use quiz::QuizRegistry;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub quizzes: Arc<QuizRegistry>,
    pub dictionary: Arc<DictionaryClient>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!("Starting Word Book Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Dictionary service: {}", config.dictionary_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path, config.seed_words).await?;
    let repo = Arc::new(
        Repository::new(pool, ChangeNotifier::new()).with_seed_words(config.seed_words),
    );

    let info = repo.get_revision_info().await?;
    tracing::info!(
        revision_id = info.revision_id,
        schema_version = info.schema_version,
        "Store ready"
    );

    // Create application state
    let state = AppState {
        repo,
        quizzes: Arc::new(QuizRegistry::new()),
        dictionary: Arc::new(DictionaryClient::new(config.dictionary_url.clone())),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Books
        .route("/books", get(api::list_books).post(api::create_book))
        .route(
            "/books/{id}",
            get(api::get_book)
                .put(api::update_book)
                .delete(api::delete_book),
        )
        .route("/books/{id}/words", get(api::list_book_words))
        .route("/books/{id}/quiz", post(api::start_quiz))
        // Words
        .route("/words", get(api::list_words).post(api::create_word))
        .route(
            "/words/{id}",
            get(api::get_word)
                .put(api::update_word)
                .delete(api::delete_word),
        )
        // Settings
        .route("/settings", get(api::get_settings).put(api::update_settings))
        .route("/settings/selected-book", put(api::select_book))
        // Backup
        .route("/export", get(api::export_data))
        .route("/import", post(api::import_data))
        .route("/reset", post(api::reset))
        .route("/revision", get(api::get_revision))
        // Quiz
        .route("/quiz/{id}", get(api::get_quiz).delete(api::stop_quiz))
        .route("/quiz/{id}/next", post(api::next_quiz_word))
        .route("/quiz/{id}/previous", post(api::previous_quiz_word))
        // Dictionary
        .route("/dictionary/{term}", get(api::lookup_word))
        // Live queries
        .route("/live/books", get(api::live_books))
        .route("/live/words", get(api::live_words))
        .route("/live/settings", get(api::live_settings))
        .route("/live/changes", get(api::live_changes));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
