mod agent;
mod attachment;
mod docs;
mod errors;
mod extract;
mod models;
mod prompt;
mod routes;
mod service;
mod store;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::routes::api_routes::{
    chat_handler, delete_conversation_handler, list_conversations_handler, list_messages_handler,
    upload_document_handler, MAX_BODY_BYTES,
};
use crate::service::chat_service::ChatService;
use crate::store::memory::MemoryStore;
use crate::store::postgres::PgStore;
use crate::store::ConversationStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studypad=debug,tower_http=debug".into()),
        )
        .init();

    // ── Conversation store ────────────────────────────────────────────────────
    // With DATABASE_URL set conversations survive restarts; without it the
    // in-memory store is used and history lives for the process lifetime.
    let store: Arc<dyn ConversationStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&database_url)
                .await
                .expect("Failed to connect to PostgreSQL");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run database migrations");

            info!("Database connection established and migrations applied");
            Arc::new(PgStore::new(pool))
        }
        Err(_) => {
            info!("DATABASE_URL not set, using the in-memory conversation store");
            Arc::new(MemoryStore::new())
        }
    };

    // ── Model client ──────────────────────────────────────────────────────────
    let api_key = std::env::var("GEMINI_API_KEY")
        .expect("GEMINI_API_KEY must be set (copy .env.example to .env)");
    let base_url =
        std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

    let backend = Arc::new(GeminiClient::new(api_key, base_url, model));
    let chat_service = ChatService::new(store, backend);

    // ── Router ────────────────────────────────────────────────────────────────
    let app = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/documents", post(upload_document_handler))
        .route(
            "/api/conversations",
            get(list_conversations_handler).delete(delete_conversation_handler),
        )
        .route("/api/conversations/{id}/messages", get(list_messages_handler))
        // Above axum's 2 MB default so base64-encoded attachments reach the
        // attachment validator instead of dying with a bare 413.
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(chat_service);

    // ── Listen ────────────────────────────────────────────────────────────────
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
