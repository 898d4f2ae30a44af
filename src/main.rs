mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod storage;

use axum::{routing::on, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::handlers::Route;
use crate::storage::{BlobStore, S3Storage};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub storage: Arc<dyn BlobStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting file service...");

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Configuration loaded");

    // Connects on the first request
    let db = Database::new(&config.database);

    let storage: Arc<dyn BlobStore> = Arc::new(S3Storage::new(&config.storage)?);

    let state = AppState { db, storage };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    // Browsers talk to the presigned URLs directly; the API itself is open
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router: Router<AppState> = Router::new();
    for route in Route::ALL {
        let filter = route.method_filter();
        let method_router = match route {
            Route::Get => on(filter, handlers::file::get_file),
            Route::List => on(filter, handlers::file::list_files),
            Route::Create => on(filter, handlers::file::create_file),
            Route::Delete => on(filter, handlers::file::delete_file),
        };
        // A known path with the wrong method is not an error either. HEAD is
        // named explicitly since axum would otherwise hand it to the GET handler.
        let method_router = method_router
            .head(handlers::file::fallback)
            .fallback(handlers::file::fallback);
        router = router.route(route.path(), method_router);
    }

    router
        .fallback(handlers::file::fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
