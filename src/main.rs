// src/main.rs

use std::{sync::Arc, time::Duration};

use placement_engine::{
    config::Config,
    placement::completion::{OpenAiCompletion, TextCompletion},
    repository::{
        CourseCatalog, PlacementRepository,
        memory::{MemoryCatalog, MemoryStore},
        postgres::PgStore,
    },
    routes,
    state::AppState,
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Storage: Postgres when configured, otherwise in-memory
    let (catalog, placements): (Arc<dyn CourseCatalog>, Arc<dyn PlacementRepository>) =
        match &config.database_url {
            Some(database_url) => {
                let pool = connect_with_retry(database_url).await?;

                tracing::info!("Running migrations...");
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Migrations applied successfully.");

                let store = Arc::new(PgStore::new(pool));
                let catalog: Arc<dyn CourseCatalog> = store.clone();
                let placements: Arc<dyn PlacementRepository> = store;
                (catalog, placements)
            }
            None => {
                let catalog = MemoryCatalog::from_file(&config.course_catalog_path)
                    .unwrap_or_else(|e| {
                        tracing::warn!("{}; starting with an empty catalog", e);
                        MemoryCatalog::default()
                    });
                tracing::warn!(
                    "DATABASE_URL not set; using in-memory storage with {} courses",
                    catalog.len()
                );
                let catalog: Arc<dyn CourseCatalog> = Arc::new(catalog);
                let placements: Arc<dyn PlacementRepository> = Arc::new(MemoryStore::new());
                (catalog, placements)
            }
        };

    // Optional text completion for learning path descriptions
    let completion: Option<Arc<dyn TextCompletion>> = match &config.completion {
        Some(completion_config) => {
            let timeout = Duration::from_millis(config.completion_timeout_ms);
            match OpenAiCompletion::new(completion_config, timeout) {
                Ok(client) => {
                    tracing::info!("Text completion enabled at {}", client.endpoint());
                    let client: Arc<dyn TextCompletion> = Arc::new(client);
                    Some(client)
                }
                Err(e) => {
                    tracing::warn!("{}; using template descriptions", e);
                    None
                }
            }
        }
        None => None,
    };

    let addr = config.bind_addr;
    let state = AppState::new(config, catalog, placements, completion);

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connects to Postgres, retrying while the database starts up.
async fn connect_with_retry(database_url: &str) -> Result<PgPool, BoxError> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                tracing::info!("Database connected...");
                return Ok(pool);
            }
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    return Err(format!(
                        "Failed to connect to database after 5 retries: {}",
                        e
                    )
                    .into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}
