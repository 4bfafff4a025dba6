//! mplan-gen - Generation Orchestration Service
//!
//! Runs the external music/portrait generator on behalf of HTTP clients:
//! single-shot generations bounded by per-mode timeouts, async
//! four-candidate portrait batches, and a per-actor concurrency guard.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mplan_common::events::EventBus;
use mplan_gen::config::GeneratorConfig;
use mplan_gen::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting mplan-gen (Generation Orchestration) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve and prepare the root folder
    let root_folder = mplan_common::config::resolve_root_folder("MPLAN_ROOT_FOLDER");
    mplan_common::config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", root_folder.display());

    // Open or create the database
    let db_path = mplan_common::config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let db_pool = mplan_gen::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(100); // 100 event capacity
    info!("Event bus initialized");

    // Generator locations and portrait artifact area
    let config = GeneratorConfig::resolve(&root_folder);
    info!("Generator: {}", config.generate_program.display());
    info!("Portrait generator: {}", config.portrait_program.display());
    info!("Job slots: {}", config.job_slots);

    // Create application state
    let state = AppState::new(db_pool, event_bus, &config);

    // Build router
    let app = mplan_gen::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("127.0.0.1:5725").await?;
    info!("Listening on http://127.0.0.1:5725");
    info!("Health check: http://127.0.0.1:5725/health");

    axum::serve(listener, app).await?;

    Ok(())
}
