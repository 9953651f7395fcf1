use std::sync::Arc;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting economy engine...");

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://economy.db".to_string());

    let db = economy_engine::db::init_db(&database_url).await?;
    info!("✓ Database connected");

    sqlx::migrate!("./migrations").run(&db).await?;
    info!("✓ Migrations applied");

    let engine = economy_engine::Engine::new(db).await?;

    let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());
    if admin_token.is_none() {
        warn!("ADMIN_TOKEN not set; admin routes are disabled");
    }

    let state = Arc::new(economy_engine::AppState::new(engine, admin_token));
    let app = economy_engine::app(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🚀 Economy engine listening on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
