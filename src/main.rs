// src/main.rs

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use riposte::api::router;
use riposte::chat::{ChatService, ChatStore};
use riposte::config::Config;
use riposte::llm::OpenAiGateway;
use riposte::persona::Persona;
use riposte::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env()?;
    info!("Starting riposte");
    info!("Model: {} via {}", config.llm.model, config.llm.base_url);

    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    let store = ChatStore::new(pool);
    store.init_schema().await?;

    let gateway = Arc::new(OpenAiGateway::new(config.llm.clone()));
    let service = Arc::new(ChatService::new(
        store,
        gateway,
        Persona::debate(),
        config.history_limit,
    ));

    let app = router(AppState { service });
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
