use std::sync::Arc;

use lingchat_ai::OpenAiClient;
use lingchat_core::{DbMemoryStore, MemoryConfig, MemoryStore, VolatileStore};
use lingchat_migration::{Migrator, MigratorTrait};
use lingchat_server::{server, utils::AppState};
use lingchat_shared::{APP_ENV, AppError};
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .with(tracing_error::ErrorLayer::default())
    .init();

  let store: Arc<dyn MemoryStore> = match APP_ENV.database_url.as_deref() {
    Some(url) => {
      let db = Database::connect(url).await?;
      // Apply all pending migrations
      // https://www.sea-ql.org/SeaORM/docs/migration/running-migration/#migrating-programmatically
      Migrator::up(&db, None).await?;
      tracing::info!("durable memory enabled");
      Arc::new(DbMemoryStore::new(db))
    }
    None => {
      tracing::info!("DATABASE_URL not set, memory is kept in process only");
      Arc::new(VolatileStore)
    }
  };

  let config = MemoryConfig::from_env();
  tracing::debug!(
    update_interval = config.update_interval,
    recent_window = config.recent_window,
    "memory config loaded"
  );

  server(AppState::new(OpenAiClient::from_env(), store, config)).await
}
