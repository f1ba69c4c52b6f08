//! Storefront backend - main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use storefront_backend::{
    api::{self, routes},
    bot::BotWorker,
    config::Config,
    datastore::filesystem::FilesystemStore,
    error::Result,
    services::{
        catalog_service::CatalogService,
        notify_service::{NotificationChannel, NullChannel, TelegramChannel},
        order_service::OrderService,
    },
    storage::filesystem::FilesystemStorage,
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration, then initialize tracing
    let config = Config::from_env()?;
    telemetry::init_tracing(&config.log_level);
    tracing::info!("Starting storefront backend");

    // Collaborators: record store, asset storage, notification channel
    let store = Arc::new(FilesystemStore::new(&config.datastore_path));
    let storage = Arc::new(FilesystemStorage::new(&config.storage_path));
    let notifier: Arc<dyn NotificationChannel> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramChannel::new(token)),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, notifications disabled");
            Arc::new(NullChannel)
        }
    };

    // Core services
    let catalog = Arc::new(CatalogService::new(store.clone(), storage.clone()));
    let orders = Arc::new(OrderService::new(
        store,
        catalog.clone(),
        storage.clone(),
        notifier,
        config.admin_chat_id,
        config.public_base_url.clone(),
    ));

    // Reconcile the in-memory views from the record store
    let product_count = catalog.load_from_store().await?;
    let order_count = orders.load_from_store().await?;
    tracing::info!(product_count, order_count, "Loaded data from record store");

    // Spawn the Telegram bot worker
    if let Some(token) = &config.telegram_bot_token {
        BotWorker::new(token, orders.clone()).spawn();
    }

    // Build router
    let state = Arc::new(api::AppState::new(config.clone(), catalog, orders, storage));
    let app = routes::create_router(state);

    // Start server
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
