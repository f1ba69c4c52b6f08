//! API module - HTTP handlers and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use std::sync::Arc;

use crate::config::Config;
use crate::services::auth_service::AuthService;
use crate::services::catalog_service::CatalogService;
use crate::services::order_service::OrderService;
use crate::services::rates_service::RatesService;
use crate::storage::StorageBackend;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub storage: Arc<dyn StorageBackend>,
    pub rates: Arc<RatesService>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<CatalogService>,
        orders: Arc<OrderService>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        let rates = Arc::new(RatesService::new(
            config.currency_endpoint.clone(),
            config.currency_fallback_rate,
        ));
        let auth = Arc::new(AuthService::new(
            config.admin_password.clone(),
            &config.jwt_secret,
        ));
        Self {
            config,
            catalog,
            orders,
            storage,
            rates,
            auth,
        }
    }
}

pub type SharedState = Arc<AppState>;
