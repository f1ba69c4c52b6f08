//! Business logic services.

pub mod auth_service;
pub mod catalog_service;
pub mod claim_registry;
pub mod delivery_service;
pub mod notify_service;
pub mod order_service;
pub mod rates_service;
