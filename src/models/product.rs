//! Product model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Product status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Listed in the catalog and orderable
    Available,
    /// Reserved by an in-flight order
    Pending,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Pending => "pending",
        }
    }
}

/// How the purchased asset is delivered. The two modes are mutually
/// exclusive: a product carries exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryMode {
    /// A stored file included verbatim in the delivery bundle
    File {
        /// Asset storage key
        key: String,
        /// Original filename, used as the archive entry name
        filename: String,
    },
    /// A website link rendered into generated instructions
    WebsiteLink {
        url: String,
        /// Days until the linked access expires
        expiration_days: u32,
    },
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// Unique URL-safe identifier derived from the name
    pub slug: String,
    pub name: String,
    /// Display price in USD, snapshotted onto orders at order time
    pub price: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub description: String,
    pub status: ProductStatus,
    /// Bonus lines enumerated in the delivery bundle, one per entry
    pub bonus_freebies: Vec<String>,
    /// Asset storage key of the product image
    pub image_key: String,
    pub delivery: DeliveryMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
