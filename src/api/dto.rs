//! Shared request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{DeliveryMode, Order, OrderStatus, Product, ProductStatus};

/// Public product listing entry. Delivery details (file keys, link
/// targets) are deliberately absent: they are the paid content.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub description: String,
    pub status: ProductStatus,
    /// URL path serving the product image
    pub image_url: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            slug: product.slug,
            name: product.name,
            price: product.price,
            category: product.category,
            sub_category: product.sub_category,
            description: product.description,
            status: product.status,
            image_url: format!("/files/{}", product.image_key),
        }
    }
}

/// Admin product view, including delivery configuration
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminProductResponse {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub description: String,
    pub status: ProductStatus,
    pub bonus_freebies: Vec<String>,
    pub image_url: String,
    pub delivery: DeliveryMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for AdminProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            slug: product.slug,
            name: product.name,
            price: product.price,
            category: product.category,
            sub_category: product.sub_category,
            description: product.description,
            status: product.status,
            bonus_freebies: product.bonus_freebies,
            image_url: format!("/files/{}", product.image_key),
            delivery: product.delivery,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Order status view shown to the buyer
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub product_name: String,
    pub price: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub claim_code: String,
    pub receipt_uploaded: bool,
    pub created_at: DateTime<Utc>,
    /// Download path, present once the order is approved
    pub download_url: Option<String>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            product_name: order.product_name,
            price: order.price,
            payment_method: order.payment_method,
            status: order.status,
            claim_code: order.claim_code,
            receipt_uploaded: order.receipt_key.is_some(),
            created_at: order.created_at,
            download_url: order.download_token.map(|t| format!("/download/{t}")),
        }
    }
}

/// Admin order view
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub claim_code: String,
    pub receipt_url: Option<String>,
    pub buyer_chat_id: Option<i64>,
    pub buyer_username: Option<String>,
    pub is_proof: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for AdminOrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            product_id: order.product_id,
            product_name: order.product_name,
            price: order.price,
            payment_method: order.payment_method,
            status: order.status,
            claim_code: order.claim_code,
            receipt_url: order.receipt_key.map(|k| format!("/files/{k}")),
            buyer_chat_id: order.buyer_chat_id,
            buyer_username: order.buyer_username,
            is_proof: order.is_proof,
            created_at: order.created_at,
        }
    }
}

/// Proof wall entry
#[derive(Debug, Serialize, ToSchema)]
pub struct ProofResponse {
    pub product_name: String,
    pub receipt_url: String,
    pub created_at: DateTime<Utc>,
}

/// Request to create an order
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub payment_method: String,
}

/// Response to a created order
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
    pub claim_code: String,
    pub status: OrderStatus,
}

/// Request to approve a pending order
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApproveOrderRequest {
    /// Show this order on the public proof wall once completed
    #[serde(default)]
    pub mark_as_proof: bool,
}

/// Admin login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub password: String,
}

/// Admin login response
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Payment reference numbers shown alongside an order
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDetails {
    pub gcash: Option<String>,
    pub paymaya: Option<String>,
}

/// Order status page payload: the order plus everything the buyer needs
/// to pay and claim it
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatusResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub payment_details: PaymentDetails,
    /// USD to PHP display rate
    pub php_rate: f64,
}
