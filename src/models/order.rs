//! Order model and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Order lifecycle status.
///
/// Transitions are monotonic and one-directional:
/// `unpaid -> pending -> approved -> completed`. Any edge not in the
/// transition table is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, waiting for a payment receipt
    Unpaid,
    /// Receipt uploaded, waiting for admin review
    Pending,
    /// Approved by an admin; download token minted
    Approved,
    /// Bundle fetched at least once. Terminal.
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unpaid => "unpaid",
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Completed => "completed",
        }
    }

    /// Transition table. Everything not listed here is a rejected edge.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Unpaid, OrderStatus::Pending)
                | (OrderStatus::Pending, OrderStatus::Approved)
                | (OrderStatus::Approved, OrderStatus::Completed)
        )
    }
}

/// Order entity.
///
/// Orders are never deleted; completed orders are retained as history and,
/// when flagged, shown on the public proof wall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Not enforced by the datastore; resolved defensively on use
    pub product_id: Uuid,
    /// Name snapshot taken at order time
    pub product_name: String,
    /// Price snapshot taken at order time
    pub price: String,
    pub payment_method: String,
    pub status: OrderStatus,
    /// Asset storage key of the uploaded receipt, set on submission
    pub receipt_key: Option<String>,
    /// Telegram chat linked via the claim code
    pub buyer_chat_id: Option<i64>,
    pub buyer_username: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Completed orders with this flag appear on the proof wall
    pub is_proof: bool,
    /// Human-typeable code pairing this order with a chat identity
    pub claim_code: String,
    /// Bearer credential gating bundle retrieval; minted at approval.
    /// Carries no expiry — an intentional simplification, not a bug.
    pub download_token: Option<String>,
}
