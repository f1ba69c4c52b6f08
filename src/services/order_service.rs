//! Order ledger.
//!
//! Owns the order lifecycle state machine
//! (`unpaid -> pending -> approved -> completed`), the claim-code and
//! download-token secondary indexes, and the side effects each transition
//! carries: product reservation, receipt intake, bundle packaging and
//! best-effort notifications.
//!
//! Every transition holds the ledger's write lock across the write-through
//! store call and the in-memory update, so a guard check and its commit are
//! one atomic step: two requests racing to apply the same transition get
//! exactly one success and one `InvalidState`.

use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::datastore::{RecordStore, ORDERS_BUCKET};
use crate::error::{AppError, Result};
use crate::models::{Order, OrderStatus, ProductStatus};
use crate::services::catalog_service::CatalogService;
use crate::services::claim_registry::ClaimRegistry;
use crate::services::delivery_service::DeliveryPackager;
use crate::services::notify_service::{send_best_effort, NotificationChannel};
use crate::storage::{sanitize_filename, StorageBackend};

struct LedgerInner {
    orders: HashMap<Uuid, Order>,
    claims: ClaimRegistry,
    tokens: HashMap<String, Uuid>,
}

/// A fetched delivery bundle
pub struct BundleDownload {
    pub data: Bytes,
    /// Suggested archive filename, e.g. `web-checker.zip`
    pub filename: String,
}

/// Order ledger service
pub struct OrderService {
    store: Arc<dyn RecordStore>,
    catalog: Arc<CatalogService>,
    packager: DeliveryPackager,
    storage: Arc<dyn StorageBackend>,
    notifier: Arc<dyn NotificationChannel>,
    admin_chat_id: Option<i64>,
    public_base_url: String,
    inner: RwLock<LedgerInner>,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn RecordStore>,
        catalog: Arc<CatalogService>,
        storage: Arc<dyn StorageBackend>,
        notifier: Arc<dyn NotificationChannel>,
        admin_chat_id: Option<i64>,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            catalog,
            packager: DeliveryPackager::new(storage.clone()),
            storage,
            notifier,
            admin_chat_id,
            public_base_url,
            inner: RwLock::new(LedgerInner {
                orders: HashMap::new(),
                claims: ClaimRegistry::new(),
                tokens: HashMap::new(),
            }),
        }
    }

    /// Rebuild the in-memory ledger and its secondary indexes from the
    /// record store. Called once at startup.
    pub async fn load_from_store(&self) -> Result<usize> {
        let records = self.store.list_all(ORDERS_BUCKET).await?;
        let mut inner = self.inner.write().await;
        inner.orders.clear();
        inner.claims = ClaimRegistry::new();
        inner.tokens.clear();
        for (id, record) in records {
            let order: Order = match serde_json::from_value(record) {
                Ok(order) => order,
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Skipping unreadable order record");
                    continue;
                }
            };
            if let Err(e) = inner.claims.register(order.id) {
                tracing::warn!(order_id = %order.id, error = %e, "Claim code collision on reload");
            }
            if let Some(token) = &order.download_token {
                inner.tokens.insert(token.clone(), order.id);
            }
            inner.orders.insert(order.id, order);
        }
        Ok(inner.orders.len())
    }

    /// Create an order for an available product.
    ///
    /// Reserves the product first via a status compare-and-swap, so two
    /// buyers racing for the last unit get exactly one order; the product
    /// flips to `pending` exactly once. The claim code is minted and
    /// registered in the same mutation section that records the order.
    pub async fn create_order(&self, slug: &str, payment_method: String) -> Result<Order> {
        let product = self
            .catalog
            .get_by_slug(slug)
            .await
            .ok_or_else(|| AppError::NotFound(format!("product '{slug}'")))?;
        if product.status != ProductStatus::Available {
            return Err(AppError::InvalidState(format!(
                "product '{slug}' is not available"
            )));
        }

        // Reserve the product. The CAS is what makes the flip exactly-once.
        self.catalog
            .set_status_if(product.id, ProductStatus::Available, ProductStatus::Pending)
            .await?;

        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;
        let claim_code = match inner.claims.register(id) {
            Ok(code) => code,
            Err(e) => {
                drop(inner);
                self.unreserve(product.id).await;
                return Err(e);
            }
        };
        let order = Order {
            id,
            product_id: product.id,
            product_name: product.name.clone(),
            price: product.price.clone(),
            payment_method,
            status: OrderStatus::Unpaid,
            receipt_key: None,
            buyer_chat_id: None,
            buyer_username: None,
            created_at: Utc::now(),
            is_proof: false,
            claim_code,
            download_token: None,
        };

        if let Err(e) = self
            .store
            .put(ORDERS_BUCKET, &id.to_string(), serde_json::to_value(&order)?)
            .await
        {
            drop(inner);
            self.unreserve(product.id).await;
            return Err(e);
        }
        inner.orders.insert(id, order.clone());
        tracing::info!(order_id = %id, product = %order.product_name, "Order created");
        Ok(order)
    }

    /// Attach a payment receipt to an `unpaid` order and move it to
    /// `pending`. The receipt is stored before the transition; a storage
    /// failure aborts with no state change.
    pub async fn submit_receipt(
        &self,
        order_id: Uuid,
        filename: &str,
        content: Bytes,
        content_type: &str,
    ) -> Result<Order> {
        {
            let inner = self.inner.read().await;
            let order = inner
                .orders
                .get(&order_id)
                .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
            if order.status != OrderStatus::Unpaid {
                return Err(AppError::InvalidState(format!(
                    "order {order_id} is {}, receipts are only accepted while unpaid",
                    order.status.as_str()
                )));
            }
        }

        let receipt_key = format!("receipts/{order_id}_{}", sanitize_filename(filename));
        self.storage.put(&receipt_key, content, content_type).await?;

        let updated = self
            .transition(order_id, OrderStatus::Unpaid, OrderStatus::Pending, |order| {
                order.receipt_key = Some(receipt_key.clone());
            })
            .await?;

        if let Some(admin) = self.admin_chat_id {
            let text = format!(
                "\u{1F514} *New Order for Review*\n\n\
                 A payment receipt has been uploaded for:\n*{}*\n\n\
                 Please go to your dashboard to review and approve.",
                updated.product_name
            );
            send_best_effort(self.notifier.as_ref(), admin, &text).await;
        }
        Ok(updated)
    }

    /// Pair a chat identity with an order via its claim code. Codes stay
    /// valid for the life of the order; resubmitting one idempotently
    /// overwrites the buyer identity fields and nothing else.
    pub async fn claim(
        &self,
        code: &str,
        chat_id: i64,
        username: Option<String>,
    ) -> Result<Order> {
        let order_id = {
            let inner = self.inner.read().await;
            inner
                .claims
                .resolve(code)
                .ok_or_else(|| AppError::NotFound("unknown claim code".into()))?
        };

        let updated = {
            let mut inner = self.inner.write().await;
            let order = inner
                .orders
                .get(&order_id)
                .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
            let mut next = order.clone();
            next.buyer_chat_id = Some(chat_id);
            next.buyer_username = username;
            self.store
                .update(
                    ORDERS_BUCKET,
                    &order_id.to_string(),
                    serde_json::json!({
                        "buyer_chat_id": next.buyer_chat_id,
                        "buyer_username": next.buyer_username,
                    }),
                )
                .await?;
            inner.orders.insert(order_id, next.clone());
            next
        };

        if let Some(admin) = self.admin_chat_id {
            let text = format!(
                "\u{1F517} *Order Linked*\n\n*Product:* {}\n*Buyer:* @{}",
                updated.product_name,
                updated.buyer_username.as_deref().unwrap_or("N/A")
            );
            send_best_effort(self.notifier.as_ref(), admin, &text).await;
        }
        Ok(updated)
    }

    /// Approve a `pending` order: package the delivery bundle, mint the
    /// download token, release the product back to `available` and move the
    /// order to `approved`.
    ///
    /// Packaging happens before any state change, so a missing asset or a
    /// storage failure leaves the order `pending` and the product
    /// untouched. A backing-store failure after the product was released
    /// reverts it before the error surfaces.
    pub async fn approve(&self, order_id: Uuid, mark_as_proof: bool) -> Result<Order> {
        let product_id = {
            let inner = self.inner.read().await;
            let order = inner
                .orders
                .get(&order_id)
                .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
            if order.status != OrderStatus::Pending {
                return Err(AppError::InvalidState(format!(
                    "order {order_id} is {}, only pending orders can be approved",
                    order.status.as_str()
                )));
            }
            order.product_id
        };

        // The product reference carries no store-level constraint; resolve
        // it defensively before touching anything.
        let product = self.catalog.get(product_id).await?;

        let bundle = self.packager.package(&product).await?;
        let token = DeliveryPackager::mint_token();
        self.packager.store_bundle(&token, bundle).await?;

        // Release the product, then commit the order transition.
        self.catalog
            .set_status(product_id, ProductStatus::Available)
            .await?;

        let updated = match self.commit_approval(order_id, &token, mark_as_proof).await {
            Ok(updated) => updated,
            Err(e @ AppError::InvalidState(_)) => {
                // Lost the race to a concurrent approval: the winner owns
                // the product state now; only this attempt's bundle is
                // orphaned.
                self.packager.discard_bundle(&token).await;
                return Err(e);
            }
            Err(e) => {
                // The order transition never applied; put the product back.
                if let Err(revert) = self
                    .catalog
                    .set_status(product_id, ProductStatus::Pending)
                    .await
                {
                    tracing::error!(product_id = %product_id, error = %revert,
                        "Failed to revert product status after aborted approval");
                }
                self.packager.discard_bundle(&token).await;
                return Err(e);
            }
        };

        if let Some(chat_id) = updated.buyer_chat_id {
            let text = format!(
                "\u{2705} *Payment Approved!*\n\n\
                 Your order for *{}* is ready.\n\
                 Download your files here:\n{}/download/{}",
                updated.product_name, self.public_base_url, token
            );
            send_best_effort(self.notifier.as_ref(), chat_id, &text).await;
        }
        if let Some(admin) = self.admin_chat_id {
            let text = format!(
                "\u{2714} Order for *{}* approved and delivered.",
                updated.product_name
            );
            send_best_effort(self.notifier.as_ref(), admin, &text).await;
        }
        tracing::info!(order_id = %order_id, "Order approved");
        Ok(updated)
    }

    /// Fetch a delivery bundle by its bearer token.
    ///
    /// The first successful fetch of an `approved` order completes it;
    /// repeat fetches of a `completed` order return the same bytes — the
    /// token stays valid, the status no longer moves.
    pub async fn fetch_bundle(&self, token: &str) -> Result<BundleDownload> {
        let (order_id, status, product_id) = {
            let inner = self.inner.read().await;
            let order_id = *inner
                .tokens
                .get(token)
                .ok_or_else(|| AppError::NotFound("invalid or expired download link".into()))?;
            let order = inner
                .orders
                .get(&order_id)
                .ok_or_else(|| AppError::NotFound("invalid or expired download link".into()))?;
            (order_id, order.status, order.product_id)
        };

        if !matches!(status, OrderStatus::Approved | OrderStatus::Completed) {
            return Err(AppError::NotFound("invalid or expired download link".into()));
        }

        let data = self.packager.fetch_bundle(token).await?;

        if status == OrderStatus::Approved {
            match self
                .transition(order_id, OrderStatus::Approved, OrderStatus::Completed, |_| {})
                .await
            {
                Ok(_) => {}
                // A concurrent fetch completed it first; the download is
                // still served.
                Err(AppError::InvalidState(_)) => {}
                Err(e) => return Err(e),
            }
        }

        // The product may have been deleted since; the packaged bundle
        // stands on its own.
        let filename = match self.catalog.get(product_id).await {
            Ok(product) => format!("{}.zip", product.slug),
            Err(_) => "download.zip".to_string(),
        };
        Ok(BundleDownload { data, filename })
    }

    /// Look up an order by id.
    pub async fn get(&self, order_id: Uuid) -> Result<Order> {
        self.inner
            .read()
            .await
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))
    }

    /// Orders awaiting review, newest first.
    pub async fn list_pending(&self) -> Vec<Order> {
        let mut orders: Vec<_> = self
            .inner
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Completed proof-flagged orders that carry a receipt, newest first.
    pub async fn list_proofs(&self) -> Vec<Order> {
        let mut orders: Vec<_> = self
            .inner
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.is_proof && o.status == OrderStatus::Completed && o.receipt_key.is_some())
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Commit the `pending -> approved` edge and index the freshly minted
    /// token, all under one write-lock acquisition. A store failure leaves
    /// both the order and the token index untouched.
    async fn commit_approval(
        &self,
        order_id: Uuid,
        token: &str,
        mark_as_proof: bool,
    ) -> Result<Order> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
        if order.status != OrderStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "order {order_id} is {}, only pending orders can be approved",
                order.status.as_str()
            )));
        }

        let mut next = order.clone();
        next.status = OrderStatus::Approved;
        next.download_token = Some(token.to_string());
        next.is_proof = mark_as_proof;

        self.store
            .put(
                ORDERS_BUCKET,
                &order_id.to_string(),
                serde_json::to_value(&next)?,
            )
            .await?;
        inner.tokens.insert(token.to_string(), order_id);
        inner.orders.insert(order_id, next.clone());
        Ok(next)
    }

    /// Apply one state-machine edge under the ledger write lock: guard
    /// check, write-through, then the in-memory update. The store write
    /// failing leaves the in-memory order untouched.
    async fn transition(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next_status: OrderStatus,
        mutate: impl FnOnce(&mut Order),
    ) -> Result<Order> {
        debug_assert!(expected.can_transition_to(next_status));
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
        if order.status != expected {
            return Err(AppError::InvalidState(format!(
                "order {order_id} is {}, expected {}",
                order.status.as_str(),
                expected.as_str()
            )));
        }

        let mut next = order.clone();
        next.status = next_status;
        mutate(&mut next);

        self.store
            .put(
                ORDERS_BUCKET,
                &order_id.to_string(),
                serde_json::to_value(&next)?,
            )
            .await?;
        inner.orders.insert(order_id, next.clone());
        Ok(next)
    }

    async fn unreserve(&self, product_id: Uuid) {
        if let Err(e) = self
            .catalog
            .set_status_if(product_id, ProductStatus::Pending, ProductStatus::Available)
            .await
        {
            tracing::error!(product_id = %product_id, error = %e,
                "Failed to release product after aborted order creation");
        }
    }
}
