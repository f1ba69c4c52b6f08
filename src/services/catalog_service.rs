//! Catalog store.
//!
//! Process-wide product catalog: an in-memory view guarded by a single
//! mutation lock, written through to the record store before every
//! in-memory change and reconciled from it at startup. Maintains the
//! slug secondary index inside the same mutation section.

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::datastore::{RecordStore, PRODUCTS_BUCKET};
use crate::error::{AppError, Result};
use crate::models::{DeliveryMode, Product, ProductStatus};
use crate::storage::{sanitize_filename, StorageBackend};

/// Slug used when a name reduces to nothing
const FALLBACK_SLUG: &str = "product";

/// An uploaded file: original name, bytes, content type
pub type Upload = (String, Bytes, String);

/// Admin request to add a product
pub struct NewProduct {
    pub name: String,
    pub price: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub description: String,
    pub bonus_freebies: Vec<String>,
    /// Product image, required
    pub image: Option<Upload>,
    /// Deliverable file; mutually exclusive with `website_link`
    pub asset_file: Option<Upload>,
    /// Website-link delivery; requires `expiration_days`
    pub website_link: Option<String>,
    pub expiration_days: Option<u32>,
}

/// Admin request to edit a product's fields
#[derive(Debug, Default, serde::Deserialize, utoipa::ToSchema)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub description: Option<String>,
    pub bonus_freebies: Option<Vec<String>>,
    /// New link target; only valid for website-link products
    pub website_link: Option<String>,
    /// New expiration window; only valid for website-link products
    pub expiration_days: Option<u32>,
}

struct CatalogInner {
    products: HashMap<Uuid, Product>,
    slug_index: HashMap<String, Uuid>,
}

/// Catalog service
pub struct CatalogService {
    store: Arc<dyn RecordStore>,
    storage: Arc<dyn StorageBackend>,
    inner: RwLock<CatalogInner>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn RecordStore>, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            store,
            storage,
            inner: RwLock::new(CatalogInner {
                products: HashMap::new(),
                slug_index: HashMap::new(),
            }),
        }
    }

    /// Rebuild the in-memory view from the record store. Called once at
    /// startup; this is the crash-recovery mechanism that re-aligns the
    /// cache with whatever the store last committed.
    pub async fn load_from_store(&self) -> Result<usize> {
        let records = self.store.list_all(PRODUCTS_BUCKET).await?;
        let mut inner = self.inner.write().await;
        inner.products.clear();
        inner.slug_index.clear();
        for (id, record) in records {
            let product: Product = match serde_json::from_value(record) {
                Ok(product) => product,
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Skipping unreadable product record");
                    continue;
                }
            };
            inner.slug_index.insert(product.slug.clone(), product.id);
            inner.products.insert(product.id, product);
        }
        Ok(inner.products.len())
    }

    /// Reduce a free-text name to its URL-safe base slug. Pure and
    /// deterministic; collision disambiguation happens at insert time.
    pub fn slugify(name: &str) -> String {
        let mut slug = String::with_capacity(name.len());
        let mut last_dash = false;
        for c in name.trim().to_lowercase().chars() {
            let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            };
            if mapped == '-' {
                if !last_dash {
                    slug.push('-');
                }
                last_dash = true;
            } else {
                slug.push(mapped);
                last_dash = false;
            }
        }
        let slug = slug.trim_matches('-').to_string();
        if slug.is_empty() {
            FALLBACK_SLUG.to_string()
        } else {
            slug
        }
    }

    /// Derive a slug unique within the catalog. A base slug held by a
    /// *different* product gets a short random suffix; a product editing
    /// its own name keeps the unsuffixed slug.
    fn unique_slug(inner: &CatalogInner, name: &str, existing_id: Option<Uuid>) -> String {
        let base = Self::slugify(name);
        match inner.slug_index.get(&base) {
            Some(holder) if Some(*holder) != existing_id => {
                const HEX: &[u8] = b"0123456789abcdef";
                let mut rng = rand::rng();
                let suffix: String = (0..4)
                    .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
                    .collect();
                format!("{base}-{suffix}")
            }
            _ => base,
        }
    }

    /// Add a product: validate, store its assets, then write the record
    /// through and index it. Stored assets are released again if the
    /// record write fails.
    pub async fn add_product(&self, new: NewProduct) -> Result<Product> {
        if new.name.trim().is_empty() {
            return Err(AppError::Validation("A product name is required".into()));
        }
        let Some((image_name, image_bytes, image_type)) = new.image else {
            return Err(AppError::Validation("A product image is required".into()));
        };
        let requested_delivery = match (&new.asset_file, &new.website_link) {
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "A product takes either a deliverable file or a website link, not both".into(),
                ))
            }
            (None, None) => {
                return Err(AppError::Validation(
                    "A deliverable file or a website link is required".into(),
                ))
            }
            (None, Some(url)) => {
                let days = new.expiration_days.ok_or_else(|| {
                    AppError::Validation("expiration_days is required for website links".into())
                })?;
                DeliveryMode::WebsiteLink {
                    url: url.clone(),
                    expiration_days: days,
                }
            }
            (Some(_), None) => {
                // Placeholder; the real key is filled in after upload.
                DeliveryMode::File {
                    key: String::new(),
                    filename: String::new(),
                }
            }
        };

        let id = Uuid::new_v4();

        let image_key = format!("images/{id}_{}", sanitize_filename(&image_name));
        self.storage
            .put(&image_key, image_bytes, &image_type)
            .await?;

        let delivery = match requested_delivery {
            DeliveryMode::File { .. } => {
                // Checked above: asset_file is Some on this arm.
                let (file_name, file_bytes, file_type) = new.asset_file.unwrap_or_default();
                let filename = sanitize_filename(&file_name);
                let key = format!("files/{id}_{filename}");
                if let Err(e) = self.storage.put(&key, file_bytes, &file_type).await {
                    self.release_asset(&image_key).await;
                    return Err(e);
                }
                DeliveryMode::File { key, filename }
            }
            link => link,
        };

        let mut inner = self.inner.write().await;
        let slug = Self::unique_slug(&inner, &new.name, None);
        let now = Utc::now();
        let product = Product {
            id,
            slug: slug.clone(),
            name: new.name,
            price: new.price,
            category: new.category,
            sub_category: new.sub_category,
            description: new.description,
            status: ProductStatus::Available,
            bonus_freebies: new.bonus_freebies,
            image_key: image_key.clone(),
            delivery: delivery.clone(),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self
            .store
            .put(
                PRODUCTS_BUCKET,
                &id.to_string(),
                serde_json::to_value(&product)?,
            )
            .await
        {
            drop(inner);
            self.release_asset(&image_key).await;
            if let DeliveryMode::File { key, .. } = &delivery {
                self.release_asset(key).await;
            }
            return Err(e);
        }

        inner.slug_index.insert(slug, id);
        inner.products.insert(id, product.clone());
        tracing::info!(product = %product.name, slug = %product.slug, "Product added");
        Ok(product)
    }

    /// Edit a product's fields. A name change recomputes the slug; editing
    /// a name back to its original value keeps the original slug.
    pub async fn update_product(&self, id: Uuid, changes: ProductUpdate) -> Result<Product> {
        let mut inner = self.inner.write().await;
        let current = inner
            .products
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?
            .clone();

        let mut next = current.clone();
        if let Some(name) = changes.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("A product name is required".into()));
            }
            next.slug = Self::unique_slug(&inner, &name, Some(id));
            next.name = name;
        }
        if let Some(price) = changes.price {
            next.price = price;
        }
        if let Some(category) = changes.category {
            next.category = category;
        }
        if changes.sub_category.is_some() {
            next.sub_category = changes.sub_category;
        }
        if let Some(description) = changes.description {
            next.description = description;
        }
        if let Some(bonus) = changes.bonus_freebies {
            next.bonus_freebies = bonus;
        }
        if changes.website_link.is_some() || changes.expiration_days.is_some() {
            match next.delivery.clone() {
                DeliveryMode::WebsiteLink {
                    url,
                    expiration_days,
                } => {
                    next.delivery = DeliveryMode::WebsiteLink {
                        url: changes.website_link.unwrap_or(url),
                        expiration_days: changes.expiration_days.unwrap_or(expiration_days),
                    };
                }
                DeliveryMode::File { .. } => {
                    return Err(AppError::Validation(
                        "Link fields only apply to website-link products".into(),
                    ))
                }
            }
        }
        next.updated_at = Utc::now();

        self.store
            .put(
                PRODUCTS_BUCKET,
                &id.to_string(),
                serde_json::to_value(&next)?,
            )
            .await?;

        if next.slug != current.slug {
            inner.slug_index.remove(&current.slug);
            inner.slug_index.insert(next.slug.clone(), id);
        }
        inner.products.insert(id, next.clone());
        Ok(next)
    }

    /// Delete a product and release its asset references.
    pub async fn delete_product(&self, id: Uuid) -> Result<Product> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?
            .clone();

        self.store.delete(PRODUCTS_BUCKET, &id.to_string()).await?;
        inner.slug_index.remove(&product.slug);
        inner.products.remove(&id);
        drop(inner);

        // Cascade: release stored assets. Best-effort — the record is gone.
        self.release_asset(&product.image_key).await;
        if let DeliveryMode::File { key, .. } = &product.delivery {
            self.release_asset(key).await;
        }
        tracing::info!(product = %product.name, "Product deleted");
        Ok(product)
    }

    /// Look up a product by id.
    pub async fn get(&self, id: Uuid) -> Result<Product> {
        self.inner
            .read()
            .await
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))
    }

    /// Look up a product by slug.
    pub async fn get_by_slug(&self, slug: &str) -> Option<Product> {
        let inner = self.inner.read().await;
        let id = inner.slug_index.get(slug)?;
        inner.products.get(id).cloned()
    }

    /// Every product, sorted by name.
    pub async fn list(&self) -> Vec<Product> {
        let mut products: Vec<_> = self.inner.read().await.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        products
    }

    /// Available products, optionally narrowed by category/sub-category.
    pub async fn list_available(
        &self,
        category: Option<&str>,
        sub_category: Option<&str>,
    ) -> Vec<Product> {
        let mut products: Vec<_> = self
            .inner
            .read()
            .await
            .products
            .values()
            .filter(|p| p.status == ProductStatus::Available)
            .filter(|p| category.is_none_or(|c| p.category == c))
            .filter(|p| sub_category.is_none_or(|s| p.sub_category.as_deref() == Some(s)))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        products
    }

    /// Compare-and-swap the product status: the transition applies only if
    /// the current status equals `expected`, so two racing callers get
    /// exactly one success.
    pub async fn set_status_if(
        &self,
        id: Uuid,
        expected: ProductStatus,
        next: ProductStatus,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        if product.status != expected {
            return Err(AppError::InvalidState(format!(
                "product {id} is {}, expected {}",
                product.status.as_str(),
                expected.as_str()
            )));
        }
        self.persist_status(&mut inner, id, next).await
    }

    /// Set the product status unconditionally.
    pub async fn set_status(&self, id: Uuid, next: ProductStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.products.contains_key(&id) {
            return Err(AppError::NotFound(format!("product {id}")));
        }
        self.persist_status(&mut inner, id, next).await
    }

    async fn persist_status(
        &self,
        inner: &mut CatalogInner,
        id: Uuid,
        next: ProductStatus,
    ) -> Result<()> {
        self.store
            .update(
                PRODUCTS_BUCKET,
                &id.to_string(),
                serde_json::json!({ "status": next }),
            )
            .await?;
        if let Some(product) = inner.products.get_mut(&id) {
            product.status = next;
        }
        Ok(())
    }

    async fn release_asset(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(key, error = %e, "Failed to release asset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::memory::MemoryStore;
    use crate::storage::memory::MemoryStorage;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStorage::new()))
    }

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.into(),
            price: "15.00".into(),
            category: "tools".into(),
            sub_category: None,
            description: "desc".into(),
            bonus_freebies: vec![],
            image: Some(("cover.png".into(), Bytes::from_static(b"png"), "image/png".into())),
            asset_file: None,
            website_link: Some("https://example.com".into()),
            expiration_days: Some(30),
        }
    }

    #[test]
    fn slugify_basics() {
        assert_eq!(CatalogService::slugify("Web Checker v2"), "web-checker-v2");
        assert_eq!(CatalogService::slugify("  CODM -- Account!  "), "codm-account");
        assert_eq!(CatalogService::slugify("!!!"), "product");
        assert_eq!(CatalogService::slugify(""), "product");
    }

    #[test]
    fn slugify_output_shape() {
        for name in ["Hello World", "--x--", "Ünïcode Nàme", "a  b   c", "123"] {
            let slug = CatalogService::slugify(name);
            assert!(!slug.is_empty());
            assert!(!slug.starts_with('-') && !slug.ends_with('-'), "{slug}");
            assert!(!slug.contains("--"), "{slug}");
            assert!(
                slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "{slug}"
            );
        }
    }

    #[test]
    fn slugify_is_stable_under_reapplication() {
        for name in ["Web Checker", "a--b", "Mixed CASE 42"] {
            let once = CatalogService::slugify(name);
            assert_eq!(CatalogService::slugify(&once), once);
        }
    }

    #[tokio::test]
    async fn add_product_requires_image() {
        let catalog = service();
        let mut product = new_product("No Image");
        product.image = None;
        let err = catalog.add_product(product).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn delivery_modes_are_mutually_exclusive() {
        let catalog = service();
        let mut product = new_product("Both Modes");
        product.asset_file = Some(("x.zip".into(), Bytes::from_static(b"z"), "application/zip".into()));
        let err = catalog.add_product(product).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut product = new_product("No Mode");
        product.website_link = None;
        product.expiration_days = None;
        let err = catalog.add_product(product).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn colliding_slugs_get_disambiguated() {
        let catalog = service();
        let first = catalog.add_product(new_product("Same Name")).await.unwrap();
        let second = catalog.add_product(new_product("Same Name")).await.unwrap();
        assert_eq!(first.slug, "same-name");
        assert_ne!(first.slug, second.slug);
        assert!(second.slug.starts_with("same-name-"));
        // base + dash + 4 hex chars
        assert_eq!(second.slug.len(), "same-name".len() + 5);
    }

    #[tokio::test]
    async fn editing_name_back_keeps_original_slug() {
        let catalog = service();
        let product = catalog.add_product(new_product("Original")).await.unwrap();
        let renamed = catalog
            .update_product(
                product.id,
                ProductUpdate {
                    name: Some("Changed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.slug, "changed");

        let back = catalog
            .update_product(
                product.id,
                ProductUpdate {
                    name: Some("Original".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(back.slug, "original");
    }

    #[tokio::test]
    async fn editing_own_name_does_not_self_collide() {
        let catalog = service();
        let product = catalog.add_product(new_product("Stable")).await.unwrap();
        let edited = catalog
            .update_product(
                product.id,
                ProductUpdate {
                    name: Some("Stable".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.slug, "stable");
    }

    #[tokio::test]
    async fn slug_lookup_follows_rename() {
        let catalog = service();
        let product = catalog.add_product(new_product("Before")).await.unwrap();
        catalog
            .update_product(
                product.id,
                ProductUpdate {
                    name: Some("After".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(catalog.get_by_slug("before").await.is_none());
        assert_eq!(catalog.get_by_slug("after").await.unwrap().id, product.id);
    }

    #[tokio::test]
    async fn status_cas_rejects_mismatched_expectation() {
        let catalog = service();
        let product = catalog.add_product(new_product("CAS")).await.unwrap();
        catalog
            .set_status_if(product.id, ProductStatus::Available, ProductStatus::Pending)
            .await
            .unwrap();
        let err = catalog
            .set_status_if(product.id, ProductStatus::Available, ProductStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn delete_releases_assets_and_slug() {
        let storage = Arc::new(MemoryStorage::new());
        let catalog = CatalogService::new(Arc::new(MemoryStore::new()), storage.clone());
        let product = catalog.add_product(new_product("Doomed")).await.unwrap();
        assert!(storage.exists(&product.image_key).await.unwrap());

        catalog.delete_product(product.id).await.unwrap();
        assert!(!storage.exists(&product.image_key).await.unwrap());
        assert!(catalog.get_by_slug("doomed").await.is_none());
        assert!(catalog.get(product.id).await.is_err());
    }

    #[tokio::test]
    async fn reload_rebuilds_indexes() {
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(MemoryStorage::new());
        let catalog = CatalogService::new(store.clone(), storage.clone());
        let product = catalog.add_product(new_product("Persisted")).await.unwrap();

        // A fresh service over the same store sees the same catalog.
        let reloaded = CatalogService::new(store, storage);
        assert_eq!(reloaded.load_from_store().await.unwrap(), 1);
        assert_eq!(
            reloaded.get_by_slug("persisted").await.unwrap().id,
            product.id
        );
    }
}
