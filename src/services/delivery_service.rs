//! Delivery packager.
//!
//! Assembles the downloadable bundle for an approved order and mints the
//! bearer token gating it. The bundle is a ZIP archive containing either
//! generated link instructions or the stored asset under its original name,
//! plus an enumeration of any bonus lines the product carries.
//!
//! Bundles are packaged and persisted at approval time, keyed by token, so
//! repeat fetches return identical bytes.

use bytes::Bytes;
use std::io::{Cursor, Write};
use std::sync::Arc;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{AppError, Result};
use crate::models::{DeliveryMode, Product};
use crate::storage::StorageBackend;

/// Archive entry holding link-mode delivery instructions
const INSTRUCTIONS_ENTRY: &str = "instructions.txt";

/// Archive entry enumerating bonus lines
const BONUS_ENTRY: &str = "BONUS_FREEBIES.txt";

/// Content type of packaged bundles
pub const BUNDLE_CONTENT_TYPE: &str = "application/zip";

/// Delivery bundle packager
pub struct DeliveryPackager {
    storage: Arc<dyn StorageBackend>,
}

impl DeliveryPackager {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Mint a fresh download token. High-entropy and bearer-style: holding
    /// it is the only credential the fetch endpoint checks. No expiry is
    /// attached — an intentional simplification carried over from the
    /// observed system, left as an extension point.
    pub fn mint_token() -> String {
        Uuid::new_v4().to_string()
    }

    /// Storage key of the bundle for a token
    pub fn bundle_key(token: &str) -> String {
        format!("bundles/{token}.zip")
    }

    /// Assemble the bundle for a product.
    ///
    /// Fails loudly when the backing asset of a file-mode product cannot be
    /// located — a truncated or empty bundle is never produced. Nothing is
    /// mutated here; callers apply state transitions only after packaging
    /// succeeds.
    pub async fn package(&self, product: &Product) -> Result<Bytes> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        match &product.delivery {
            DeliveryMode::WebsiteLink {
                url,
                expiration_days,
            } => {
                let instructions = format!(
                    "Thank you for your purchase of '{}'!\n\n\
                     Here is your website link:\n{}\n\n\
                     Your access will expire in {} day(s).\n",
                    product.name, url, expiration_days
                );
                zip.start_file(INSTRUCTIONS_ENTRY, options)?;
                zip.write_all(instructions.as_bytes())?;
            }
            DeliveryMode::File { key, filename } => {
                let asset = self.storage.get(key).await.map_err(|e| match e {
                    AppError::NotFound(_) => AppError::Storage(format!(
                        "deliverable asset {key} for product '{}' is missing",
                        product.name
                    )),
                    other => other,
                })?;
                zip.start_file(filename.as_str(), options)?;
                zip.write_all(&asset.data)?;
            }
        }

        if !product.bonus_freebies.is_empty() {
            let mut bonus = String::from("Your Bonuses:\n");
            for line in &product.bonus_freebies {
                bonus.push_str(&format!("- {line}\n"));
            }
            zip.start_file(BONUS_ENTRY, options)?;
            zip.write_all(bonus.as_bytes())?;
        }

        let cursor = zip.finish()?;
        Ok(Bytes::from(cursor.into_inner()))
    }

    /// Persist a packaged bundle under its token key.
    pub async fn store_bundle(&self, token: &str, bundle: Bytes) -> Result<()> {
        self.storage
            .put(&Self::bundle_key(token), bundle, BUNDLE_CONTENT_TYPE)
            .await
    }

    /// Fetch a previously packaged bundle.
    pub async fn fetch_bundle(&self, token: &str) -> Result<Bytes> {
        Ok(self.storage.get(&Self::bundle_key(token)).await?.data)
    }

    /// Remove a bundle, e.g. when its approval lost a race. Best-effort.
    pub async fn discard_bundle(&self, token: &str) {
        if let Err(e) = self.storage.delete(&Self::bundle_key(token)).await {
            tracing::warn!(token, error = %e, "Failed to discard orphan bundle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductStatus;
    use crate::storage::memory::MemoryStorage;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::io::Read;
    use zip::ZipArchive;

    fn product(delivery: DeliveryMode, bonus: Vec<String>) -> Product {
        Product {
            id: Uuid::new_v4(),
            slug: "web-checker".into(),
            name: "Web Checker".into(),
            price: "15.00".into(),
            category: "web_checker".into(),
            sub_category: None,
            description: "A checker".into(),
            status: ProductStatus::Pending,
            bonus_freebies: bonus,
            image_key: "images/web-checker.png".into(),
            delivery,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn read_entries(bundle: &Bytes) -> HashMap<String, Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(bundle.to_vec())).unwrap();
        let mut entries = HashMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            entries.insert(file.name().to_string(), content);
        }
        entries
    }

    #[tokio::test]
    async fn link_mode_renders_instructions() {
        let storage = Arc::new(MemoryStorage::new());
        let packager = DeliveryPackager::new(storage);
        let product = product(
            DeliveryMode::WebsiteLink {
                url: "https://example.com/panel".into(),
                expiration_days: 30,
            },
            vec![],
        );

        let bundle = packager.package(&product).await.unwrap();
        let entries = read_entries(&bundle);
        assert_eq!(entries.len(), 1);
        let text = String::from_utf8(entries["instructions.txt"].clone()).unwrap();
        assert!(text.contains("https://example.com/panel"));
        assert!(text.contains("30 day(s)"));
    }

    #[tokio::test]
    async fn file_mode_includes_asset_under_original_name() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .put(
                "files/p_payload.txt",
                Bytes::from_static(b"secret payload"),
                "text/plain",
            )
            .await
            .unwrap();
        let packager = DeliveryPackager::new(storage);
        let product = product(
            DeliveryMode::File {
                key: "files/p_payload.txt".into(),
                filename: "payload.txt".into(),
            },
            vec![],
        );

        let bundle = packager.package(&product).await.unwrap();
        let entries = read_entries(&bundle);
        assert_eq!(entries["payload.txt"], b"secret payload");
    }

    #[tokio::test]
    async fn bonus_lines_are_enumerated() {
        let storage = Arc::new(MemoryStorage::new());
        let packager = DeliveryPackager::new(storage);
        let product = product(
            DeliveryMode::WebsiteLink {
                url: "https://example.com".into(),
                expiration_days: 7,
            },
            vec!["Free config".into(), "Priority support".into()],
        );

        let bundle = packager.package(&product).await.unwrap();
        let entries = read_entries(&bundle);
        let bonus = String::from_utf8(entries["BONUS_FREEBIES.txt"].clone()).unwrap();
        assert!(bonus.contains("- Free config"));
        assert!(bonus.contains("- Priority support"));
    }

    #[tokio::test]
    async fn missing_asset_fails_loudly() {
        let storage = Arc::new(MemoryStorage::new());
        let packager = DeliveryPackager::new(storage);
        let product = product(
            DeliveryMode::File {
                key: "files/ghost.zip".into(),
                filename: "ghost.zip".into(),
            },
            vec!["bonus".into()],
        );

        let err = packager.package(&product).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn store_then_fetch_round_trips() {
        let storage = Arc::new(MemoryStorage::new());
        let packager = DeliveryPackager::new(storage);
        let token = DeliveryPackager::mint_token();
        packager
            .store_bundle(&token, Bytes::from_static(b"PK\x03\x04zip"))
            .await
            .unwrap();
        let fetched = packager.fetch_bundle(&token).await.unwrap();
        assert_eq!(fetched.as_ref(), b"PK\x03\x04zip");
    }

    #[test]
    fn minted_tokens_are_unique() {
        let a = DeliveryPackager::mint_token();
        let b = DeliveryPackager::mint_token();
        assert_ne!(a, b);
    }
}
