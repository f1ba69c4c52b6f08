//! Claim code registry.
//!
//! Pairs a later-arriving chat identity with an already-created order: the
//! order exists before any chat interaction does, so the buyer is handed a
//! short code on the order page and submits it to the bot. Codes stay
//! resolvable for the lifetime of the order — resubmitting one is a
//! harmless, idempotent re-link.

use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Marker prefixing every claim code
pub const CLAIM_PREFIX: &str = "CLAIM-";

/// In-memory claim code index, owned by the order ledger and mutated under
/// its write lock.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    codes: HashMap<String, Uuid>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the claim code for an order id: the fixed marker plus the
    /// uppercased first segment of the id's hyphenated form.
    ///
    /// The fragment alone does not guarantee uniqueness at scale; the id's
    /// own uniqueness source practically does, and [`register`] rejects any
    /// detected collision rather than trusting it blindly.
    ///
    /// [`register`]: ClaimRegistry::register
    pub fn derive_code(order_id: &Uuid) -> String {
        let id = order_id.to_string();
        let fragment = id.split('-').next().unwrap_or(&id);
        format!("{CLAIM_PREFIX}{}", fragment.to_uppercase())
    }

    /// Register an order, returning its claim code. A code already mapped
    /// to a different order is a collision and is rejected; re-registering
    /// the same order is a no-op.
    pub fn register(&mut self, order_id: Uuid) -> Result<String> {
        let code = Self::derive_code(&order_id);
        match self.codes.get(&code) {
            Some(existing) if *existing != order_id => Err(AppError::Conflict(format!(
                "claim code {code} already registered"
            ))),
            _ => {
                self.codes.insert(code.clone(), order_id);
                Ok(code)
            }
        }
    }

    /// Resolve a user-supplied code to its order id. Matching is
    /// whitespace-trimmed and case-insensitive; codes are not consumed.
    pub fn resolve(&self, raw: &str) -> Option<Uuid> {
        self.codes.get(&raw.trim().to_uppercase()).copied()
    }
}
