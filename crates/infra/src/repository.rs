//! Product persistence.
//!
//! The repository is the final authority on conflicts: every write names the
//! version it was decided against and is refused if the product moved on.
//! Writes are re-validated against the stored state before they are journaled.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use storefront_core::{Aggregate, ExpectedVersion};
use storefront_events::EventEnvelope;
use storefront_products::product::AGGREGATE_TYPE;
use storefront_products::{
    CatalogError, DeletionGuard, PriceChanged, PriceEntry, PriceLedger, Product, ProductCreated,
    ProductDeleted, ProductEvent, ProductId, ProductUpdated, StockRecorded, Usage, validate_name,
    validate_note,
};

use crate::usage::InMemoryUsageIndex;

/// One journaled product event, payload kept as JSON.
pub type JournalEntry = EventEnvelope<JsonValue>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("product code '{0}' is already in use")]
    DuplicateCode(String),

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("rejected on re-validation: {0}")]
    Rejected(#[from] CatalogError),

    #[error("journal payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Storage(String),
}

/// Persistence collaborator for products.
///
/// Callers validate locally first; writes return the product's new version.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, created: &ProductCreated) -> Result<u64, RepositoryError>;

    /// Persist new values of the non-price fields.
    async fn update_product(
        &self,
        updated: &ProductUpdated,
        expected: ExpectedVersion,
    ) -> Result<u64, RepositoryError>;

    async fn append_price(
        &self,
        product_id: ProductId,
        entry: &PriceEntry,
        expected: ExpectedVersion,
    ) -> Result<u64, RepositoryError>;

    async fn record_stock(
        &self,
        recorded: &StockRecorded,
        expected: ExpectedVersion,
    ) -> Result<u64, RepositoryError>;

    /// Remove the product if it is still at `expected`, holds no stock and is
    /// not in use. Usage must be read in the same critical section as the
    /// removal, so nothing can start using the product in between.
    async fn delete_product(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
        occurred_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;

    /// A live product. Deleted products are reported as absent.
    async fn get(&self, product_id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Every live product, in creation order.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
}

#[derive(Debug, Default)]
struct Journal {
    streams: HashMap<ProductId, Vec<JournalEntry>>,
    order: Vec<ProductId>,
}

/// In-memory repository backed by an append-only JSON journal per product.
///
/// Intended for tests/dev. State is rebuilt by replaying the journal on every
/// read. Deletions consult the attached usage index under the journal lock.
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    journal: RwLock<Journal>,
    usage: InMemoryUsageIndex,
}

impl InMemoryProductRepository {
    /// Repository with a private, always-empty usage index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository that refuses to delete products marked in `usage`.
    pub fn with_usage_index(usage: InMemoryUsageIndex) -> Self {
        Self {
            journal: RwLock::default(),
            usage,
        }
    }

    /// The journaled events of one product, oldest first.
    pub fn journal(&self, product_id: ProductId) -> Result<Vec<JournalEntry>, RepositoryError> {
        Ok(self.read()?.streams.get(&product_id).cloned().unwrap_or_default())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Journal>, RepositoryError> {
        self.journal
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Journal>, RepositoryError> {
        self.journal
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    fn rehydrate(product_id: ProductId, stream: &[JournalEntry]) -> Result<Product, RepositoryError> {
        let mut product = Product::empty(product_id);
        for envelope in stream {
            let event: ProductEvent = serde_json::from_value(envelope.payload().clone())?;
            product.apply(&event);
        }
        Ok(product)
    }

    fn envelope(sequence_number: u64, event: &ProductEvent) -> Result<JournalEntry, RepositoryError> {
        let payload = serde_json::to_value(event)?;
        Ok(EventEnvelope::wrap(
            event.product_id().0,
            AGGREGATE_TYPE,
            sequence_number,
            event,
            payload,
        ))
    }

    /// Version-check, re-validate via `decide`, then journal one event.
    fn commit<F>(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
        decide: F,
    ) -> Result<u64, RepositoryError>
    where
        F: FnOnce(&Product) -> Result<ProductEvent, RepositoryError>,
    {
        let mut journal = self.write()?;
        let stream = journal
            .streams
            .get_mut(&product_id)
            .ok_or(RepositoryError::NotFound(product_id))?;

        let current = stream.last().map(|e| e.sequence_number()).unwrap_or(0);
        if !expected.matches(current) {
            return Err(RepositoryError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        let product = Self::rehydrate(product_id, stream)?;
        if !product.exists() {
            return Err(RepositoryError::NotFound(product_id));
        }

        let event = decide(&product)?;
        let next = current + 1;
        stream.push(Self::envelope(next, &event)?);
        Ok(next)
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn create_product(&self, created: &ProductCreated) -> Result<u64, RepositoryError> {
        PriceLedger::new(created.initial_price.clone())?;

        let mut journal = self.write()?;
        if journal.streams.contains_key(&created.product_id) {
            return Err(RepositoryError::Concurrency(format!(
                "product {} already exists",
                created.product_id
            )));
        }

        let code = created.code.trim();
        for (id, stream) in &journal.streams {
            let existing = Self::rehydrate(*id, stream)?;
            if existing.exists() && existing.code().eq_ignore_ascii_case(code) {
                return Err(RepositoryError::DuplicateCode(code.to_string()));
            }
        }

        let event = ProductEvent::ProductCreated(created.clone());
        let envelope = Self::envelope(1, &event)?;
        journal.streams.insert(created.product_id, vec![envelope]);
        journal.order.push(created.product_id);
        Ok(1)
    }

    async fn update_product(
        &self,
        updated: &ProductUpdated,
        expected: ExpectedVersion,
    ) -> Result<u64, RepositoryError> {
        self.commit(updated.product_id, expected, |_| {
            let name = validate_name(&updated.name).map_err(CatalogError::from)?;
            let note = validate_note(updated.note.as_deref()).map_err(CatalogError::from)?;
            Ok(ProductEvent::ProductUpdated(ProductUpdated {
                name,
                note,
                ..updated.clone()
            }))
        })
    }

    async fn append_price(
        &self,
        product_id: ProductId,
        entry: &PriceEntry,
        expected: ExpectedVersion,
    ) -> Result<u64, RepositoryError> {
        self.commit(product_id, expected, |product| {
            let ledger = product.ledger().ok_or(CatalogError::EmptyLedger)?;
            ledger.check(entry)?;
            Ok(ProductEvent::PriceChanged(PriceChanged {
                product_id,
                previous: ledger.current()?.value(),
                entry: entry.clone(),
                occurred_at: entry.effective_at(),
            }))
        })
    }

    async fn record_stock(
        &self,
        recorded: &StockRecorded,
        expected: ExpectedVersion,
    ) -> Result<u64, RepositoryError> {
        self.commit(recorded.product_id, expected, |_| {
            Ok(ProductEvent::StockRecorded(recorded.clone()))
        })
    }

    async fn delete_product(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
        occurred_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        self.commit(product_id, expected, |product| {
            let in_use = self
                .usage
                .contains(product_id)
                .map_err(|e| RepositoryError::Storage(e.to_string()))?;
            DeletionGuard::evaluate(product.stock(), Usage::from(in_use)).into_result()?;
            Ok(ProductEvent::ProductDeleted(ProductDeleted {
                product_id,
                occurred_at,
            }))
        })
    }

    async fn get(&self, product_id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let journal = self.read()?;
        let Some(stream) = journal.streams.get(&product_id) else {
            return Ok(None);
        };
        let product = Self::rehydrate(product_id, stream)?;
        Ok(product.exists().then_some(product))
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let journal = self.read()?;
        let mut products = Vec::with_capacity(journal.order.len());
        for id in &journal.order {
            if let Some(stream) = journal.streams.get(id) {
                let product = Self::rehydrate(*id, stream)?;
                if product.exists() {
                    products.push(product);
                }
            }
        }
        Ok(products)
    }
}
