//! Usage lookup: is a product referenced by other records (orders, bundles)?

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use storefront_products::{ProductId, Usage};

#[async_trait]
pub trait UsageLookup: Send + Sync {
    async fn is_in_use(&self, product_id: ProductId) -> anyhow::Result<bool>;

    async fn usage(&self, product_id: ProductId) -> anyhow::Result<Usage> {
        Ok(Usage::from(self.is_in_use(product_id).await?))
    }
}

/// In-memory set of referenced products. Intended for tests/dev.
///
/// Clones share the same set, so a repository can hold a handle and re-check
/// usage while it commits a deletion.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUsageIndex {
    referenced: Arc<RwLock<HashSet<ProductId>>>,
}

impl InMemoryUsageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_in_use(&self, product_id: ProductId) -> anyhow::Result<()> {
        self.referenced
            .write()
            .map_err(|_| anyhow::anyhow!("usage index lock poisoned"))?
            .insert(product_id);
        Ok(())
    }

    pub fn contains(&self, product_id: ProductId) -> anyhow::Result<bool> {
        let referenced = self
            .referenced
            .read()
            .map_err(|_| anyhow::anyhow!("usage index lock poisoned"))?;
        Ok(referenced.contains(&product_id))
    }

    pub fn release(&self, product_id: ProductId) -> anyhow::Result<()> {
        self.referenced
            .write()
            .map_err(|_| anyhow::anyhow!("usage index lock poisoned"))?
            .remove(&product_id);
        Ok(())
    }
}

#[async_trait]
impl UsageLookup for InMemoryUsageIndex {
    async fn is_in_use(&self, product_id: ProductId) -> anyhow::Result<bool> {
        self.contains(product_id)
    }
}
