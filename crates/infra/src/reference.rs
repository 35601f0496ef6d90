//! Reference data (facet lookup sets), read-only for the catalog.

use async_trait::async_trait;

use storefront_products::ReferenceData;

#[async_trait]
pub trait ReferenceDataProvider: Send + Sync {
    async fn load(&self) -> anyhow::Result<ReferenceData>;
}

/// Serves a fixed snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceData {
    snapshot: ReferenceData,
}

impl StaticReferenceData {
    pub fn new(snapshot: ReferenceData) -> Self {
        Self { snapshot }
    }

    /// Parse a snapshot from its JSON form.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl ReferenceDataProvider for StaticReferenceData {
    async fn load(&self) -> anyhow::Result<ReferenceData> {
        Ok(self.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_products::{FacetId, FacetKind, FacetOption};

    #[tokio::test]
    async fn loads_the_snapshot() {
        let snapshot = ReferenceData::new().with_option(
            FacetKind::Color,
            FacetOption::new(FacetKind::Color, "c-gold", "Dourado", "DOU").unwrap(),
        );
        let json = serde_json::to_string(&snapshot).unwrap();

        let provider = StaticReferenceData::from_json(&json).unwrap();
        let loaded = provider.load().await.unwrap();
        assert!(loaded.contains(FacetKind::Color, &FacetId::new("c-gold")));
        assert!(!loaded.contains(FacetKind::Type, &FacetId::new("c-gold")));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(StaticReferenceData::from_json("{not json").is_err());
    }
}
