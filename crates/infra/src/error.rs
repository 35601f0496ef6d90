//! Service-level error model.
//!
//! Local validation failures keep their typed [`CatalogError`]. Anything that
//! goes wrong inside a collaborator (repository, usage lookup, reference data)
//! is opaque to the caller and only tagged with what was being attempted.

use serde::Serialize;
use thiserror::Error;

use storefront_core::DomainError;
use storefront_products::{CatalogError, ProductId};

use crate::repository::RepositoryError;

/// Identity of a catalog operation, attached to failures and notices.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    LoadReferenceData,
    CreateProduct,
    UpdateProduct,
    ChangePrice,
    RecordStock,
    LoadProduct,
    ListProducts,
    PriceHistory,
    CheckDelete,
    CommitDelete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::LoadReferenceData => "load_reference_data",
            Operation::CreateProduct => "create_product",
            Operation::UpdateProduct => "update_product",
            Operation::ChangePrice => "change_price",
            Operation::RecordStock => "record_stock",
            Operation::LoadProduct => "load_product",
            Operation::ListProducts => "list_products",
            Operation::PriceHistory => "price_history",
            Operation::CheckDelete => "check_delete",
            Operation::CommitDelete => "commit_delete",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected by local validation; nothing was sent to a collaborator.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A collaborator failed. No retry was attempted.
    #[error("{operation} failed for {}: {source}", target(.product_id))]
    Collaborator {
        operation: Operation,
        product_id: Option<ProductId>,
        #[source]
        source: anyhow::Error,
    },
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        Self::Catalog(value.into())
    }
}

fn target(product_id: &Option<ProductId>) -> String {
    match product_id {
        Some(id) => format!("product {id}"),
        None => "catalog".to_string(),
    }
}

impl ServiceError {
    pub fn collaborator(
        operation: Operation,
        product_id: Option<ProductId>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Collaborator {
            operation,
            product_id,
            source: source.into(),
        }
    }

    /// Map a repository failure. Refusals found while re-validating keep
    /// their typed reason; everything else is an opaque collaborator failure.
    pub fn persistence(
        operation: Operation,
        product_id: Option<ProductId>,
        error: RepositoryError,
    ) -> Self {
        match error {
            RepositoryError::Rejected(reason) => Self::Catalog(reason),
            other => Self::collaborator(operation, product_id, other),
        }
    }

    pub fn not_found() -> Self {
        Self::Catalog(CatalogError::Domain(DomainError::not_found()))
    }

    /// Operation that failed inside a collaborator, if that is what happened.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            ServiceError::Collaborator { operation, .. } => Some(*operation),
            ServiceError::Catalog(_) => None,
        }
    }

    /// Was this a lost optimistic-concurrency race (local or in persistence)?
    pub fn is_conflict(&self) -> bool {
        match self {
            ServiceError::Catalog(CatalogError::Domain(DomainError::Conflict(_))) => true,
            ServiceError::Catalog(_) => false,
            ServiceError::Collaborator { source, .. } => matches!(
                source.downcast_ref::<RepositoryError>(),
                Some(RepositoryError::Concurrency(_))
            ),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::AggregateId;

    #[test]
    fn collaborator_failure_names_the_operation_and_product() {
        let product_id = ProductId::new(AggregateId::new());
        let err = ServiceError::collaborator(
            Operation::CommitDelete,
            Some(product_id),
            anyhow::anyhow!("connection reset"),
        );

        assert_eq!(err.operation(), Some(Operation::CommitDelete));
        let msg = err.to_string();
        assert!(msg.starts_with("commit_delete failed for product "));
        assert!(msg.ends_with("connection reset"));
        assert!(!err.is_conflict());
    }

    #[test]
    fn repository_concurrency_is_a_conflict() {
        let err = ServiceError::collaborator(
            Operation::CommitDelete,
            None,
            RepositoryError::Concurrency("expected 3, found 4".to_string()),
        );
        assert!(err.is_conflict());
        assert!(err.to_string().contains("catalog"));
    }

    #[test]
    fn persistence_refusals_stay_typed() {
        let refused = ServiceError::persistence(
            Operation::CommitDelete,
            None,
            RepositoryError::Rejected(CatalogError::EmptyLedger),
        );
        assert!(matches!(refused, ServiceError::Catalog(CatalogError::EmptyLedger)));

        let opaque = ServiceError::persistence(
            Operation::CommitDelete,
            None,
            RepositoryError::Storage("lock poisoned".to_string()),
        );
        assert_eq!(opaque.operation(), Some(Operation::CommitDelete));
    }

    #[test]
    fn local_errors_pass_through_unchanged() {
        let err: ServiceError = CatalogError::EmptyLedger.into();
        assert_eq!(err.to_string(), CatalogError::EmptyLedger.to_string());
        assert_eq!(err.operation(), None);
    }
}
