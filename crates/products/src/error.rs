//! Catalog error taxonomy.

use chrono::{DateTime, Utc};
use thiserror::Error;

use storefront_core::{DomainError, Money};

use crate::facet::{FacetId, FacetKind};
use crate::guard::RefusalReason;

/// Failures raised by the catalog core.
///
/// A filter that matches nothing or a refused deletion *check* are ordinary
/// results, not errors. `DeletionRefused` only shows up when a caller tries to
/// go ahead with a deletion the guard refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Negative monetary amount.
    #[error("price must not be negative (got {0})")]
    InvalidValue(Money),

    /// Price entry older than the latest one already in the ledger.
    #[error("price effective at {attempted} is earlier than the latest entry ({latest})")]
    NonMonotonicTime {
        latest: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    /// A ledger without entries. Indicates a defect: every product is created
    /// with an initial price.
    #[error("price ledger has no entries")]
    EmptyLedger,

    #[error("deletion refused: {}", describe(.0))]
    DeletionRefused(Vec<RefusalReason>),

    #[error("unknown {facet} id: {id}")]
    UnknownFacetId { facet: FacetKind, id: FacetId },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

fn describe(reasons: &[RefusalReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
