//! Deletion guard: may a product be removed?
//!
//! Two independent predicates must both hold: stock is exactly zero, and no
//! external record (open order, bundle, ...) references the product. The guard
//! only evaluates; removal is the persistence layer's job, and it must make
//! the approval and the removal atomic with respect to stock/usage changes.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::product::Product;

/// Answer of the usage-lookup collaborator for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Usage {
    Unused,
    InUse,
}

impl From<bool> for Usage {
    fn from(in_use: bool) -> Self {
        if in_use { Usage::InUse } else { Usage::Unused }
    }
}

/// Why a deletion was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RefusalReason {
    StockNotZero { stock: u32 },
    InUse,
}

impl core::fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RefusalReason::StockNotZero { stock } => {
                write!(f, "stock must be zero (currently {stock})")
            }
            RefusalReason::InUse => f.write_str("product is in use by other records"),
        }
    }
}

/// Outcome of a deletion check. Approved iff there are no reasons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionDecision {
    reasons: Vec<RefusalReason>,
}

impl DeletionDecision {
    pub fn approved(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Every failed predicate, stock first.
    pub fn reasons(&self) -> &[RefusalReason] {
        &self.reasons
    }

    pub fn refused_for(&self, reason: RefusalReason) -> bool {
        self.reasons.contains(&reason)
    }

    pub fn into_result(self) -> Result<(), CatalogError> {
        if self.approved() {
            Ok(())
        } else {
            Err(CatalogError::DeletionRefused(self.reasons))
        }
    }
}

/// Stateless evaluator of the deletion predicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeletionGuard;

impl DeletionGuard {
    /// Evaluate both predicates. Never short-circuits: a product with stock
    /// that is also in use reports both reasons.
    pub fn evaluate(stock: u32, usage: Usage) -> DeletionDecision {
        let mut reasons = Vec::new();
        if stock != 0 {
            reasons.push(RefusalReason::StockNotZero { stock });
        }
        if usage == Usage::InUse {
            reasons.push(RefusalReason::InUse);
        }
        DeletionDecision { reasons }
    }

    pub fn can_delete(product: &Product, usage: Usage) -> DeletionDecision {
        Self::evaluate(product.stock(), usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_blocks_regardless_of_usage() {
        for usage in [Usage::Unused, Usage::InUse] {
            let decision = DeletionGuard::evaluate(5, usage);
            assert!(!decision.approved());
            assert!(decision.refused_for(RefusalReason::StockNotZero { stock: 5 }));
        }
    }

    #[test]
    fn usage_blocks_when_stock_is_zero() {
        let decision = DeletionGuard::evaluate(0, Usage::InUse);
        assert!(!decision.approved());
        assert_eq!(decision.reasons(), &[RefusalReason::InUse]);
    }

    #[test]
    fn approved_only_with_zero_stock_and_no_usage() {
        let decision = DeletionGuard::evaluate(0, Usage::Unused);
        assert!(decision.approved());
        assert!(decision.into_result().is_ok());
    }

    #[test]
    fn both_reasons_are_reported() {
        let decision = DeletionGuard::evaluate(2, Usage::from(true));
        assert_eq!(
            decision.clone().into_result(),
            Err(CatalogError::DeletionRefused(vec![
                RefusalReason::StockNotZero { stock: 2 },
                RefusalReason::InUse,
            ]))
        );
    }
}
