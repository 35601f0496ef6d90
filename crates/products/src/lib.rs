//! Products domain module (event-sourced).
//!
//! Business rules for the catalog: facet classification, the append-only
//! price ledger, filtering and the deletion guard. Pure domain logic: no IO,
//! no HTTP, no storage.

pub mod error;
pub mod facet;
pub mod filter;
pub mod guard;
pub mod ledger;
pub mod page;
pub mod product;

pub use error::CatalogError;
pub use facet::{FacetId, FacetKind, FacetOption, FacetRef, Facets, ReferenceData};
pub use filter::{FilterCriteria, Filterable, filter};
pub use guard::{DeletionDecision, DeletionGuard, RefusalReason, Usage};
pub use ledger::{PriceChange, PriceEntry, PriceLedger};
pub use page::{DEFAULT_PAGE_SIZE, Page, paginate};
pub use product::{
    ChangePrice, CreateProduct, DeleteProduct, PriceChanged, Product, ProductCommand,
    ProductCreated, ProductDeleted, ProductEvent, ProductId, ProductUpdated, RecordStock,
    StockRecorded, UpdateProduct, validate_name, validate_note,
};
