//! Infrastructure for the storefront catalog.
//!
//! Collaborator seams (persistence, usage lookup, reference data, notices),
//! their in-memory implementations, configuration, and the [`CatalogService`]
//! that composes them around the pure domain in `storefront-products`.

pub mod catalog_service;
pub mod config;
pub mod error;
pub mod notify;
pub mod reference;
pub mod repository;
pub mod request;
pub mod usage;

pub use catalog_service::{CatalogService, DeletionCheck, FacetSelection, NewProduct, ProductChanges};
pub use config::CatalogConfig;
pub use error::{Operation, ServiceError, ServiceResult};
pub use notify::{ChannelNotifier, Notice, NoticeReceivers, Notifier, TracingNotifier};
pub use reference::{ReferenceDataProvider, StaticReferenceData};
pub use repository::{InMemoryProductRepository, JournalEntry, ProductRepository, RepositoryError};
pub use request::{LatestRequest, RequestTicket};
pub use usage::{InMemoryUsageIndex, UsageLookup};
