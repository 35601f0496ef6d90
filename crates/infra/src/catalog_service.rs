//! Catalog application service.
//!
//! Orchestrates one catalog operation at a time:
//!
//! ```text
//! load product (repository)
//!   -> decide (pure aggregate handler, local validation)
//!   -> persist (repository re-validates, version-checked)
//!   -> apply locally, log, notify
//! ```
//!
//! Deletion is two-phase: [`CatalogService::check_delete`] evaluates the guard
//! and records the version it looked at; [`CatalogService::commit_delete`]
//! re-evaluates and removes the product only if it is still at that version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use storefront_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion, Money};
use storefront_events::Event;
use storefront_products::{
    CatalogError, ChangePrice, CreateProduct, DeletionDecision, FacetId, FacetKind, Facets,
    FilterCriteria, Page, PriceChange, PriceEntry, Product, ProductCommand, ProductEvent,
    ProductId, RecordStock, ReferenceData, UpdateProduct, filter, paginate,
};

use crate::config::CatalogConfig;
use crate::error::{Operation, ServiceError, ServiceResult};
use crate::notify::{Notice, Notifier};
use crate::reference::ReferenceDataProvider;
use crate::repository::ProductRepository;
use crate::request::{LatestRequest, RequestTicket};
use crate::usage::UsageLookup;

/// Facet option ids picked for a product. Blank ids leave the facet unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetSelection {
    #[serde(default)]
    pub type_id: Option<FacetId>,
    #[serde(default)]
    pub color_id: Option<FacetId>,
    #[serde(default)]
    pub material_id: Option<FacetId>,
    #[serde(default)]
    pub size_id: Option<FacetId>,
}

impl FacetSelection {
    pub fn with(mut self, kind: FacetKind, id: impl Into<FacetId>) -> Self {
        let id = Some(id.into());
        match kind {
            FacetKind::Type => self.type_id = id,
            FacetKind::Color => self.color_id = id,
            FacetKind::Material => self.material_id = id,
            FacetKind::Size => self.size_id = id,
        }
        self
    }

    fn get(&self, kind: FacetKind) -> Option<&FacetId> {
        let id = match kind {
            FacetKind::Type => self.type_id.as_ref(),
            FacetKind::Color => self.color_id.as_ref(),
            FacetKind::Material => self.material_id.as_ref(),
            FacetKind::Size => self.size_id.as_ref(),
        };
        id.filter(|id| !id.is_empty())
    }

    /// Resolve every chosen id against `reference`.
    pub fn resolve(&self, reference: &ReferenceData) -> Result<Facets, CatalogError> {
        let mut facets = Facets::default();
        for kind in FacetKind::ALL {
            if let Some(id) = self.get(kind) {
                facets = facets.with(kind, reference.resolve(kind, id)?);
            }
        }
        Ok(facets)
    }
}

/// Input of [`CatalogService::create_product`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub facets: FacetSelection,
    pub initial_price: Money,
}

/// Input of [`CatalogService::update_product`]. `None` keeps the current value;
/// `note: Some("")` clears the note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub note: Option<String>,
    pub facets: Option<FacetSelection>,
    pub active: Option<bool>,
}

/// Result of the first deletion phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionCheck {
    pub product_id: ProductId,
    /// Product version the decision was taken against.
    pub version: u64,
    pub decision: DeletionDecision,
}

impl DeletionCheck {
    pub fn approved(&self) -> bool {
        self.decision.approved()
    }
}

pub struct CatalogService<R, U, D, N> {
    repository: R,
    usage: U,
    reference: D,
    notifier: N,
    config: CatalogConfig,
    requests: LatestRequest,
}

impl<R, U, D, N> CatalogService<R, U, D, N> {
    pub fn new(repository: R, usage: U, reference: D, notifier: N, config: CatalogConfig) -> Self {
        Self {
            repository,
            usage,
            reference,
            notifier,
            config,
            requests: LatestRequest::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn usage(&self) -> &U {
        &self.usage
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }
}

/// Run a command against `product` and return the single event it produces.
fn decide(product: &Product, command: ProductCommand) -> ServiceResult<ProductEvent> {
    product
        .handle(&command)?
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::invariant("command produced no event").into())
}

fn unexpected(event: &ProductEvent) -> ServiceError {
    DomainError::invariant(format!("unexpected event {}", event.event_type())).into()
}

impl<R, U, D, N> CatalogService<R, U, D, N>
where
    R: ProductRepository,
    U: UsageLookup,
    D: ReferenceDataProvider,
    N: Notifier,
{
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_product(
        &self,
        input: NewProduct,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Product> {
        let product_id = ProductId::new(AggregateId::new());
        let result = self.try_create(product_id, input, occurred_at).await;
        self.report(Operation::CreateProduct, Some(product_id), result, "product created")
    }

    async fn try_create(
        &self,
        product_id: ProductId,
        input: NewProduct,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Product> {
        let reference = self.reference_data(Operation::CreateProduct).await?;
        let facets = input.facets.resolve(&reference)?;

        let mut product = Product::empty(product_id);
        let event = decide(
            &product,
            ProductCommand::CreateProduct(CreateProduct {
                product_id,
                code: input.code,
                name: input.name,
                note: input.note,
                facets,
                initial_price: input.initial_price,
                occurred_at,
            }),
        )?;
        let ProductEvent::ProductCreated(created) = &event else {
            return Err(unexpected(&event));
        };

        self.repository
            .create_product(created)
            .await
            .map_err(|e| ServiceError::persistence(Operation::CreateProduct, Some(product_id), e))?;

        product.apply(&event);
        Ok(product)
    }

    #[instrument(skip(self, changes), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: ProductId,
        changes: ProductChanges,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Product> {
        let result = self.try_update(product_id, changes, occurred_at).await;
        self.report(Operation::UpdateProduct, Some(product_id), result, "product updated")
    }

    async fn try_update(
        &self,
        product_id: ProductId,
        changes: ProductChanges,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Product> {
        let op = Operation::UpdateProduct;
        let mut product = self.load(op, product_id).await?;

        let facets = match &changes.facets {
            Some(selection) => Some(selection.resolve(&self.reference_data(op).await?)?),
            None => None,
        };
        let event = decide(
            &product,
            ProductCommand::UpdateProduct(UpdateProduct {
                product_id,
                name: changes.name,
                note: changes.note,
                facets,
                active: changes.active,
                occurred_at,
            }),
        )?;
        let ProductEvent::ProductUpdated(updated) = &event else {
            return Err(unexpected(&event));
        };

        self.repository
            .update_product(updated, ExpectedVersion::Exact(product.version()))
            .await
            .map_err(|e| ServiceError::persistence(op, Some(product_id), e))?;

        product.apply(&event);
        Ok(product)
    }

    /// Append a price to the product's ledger.
    #[instrument(skip(self, reason), fields(product_id = %product_id, price = %price))]
    pub async fn change_price(
        &self,
        product_id: ProductId,
        price: Money,
        reason: Option<String>,
        effective_at: DateTime<Utc>,
    ) -> ServiceResult<Product> {
        let result = self.try_change_price(product_id, price, reason, effective_at).await;
        self.report(Operation::ChangePrice, Some(product_id), result, "price changed")
    }

    async fn try_change_price(
        &self,
        product_id: ProductId,
        price: Money,
        reason: Option<String>,
        effective_at: DateTime<Utc>,
    ) -> ServiceResult<Product> {
        let op = Operation::ChangePrice;
        let mut product = self.load(op, product_id).await?;

        let event = decide(
            &product,
            ProductCommand::ChangePrice(ChangePrice {
                product_id,
                price,
                reason,
                occurred_at: effective_at,
            }),
        )?;
        let ProductEvent::PriceChanged(changed) = &event else {
            return Err(unexpected(&event));
        };

        self.repository
            .append_price(product_id, &changed.entry, ExpectedVersion::Exact(product.version()))
            .await
            .map_err(|e| ServiceError::persistence(op, Some(product_id), e))?;

        product.apply(&event);
        Ok(product)
    }

    /// Record the stock level reported by inventory.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn record_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Product> {
        let result = self.try_record_stock(product_id, quantity, occurred_at).await;
        self.report(Operation::RecordStock, Some(product_id), result, "stock recorded")
    }

    async fn try_record_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Product> {
        let op = Operation::RecordStock;
        let mut product = self.load(op, product_id).await?;

        let event = decide(
            &product,
            ProductCommand::RecordStock(RecordStock {
                product_id,
                quantity,
                occurred_at,
            }),
        )?;
        let ProductEvent::StockRecorded(recorded) = &event else {
            return Err(unexpected(&event));
        };

        self.repository
            .record_stock(recorded, ExpectedVersion::Exact(product.version()))
            .await
            .map_err(|e| ServiceError::persistence(op, Some(product_id), e))?;

        product.apply(&event);
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get(&self, product_id: ProductId) -> ServiceResult<Product> {
        self.load(Operation::LoadProduct, product_id).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn current_price(&self, product_id: ProductId) -> ServiceResult<PriceEntry> {
        let product = self.load(Operation::LoadProduct, product_id).await?;
        Ok(product.current_price()?.clone())
    }

    /// Every price the product has had, as "from X to Y" rows, oldest first.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn price_history(&self, product_id: ProductId) -> ServiceResult<Vec<PriceChange>> {
        let product = self.load(Operation::PriceHistory, product_id).await?;
        let ledger = product.ledger().ok_or(CatalogError::EmptyLedger)?;
        Ok(ledger.changes().collect())
    }

    /// Filter the catalog and cut out one page (1-based).
    #[instrument(skip(self, criteria))]
    pub async fn list(&self, criteria: &FilterCriteria, page: usize) -> ServiceResult<Page<Product>> {
        let products = self
            .repository
            .list()
            .await
            .map_err(|e| ServiceError::persistence(Operation::ListProducts, None, e))?;

        let matched: Vec<Product> = filter(&products, criteria).into_iter().cloned().collect();
        tracing::debug!(total = products.len(), matched = matched.len(), "catalog filtered");

        Ok(paginate(matched, page, self.config.page_size))
    }

    /// Ticket for a filter query; issuing one supersedes every earlier query.
    pub fn begin_query(&self) -> RequestTicket {
        self.requests.issue()
    }

    /// [`Self::list`] for an interactive query. `None` when a newer query was
    /// started before this one completed; its result must not be shown.
    #[instrument(skip(self, criteria))]
    pub async fn query(
        &self,
        ticket: RequestTicket,
        criteria: &FilterCriteria,
        page: usize,
    ) -> ServiceResult<Option<Page<Product>>> {
        let result = self.list(criteria, page).await?;
        let accepted = self.requests.accept(ticket, result);
        if accepted.is_none() {
            tracing::debug!("discarding superseded filter result");
        }
        Ok(accepted)
    }

    /// Check filter facet ids against current reference data.
    ///
    /// Filtering with stale ids is allowed (they match nothing); this is for
    /// callers that want to tell the user.
    #[instrument(skip(self, criteria))]
    pub async fn validate_criteria(&self, criteria: &FilterCriteria) -> ServiceResult<()> {
        let reference = self.reference_data(Operation::ListProducts).await?;
        for (facet, id) in criteria.unknown_facets(&reference) {
            tracing::warn!(%facet, id = id.as_str(), "filter uses unknown facet id");
        }
        Ok(criteria.validate(&reference)?)
    }

    /// First deletion phase. Changes nothing.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn check_delete(&self, product_id: ProductId) -> ServiceResult<DeletionCheck> {
        let op = Operation::CheckDelete;
        let product = self.load(op, product_id).await?;
        let usage = self
            .usage
            .usage(product_id)
            .await
            .map_err(|e| ServiceError::collaborator(op, Some(product_id), e))?;

        let decision = product.can_delete(usage);
        if decision.approved() {
            tracing::info!("deletion approved");
        } else {
            tracing::warn!(reasons = ?decision.reasons(), "deletion refused");
        }

        Ok(DeletionCheck {
            product_id,
            version: product.version(),
            decision,
        })
    }

    /// Second deletion phase. Refused checks are rejected without touching
    /// persistence; approved ones are re-evaluated and committed only if the
    /// product is still at the checked version.
    #[instrument(skip(self, check), fields(product_id = %check.product_id, version = check.version))]
    pub async fn commit_delete(
        &self,
        check: &DeletionCheck,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let result = self.try_commit_delete(check, occurred_at).await;
        self.report(Operation::CommitDelete, Some(check.product_id), result, "product deleted")
    }

    async fn try_commit_delete(
        &self,
        check: &DeletionCheck,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let op = Operation::CommitDelete;
        let product_id = check.product_id;
        check.decision.clone().into_result()?;

        let product = self.load(op, product_id).await?;
        let expected = ExpectedVersion::Exact(check.version);
        expected.check(product.version())?;

        let usage = self
            .usage
            .usage(product_id)
            .await
            .map_err(|e| ServiceError::collaborator(op, Some(product_id), e))?;
        product.attempt_delete(usage, occurred_at)?;

        self.repository
            .delete_product(product_id, expected, occurred_at)
            .await
            .map_err(|e| ServiceError::persistence(op, Some(product_id), e))?;
        Ok(())
    }

    async fn load(&self, operation: Operation, product_id: ProductId) -> ServiceResult<Product> {
        let product = self
            .repository
            .get(product_id)
            .await
            .map_err(|e| ServiceError::persistence(operation, Some(product_id), e))?;
        match product {
            Some(product) => {
                tracing::debug!(version = product.version(), "product loaded");
                Ok(product)
            }
            None => Err(ServiceError::not_found()),
        }
    }

    async fn reference_data(&self, operation: Operation) -> ServiceResult<ReferenceData> {
        self.reference.load().await.map_err(|e| {
            ServiceError::collaborator(
                operation,
                None,
                e.context(Operation::LoadReferenceData.as_str()),
            )
        })
    }

    /// Log the outcome of a mutation and publish it on the matching channel.
    fn report<T>(
        &self,
        operation: Operation,
        product_id: Option<ProductId>,
        result: ServiceResult<T>,
        success: &str,
    ) -> ServiceResult<T> {
        match &result {
            Ok(_) => {
                tracing::info!(%operation, ?product_id, "{success}");
                self.notifier.success(Notice::new(operation, product_id, success));
            }
            Err(err) => {
                tracing::warn!(%operation, ?product_id, error = %err, "operation failed");
                self.notifier.error(Notice::new(operation, product_id, err.to_string()));
            }
        }
        result
    }
}
