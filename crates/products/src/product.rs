use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money};
use storefront_events::Event;

use crate::error::CatalogError;
use crate::facet::{FacetId, FacetKind, Facets};
use crate::filter::{FilterCriteria, Filterable};
use crate::guard::{DeletionDecision, DeletionGuard, Usage};
use crate::ledger::{PriceEntry, PriceLedger};

/// Maximum length of a product name.
pub const NAME_MAX_LEN: usize = 30;

/// Maximum length of the free-text note.
pub const NOTE_MAX_LEN: usize = 30;

/// Stream name used when journaling product events.
pub const AGGREGATE_TYPE: &str = "products.product";

/// Product identifier.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Product.
///
/// Non-price fields change through [`UpdateProduct`]; the price only through
/// the ledger ([`ChangePrice`]). Stock is owned by inventory and only recorded
/// here so the deletion guard can read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    code: String,
    name: String,
    note: Option<String>,
    active: bool,
    facets: Facets,
    stock: u32,
    ledger: Option<PriceLedger>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            code: String::new(),
            name: String::new(),
            note: None,
            active: false,
            facets: Facets::default(),
            stock: 0,
            ledger: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    /// Rebuild a product from its event history.
    pub fn replay<'a>(id: ProductId, events: impl IntoIterator<Item = &'a ProductEvent>) -> Self {
        let mut product = Self::empty(id);
        for event in events {
            product.apply(event);
        }
        product
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// The price ledger. `None` only before creation.
    pub fn ledger(&self) -> Option<&PriceLedger> {
        self.ledger.as_ref()
    }

    /// Latest ledger entry.
    pub fn current_price(&self) -> Result<&PriceEntry, CatalogError> {
        self.ledger
            .as_ref()
            .ok_or(CatalogError::EmptyLedger)?
            .current()
    }

    /// Does this product satisfy `criteria`?
    pub fn matches(&self, criteria: &FilterCriteria) -> bool {
        criteria.matches(self)
    }

    /// First phase of deletion: evaluate the guard without changing anything.
    pub fn can_delete(&self, usage: Usage) -> DeletionDecision {
        DeletionGuard::can_delete(self, usage)
    }

    /// Second phase of deletion: on approval, the event that signals removal.
    pub fn attempt_delete(
        &self,
        usage: Usage,
        occurred_at: DateTime<Utc>,
    ) -> Result<ProductEvent, CatalogError> {
        let events = self.handle(&ProductCommand::DeleteProduct(DeleteProduct {
            product_id: self.id,
            usage,
            occurred_at,
        }))?;
        events
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::invariant("deletion produced no event").into())
    }
}

impl Filterable for Product {
    fn search_fields(&self) -> [Option<&str>; 3] {
        [Some(self.code.as_str()), Some(self.name.as_str()), self.note.as_deref()]
    }

    fn facet_id(&self, kind: FacetKind) -> Option<&FacetId> {
        self.facets.get(kind).map(|f| &f.id)
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct. The initial price is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub note: Option<String>,
    pub facets: Facets,
    pub initial_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct. `None` leaves a field as is; `note: Some("")`
/// clears the note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub note: Option<String>,
    pub facets: Option<Facets>,
    pub active: Option<bool>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangePrice. `occurred_at` is the effective timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePrice {
    pub product_id: ProductId,
    pub price: Money,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordStock (stock level observed from inventory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStock {
    pub product_id: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteProduct, carrying the usage-lookup answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProduct {
    pub product_id: ProductId,
    pub usage: Usage,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    UpdateProduct(UpdateProduct),
    ChangePrice(ChangePrice),
    RecordStock(RecordStock),
    DeleteProduct(DeleteProduct),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub note: Option<String>,
    pub facets: Facets,
    pub initial_price: PriceEntry,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductUpdated (resulting values of every editable field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub name: String,
    pub note: Option<String>,
    pub facets: Facets,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriceChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChanged {
    pub product_id: ProductId,
    pub previous: Money,
    pub entry: PriceEntry,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecorded {
    pub product_id: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeleted {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductUpdated(ProductUpdated),
    PriceChanged(PriceChanged),
    StockRecorded(StockRecorded),
    ProductDeleted(ProductDeleted),
}

impl ProductEvent {
    pub fn product_id(&self) -> ProductId {
        match self {
            ProductEvent::ProductCreated(e) => e.product_id,
            ProductEvent::ProductUpdated(e) => e.product_id,
            ProductEvent::PriceChanged(e) => e.product_id,
            ProductEvent::StockRecorded(e) => e.product_id,
            ProductEvent::ProductDeleted(e) => e.product_id,
        }
    }
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductUpdated(_) => "products.product.updated",
            ProductEvent::PriceChanged(_) => "products.product.price_changed",
            ProductEvent::StockRecorded(_) => "products.product.stock_recorded",
            ProductEvent::ProductDeleted(_) => "products.product.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductUpdated(e) => e.occurred_at,
            ProductEvent::PriceChanged(e) => e.occurred_at,
            ProductEvent::StockRecorded(e) => e.occurred_at,
            ProductEvent::ProductDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = CatalogError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.code = e.code.clone();
                self.name = e.name.clone();
                self.note = e.note.clone();
                self.facets = e.facets.clone();
                self.active = true;
                self.ledger = PriceLedger::new(e.initial_price.clone()).ok();
                debug_assert!(self.ledger.is_some(), "ProductCreated with invalid price");
                self.created = true;
            }
            ProductEvent::ProductUpdated(e) => {
                self.name = e.name.clone();
                self.note = e.note.clone();
                self.facets = e.facets.clone();
                self.active = e.active;
            }
            ProductEvent::PriceChanged(e) => {
                if let Some(ledger) = self.ledger.as_mut() {
                    let appended = ledger.append_entry(e.entry.clone()).is_ok();
                    debug_assert!(appended, "PriceChanged out of ledger order");
                }
            }
            ProductEvent::StockRecorded(e) => {
                self.stock = e.quantity;
            }
            ProductEvent::ProductDeleted(_) => {
                self.deleted = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::UpdateProduct(cmd) => self.handle_update(cmd),
            ProductCommand::ChangePrice(cmd) => self.handle_change_price(cmd),
            ProductCommand::RecordStock(cmd) => self.handle_record_stock(cmd),
            ProductCommand::DeleteProduct(cmd) => self.handle_delete(cmd),
        }
    }
}

/// Trimmed name, or why it is not acceptable.
pub fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "name exceeds {NAME_MAX_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Trimmed note (`None` when blank), or why it is not acceptable.
pub fn validate_note(note: Option<&str>) -> Result<Option<String>, DomainError> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if note.chars().count() > NOTE_MAX_LEN {
        return Err(DomainError::validation(format!(
            "note exceeds {NOTE_MAX_LEN} characters"
        )));
    }
    Ok(Some(note.to_string()))
}

impl Product {
    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.exists() {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, CatalogError> {
        if self.created {
            return Err(DomainError::conflict("product already exists").into());
        }

        let code = cmd.code.trim();
        if code.is_empty() {
            return Err(DomainError::validation("code cannot be empty").into());
        }
        let name = validate_name(&cmd.name)?;
        let note = validate_note(cmd.note.as_deref())?;

        // Code uniqueness needs the whole catalog; persistence enforces it.
        let initial_price = PriceEntry::new(cmd.initial_price, cmd.occurred_at);
        PriceLedger::new(initial_price.clone())?;

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            code: code.to_string(),
            name,
            note,
            facets: cmd.facets.clone(),
            initial_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, CatalogError> {
        self.ensure_exists()?;
        self.ensure_product_id(cmd.product_id)?;

        let name = match &cmd.name {
            Some(name) => validate_name(name)?,
            None => self.name.clone(),
        };
        let note = match &cmd.note {
            Some(note) => validate_note(Some(note))?,
            None => self.note.clone(),
        };
        let facets = cmd.facets.clone().unwrap_or_else(|| self.facets.clone());
        let active = cmd.active.unwrap_or(self.active);

        if name == self.name && note == self.note && facets == self.facets && active == self.active
        {
            return Err(DomainError::conflict("update changes nothing").into());
        }

        Ok(vec![ProductEvent::ProductUpdated(ProductUpdated {
            product_id: cmd.product_id,
            name,
            note,
            facets,
            active,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_price(&self, cmd: &ChangePrice) -> Result<Vec<ProductEvent>, CatalogError> {
        self.ensure_exists()?;
        self.ensure_product_id(cmd.product_id)?;

        let ledger = self.ledger.as_ref().ok_or(CatalogError::EmptyLedger)?;
        let previous = ledger.current()?.value();

        let mut entry = PriceEntry::new(cmd.price, cmd.occurred_at);
        if let Some(reason) = &cmd.reason {
            entry = entry.with_reason(reason.as_str());
        }
        ledger.check(&entry)?;

        Ok(vec![ProductEvent::PriceChanged(PriceChanged {
            product_id: cmd.product_id,
            previous,
            entry,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_stock(&self, cmd: &RecordStock) -> Result<Vec<ProductEvent>, CatalogError> {
        self.ensure_exists()?;
        self.ensure_product_id(cmd.product_id)?;

        Ok(vec![ProductEvent::StockRecorded(StockRecorded {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteProduct) -> Result<Vec<ProductEvent>, CatalogError> {
        self.ensure_exists()?;
        self.ensure_product_id(cmd.product_id)?;

        self.can_delete(cmd.usage).into_result()?;

        Ok(vec![ProductEvent::ProductDeleted(ProductDeleted {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
