//! Facets: the four independent classification dimensions of a product.
//!
//! Facet options (the lookup lists) are reference data owned elsewhere; the
//! catalog only reads them. A product points at options through [`FacetRef`].

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult};

use crate::error::CatalogError;

/// Maximum length of a facet option name.
pub const OPTION_NAME_MAX_LEN: usize = 30;

/// Classification dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
    Type,
    Color,
    Material,
    Size,
}

impl FacetKind {
    pub const ALL: [FacetKind; 4] = [
        FacetKind::Type,
        FacetKind::Color,
        FacetKind::Material,
        FacetKind::Size,
    ];

    /// Normalise a raw option code according to the dimension's code rules.
    ///
    /// - type: exactly 2 letters
    /// - color, material: exactly 3 letters
    /// - size: 1 to 3 characters, truncated to 3 and left-padded with `0`
    ///
    /// Codes are upper-cased and trimmed first.
    pub fn normalize_code(self, raw: &str) -> DomainResult<String> {
        let code = raw.trim().to_uppercase();
        match self {
            FacetKind::Type => letters(self, code, 2),
            FacetKind::Color | FacetKind::Material => letters(self, code, 3),
            FacetKind::Size => {
                if code.is_empty() {
                    return Err(DomainError::validation("size code cannot be empty"));
                }
                let truncated: String = code.chars().take(3).collect();
                Ok(format!("{truncated:0>3}"))
            }
        }
    }
}

fn letters(kind: FacetKind, code: String, len: usize) -> DomainResult<String> {
    if code.chars().count() != len || !code.chars().all(|c| c.is_alphabetic()) {
        return Err(DomainError::validation(format!(
            "{kind} code must be exactly {len} letters (got {code:?})"
        )));
    }
    Ok(code)
}

impl core::fmt::Display for FacetKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            FacetKind::Type => "type",
            FacetKind::Color => "color",
            FacetKind::Material => "material",
            FacetKind::Size => "size",
        })
    }
}

/// Identifier of a facet option, as issued by the reference data provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetId(String);

impl FacetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl core::fmt::Display for FacetId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FacetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FacetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A product's pointer to a facet option: id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetRef {
    pub id: FacetId,
    pub name: String,
}

impl FacetRef {
    pub fn new(id: impl Into<FacetId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Reference-data record for one facet option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOption {
    pub id: FacetId,
    pub name: String,
    pub code: String,
}

impl FacetOption {
    /// Build an option, validating the name and normalising the code for `kind`.
    pub fn new(
        kind: FacetKind,
        id: impl Into<FacetId>,
        name: impl Into<String>,
        code: &str,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation(format!("{kind} name cannot be empty")));
        }
        if name.chars().count() > OPTION_NAME_MAX_LEN {
            return Err(DomainError::validation(format!(
                "{kind} name exceeds {OPTION_NAME_MAX_LEN} characters"
            )));
        }
        Ok(Self {
            id: id.into(),
            name,
            code: kind.normalize_code(code)?,
        })
    }

    pub fn to_ref(&self) -> FacetRef {
        FacetRef::new(self.id.clone(), self.name.clone())
    }
}

/// The facet references held by one product. Each dimension may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub product_type: Option<FacetRef>,
    pub color: Option<FacetRef>,
    pub material: Option<FacetRef>,
    pub size: Option<FacetRef>,
}

impl Facets {
    pub fn get(&self, kind: FacetKind) -> Option<&FacetRef> {
        match kind {
            FacetKind::Type => self.product_type.as_ref(),
            FacetKind::Color => self.color.as_ref(),
            FacetKind::Material => self.material.as_ref(),
            FacetKind::Size => self.size.as_ref(),
        }
    }

    pub fn with(mut self, kind: FacetKind, reference: FacetRef) -> Self {
        let slot = match kind {
            FacetKind::Type => &mut self.product_type,
            FacetKind::Color => &mut self.color,
            FacetKind::Material => &mut self.material,
            FacetKind::Size => &mut self.size,
        };
        *slot = Some(reference);
        self
    }
}

/// Immutable lookup sets for all four dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    types: Vec<FacetOption>,
    colors: Vec<FacetOption>,
    materials: Vec<FacetOption>,
    sizes: Vec<FacetOption>,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion used when assembling a snapshot.
    pub fn with_option(mut self, kind: FacetKind, option: FacetOption) -> Self {
        self.slot_mut(kind).push(option);
        self
    }

    pub fn options(&self, kind: FacetKind) -> &[FacetOption] {
        match kind {
            FacetKind::Type => &self.types,
            FacetKind::Color => &self.colors,
            FacetKind::Material => &self.materials,
            FacetKind::Size => &self.sizes,
        }
    }

    pub fn contains(&self, kind: FacetKind, id: &FacetId) -> bool {
        self.options(kind).iter().any(|o| &o.id == id)
    }

    /// Resolve an id into a reference usable on a product.
    pub fn resolve(&self, kind: FacetKind, id: &FacetId) -> Result<FacetRef, CatalogError> {
        self.options(kind)
            .iter()
            .find(|o| &o.id == id)
            .map(FacetOption::to_ref)
            .ok_or_else(|| CatalogError::UnknownFacetId {
                facet: kind,
                id: id.clone(),
            })
    }

    fn slot_mut(&mut self, kind: FacetKind) -> &mut Vec<FacetOption> {
        match kind {
            FacetKind::Type => &mut self.types,
            FacetKind::Color => &mut self.colors,
            FacetKind::Material => &mut self.materials,
            FacetKind::Size => &mut self.sizes,
        }
    }
}
