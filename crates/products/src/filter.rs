//! Catalog filter engine: free-text search plus facet equality.
//!
//! Criteria are request-scoped values handed in by the caller; the engine keeps
//! no state between calls. Filtering is stable (input order is preserved).

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::facet::{FacetId, FacetKind, ReferenceData};

/// What the filter engine needs to know about a row.
pub trait Filterable {
    /// Fields searched by free text (code, name, note).
    fn search_fields(&self) -> [Option<&str>; 3];

    /// Id of the facet option set on `kind`, if any.
    fn facet_id(&self, kind: FacetKind) -> Option<&FacetId>;
}

/// Active filters. Empty search text or an absent/blank id means "no
/// constraint" on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub type_id: Option<FacetId>,
    #[serde(default)]
    pub color_id: Option<FacetId>,
    #[serde(default)]
    pub material_id: Option<FacetId>,
    #[serde(default)]
    pub size_id: Option<FacetId>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_facet(mut self, kind: FacetKind, id: impl Into<FacetId>) -> Self {
        let id = Some(id.into());
        match kind {
            FacetKind::Type => self.type_id = id,
            FacetKind::Color => self.color_id = id,
            FacetKind::Material => self.material_id = id,
            FacetKind::Size => self.size_id = id,
        }
        self
    }

    /// Active facet constraint on `kind`.
    pub fn facet(&self, kind: FacetKind) -> Option<&FacetId> {
        let id = match kind {
            FacetKind::Type => self.type_id.as_ref(),
            FacetKind::Color => self.color_id.as_ref(),
            FacetKind::Material => self.material_id.as_ref(),
            FacetKind::Size => self.size_id.as_ref(),
        };
        id.filter(|id| !id.is_empty())
    }

    /// Normalised search needle, `None` when search is inactive.
    pub fn needle(&self) -> Option<String> {
        let trimmed = self.search.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.needle().is_none() && FacetKind::ALL.iter().all(|k| self.facet(*k).is_none())
    }

    /// Active facet ids that `reference` does not know about.
    ///
    /// Such ids are stale (e.g. the option was removed after the criteria were
    /// built). Filtering with them still works and simply matches nothing on
    /// that dimension.
    pub fn unknown_facets<'a>(&'a self, reference: &ReferenceData) -> Vec<(FacetKind, &'a FacetId)> {
        FacetKind::ALL
            .iter()
            .filter_map(|&kind| self.facet(kind).map(|id| (kind, id)))
            .filter(|(kind, id)| !reference.contains(*kind, id))
            .collect()
    }

    /// Fail with the first stale facet id, if any.
    pub fn validate(&self, reference: &ReferenceData) -> Result<(), CatalogError> {
        match self.unknown_facets(reference).first() {
            Some((facet, id)) => Err(CatalogError::UnknownFacetId {
                facet: *facet,
                id: (*id).clone(),
            }),
            None => Ok(()),
        }
    }

    /// Does `item` satisfy every active criterion?
    pub fn matches<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        Predicate::new(self).test(item)
    }
}

/// Criteria with the search needle lower-cased once per filter run.
struct Predicate<'c> {
    needle: Option<String>,
    criteria: &'c FilterCriteria,
}

impl<'c> Predicate<'c> {
    fn new(criteria: &'c FilterCriteria) -> Self {
        Self {
            needle: criteria.needle(),
            criteria,
        }
    }

    fn test<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        self.search_matches(item) && self.facets_match(item)
    }

    fn search_matches<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        let Some(needle) = &self.needle else {
            return true;
        };
        item.search_fields()
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle.as_str()))
    }

    fn facets_match<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        FacetKind::ALL.iter().all(|&kind| match self.criteria.facet(kind) {
            None => true,
            Some(wanted) => item.facet_id(kind) == Some(wanted),
        })
    }
}

/// Keep the items matching `criteria`, in their original order.
pub fn filter<'a, T, I>(items: I, criteria: &FilterCriteria) -> Vec<&'a T>
where
    T: Filterable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let predicate = Predicate::new(criteria);
    items.into_iter().filter(|item| predicate.test(*item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::{FacetOption, FacetRef, Facets};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        code: String,
        name: String,
        note: Option<String>,
        facets: Facets,
    }

    impl Filterable for Row {
        fn search_fields(&self) -> [Option<&str>; 3] {
            [Some(self.code.as_str()), Some(self.name.as_str()), self.note.as_deref()]
        }

        fn facet_id(&self, kind: FacetKind) -> Option<&FacetId> {
            self.facets.get(kind).map(|f| &f.id)
        }
    }

    fn row(code: &str, name: &str, note: Option<&str>, facets: Facets) -> Row {
        Row {
            code: code.to_string(),
            name: name.to_string(),
            note: note.map(str::to_string),
            facets,
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            row(
                "AN-001",
                "Anel Solitario",
                Some("banhado"),
                Facets::default()
                    .with(FacetKind::Type, FacetRef::new("t-ring", "Anel"))
                    .with(FacetKind::Color, FacetRef::new("c-gold", "Dourado")),
            ),
            row(
                "BR-002",
                "Brinco Argola",
                None,
                Facets::default().with(FacetKind::Color, FacetRef::new("c-silver", "Prata")),
            ),
            row(
                "AN-003",
                "Anel Aparador",
                Some("Prata 925"),
                Facets::default()
                    .with(FacetKind::Type, FacetRef::new("t-ring", "Anel"))
                    .with(FacetKind::Color, FacetRef::new("c-silver", "Prata")),
            ),
        ]
    }

    fn codes(found: &[&Row]) -> Vec<String> {
        found.iter().map(|r| r.code.clone()).collect()
    }

    #[test]
    fn empty_criteria_returns_everything_in_order() {
        let rows = rows();
        let found = filter(&rows, &FilterCriteria::new());
        assert_eq!(codes(&found), vec!["AN-001", "BR-002", "AN-003"]);
        assert!(FilterCriteria::new().with_search("   ").is_empty());
    }

    #[test]
    fn search_is_case_insensitive_over_code_name_and_note() {
        let rows = rows();

        let by_name = filter(&rows, &FilterCriteria::new().with_search("ANEL"));
        assert_eq!(codes(&by_name), vec!["AN-001", "AN-003"]);

        let by_code = filter(&rows, &FilterCriteria::new().with_search("br-0"));
        assert_eq!(codes(&by_code), vec!["BR-002"]);

        let by_note = filter(&rows, &FilterCriteria::new().with_search("925"));
        assert_eq!(codes(&by_note), vec!["AN-003"]);
    }

    #[test]
    fn search_does_not_span_field_boundaries() {
        let rows = rows();
        // "001" ends the code and "Anel" starts the name.
        let found = filter(&rows, &FilterCriteria::new().with_search("001anel"));
        assert!(found.is_empty());
    }

    #[test]
    fn facet_filters_are_exact_and_combine_with_and() {
        let rows = rows();

        let silver = filter(&rows, &FilterCriteria::new().with_facet(FacetKind::Color, "c-silver"));
        assert_eq!(codes(&silver), vec!["BR-002", "AN-003"]);

        let silver_rings = filter(
            &rows,
            &FilterCriteria::new()
                .with_facet(FacetKind::Color, "c-silver")
                .with_facet(FacetKind::Type, "t-ring"),
        );
        assert_eq!(codes(&silver_rings), vec!["AN-003"]);

        let silver_rings_named_brinco = filter(
            &rows,
            &FilterCriteria::new()
                .with_search("brinco")
                .with_facet(FacetKind::Type, "t-ring"),
        );
        assert!(silver_rings_named_brinco.is_empty());
    }

    #[test]
    fn unset_facet_never_matches_an_active_filter() {
        let rows = rows();
        let found = filter(&rows, &FilterCriteria::new().with_facet(FacetKind::Material, "m-gold"));
        assert!(found.is_empty());
    }

    #[test]
    fn blank_facet_id_is_no_constraint() {
        let rows = rows();
        let found = filter(&rows, &FilterCriteria::new().with_facet(FacetKind::Size, ""));
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn stale_facet_id_fails_closed_and_is_reported() {
        let rows = rows();
        let criteria = FilterCriteria::new().with_facet(FacetKind::Color, "c-removed");
        assert!(filter(&rows, &criteria).is_empty());

        let reference = ReferenceData::new().with_option(
            FacetKind::Color,
            FacetOption::new(FacetKind::Color, "c-silver", "Prata", "PRT").unwrap(),
        );
        let unknown = criteria.unknown_facets(&reference);
        assert_eq!(unknown, vec![(FacetKind::Color, &FacetId::new("c-removed"))]);
        assert!(matches!(
            criteria.validate(&reference),
            Err(CatalogError::UnknownFacetId { facet: FacetKind::Color, .. })
        ));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
            let color = prop::option::of(prop::sample::select(vec!["c1", "c2", "c3"]));
            prop::collection::vec(("[A-Z]{2}-[0-9]{3}", "[A-Za-z ]{1,20}", color), 0..30).prop_map(
                |specs| {
                    specs
                        .into_iter()
                        .map(|(code, name, color)| {
                            let facets = match color {
                                Some(id) => Facets::default().with(FacetKind::Color, FacetRef::new(id, id)),
                                None => Facets::default(),
                            };
                            row(&code, &name, None, facets)
                        })
                        .collect()
                },
            )
        }

        proptest! {
            /// Property: empty criteria is the identity.
            #[test]
            fn empty_criteria_is_identity(rows in arb_rows()) {
                let found: Vec<Row> = filter(&rows, &FilterCriteria::new()).into_iter().cloned().collect();
                prop_assert_eq!(found, rows);
            }

            /// Property: the result is an order-preserving subsequence of the input.
            #[test]
            fn result_is_stable_subsequence(rows in arb_rows(), search in "[a-z]{0,2}") {
                let criteria = FilterCriteria::new().with_search(search).with_facet(FacetKind::Color, "c2");
                let found = filter(&rows, &criteria);

                let mut cursor = rows.iter();
                for item in &found {
                    prop_assert!(cursor.any(|r| core::ptr::eq(r, *item)));
                }
                for item in &rows {
                    let kept = found.iter().any(|f| core::ptr::eq(*f, item));
                    prop_assert_eq!(kept, criteria.matches(item));
                }
            }

            /// Property: a facet id no row carries yields the empty set.
            #[test]
            fn absent_facet_id_matches_nothing(rows in arb_rows()) {
                let criteria = FilterCriteria::new().with_facet(FacetKind::Color, "c-none");
                prop_assert!(filter(&rows, &criteria).is_empty());
            }
        }
    }
}
