//! Append-only price history of a product.
//!
//! Entries are never edited or removed. Correcting a price means appending a
//! new entry. Timestamps must be non-decreasing, so append order and
//! timestamp order coincide and the last entry is always the current price
//! (equal timestamps resolve to the later append).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Money, ValueObject};

use crate::error::CatalogError;

/// One immutable price record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    value: Money,
    effective_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl ValueObject for PriceEntry {}

impl PriceEntry {
    pub fn new(value: Money, effective_at: DateTime<Utc>) -> Self {
        Self {
            value,
            effective_at,
            reason: None,
        }
    }

    /// Attach a free-text reason for the change (blank reasons are dropped).
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.reason = (!reason.trim().is_empty()).then(|| reason.trim().to_string());
        self
    }

    pub fn value(&self) -> Money {
        self.value
    }

    pub fn effective_at(&self) -> DateTime<Utc> {
        self.effective_at
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// A "from X to Y" row derived from two consecutive entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceChange {
    /// `None` for the initial price.
    pub previous: Option<Money>,
    pub new: Money,
    pub effective_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Ordered, non-empty, append-only sequence of [`PriceEntry`].
///
/// Deserialisation replays every entry through the append rules, so a
/// ledger read back from storage satisfies the same invariants as one built
/// in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceEntry>", into = "Vec<PriceEntry>")]
pub struct PriceLedger {
    entries: Vec<PriceEntry>,
}

impl PriceLedger {
    /// Open a ledger with its mandatory initial price.
    pub fn new(initial: PriceEntry) -> Result<Self, CatalogError> {
        let mut ledger = Self { entries: Vec::new() };
        ledger.append_entry(initial)?;
        Ok(ledger)
    }

    /// Append a price effective at `effective_at`.
    pub fn append(
        &mut self,
        value: Money,
        effective_at: DateTime<Utc>,
    ) -> Result<&PriceEntry, CatalogError> {
        self.append_entry(PriceEntry::new(value, effective_at))
    }

    /// Append a fully-built entry. The ledger is untouched on error.
    pub fn append_entry(&mut self, entry: PriceEntry) -> Result<&PriceEntry, CatalogError> {
        self.check(&entry)?;
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Run the append rules against `entry` without recording it.
    pub fn check(&self, entry: &PriceEntry) -> Result<(), CatalogError> {
        if entry.value.is_negative() {
            return Err(CatalogError::InvalidValue(entry.value));
        }
        if let Some(latest) = self.entries.last() {
            if entry.effective_at < latest.effective_at {
                return Err(CatalogError::NonMonotonicTime {
                    latest: latest.effective_at,
                    attempted: entry.effective_at,
                });
            }
        }
        Ok(())
    }

    /// The entry with the latest effective timestamp.
    pub fn current(&self) -> Result<&PriceEntry, CatalogError> {
        self.entries.last().ok_or(CatalogError::EmptyLedger)
    }

    /// All entries, oldest first. Each call starts a fresh traversal.
    pub fn history(
        &self,
    ) -> impl DoubleEndedIterator<Item = &PriceEntry> + ExactSizeIterator + Clone + '_ {
        self.entries.iter()
    }

    /// One [`PriceChange`] per entry, oldest first.
    pub fn changes(&self) -> impl Iterator<Item = PriceChange> + '_ {
        let previous = core::iter::once(None).chain(self.entries.iter().map(|e| Some(e.value)));
        previous.zip(self.entries.iter()).map(|(previous, entry)| PriceChange {
            previous,
            new: entry.value,
            effective_at: entry.effective_at,
            reason: entry.reason.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<PriceEntry>> for PriceLedger {
    type Error = CatalogError;

    fn try_from(entries: Vec<PriceEntry>) -> Result<Self, Self::Error> {
        let mut entries = entries.into_iter();
        let first = entries.next().ok_or(CatalogError::EmptyLedger)?;
        let mut ledger = Self::new(first)?;
        for entry in entries {
            ledger.append_entry(entry)?;
        }
        Ok(ledger)
    }
}

impl From<PriceLedger> for Vec<PriceEntry> {
    fn from(ledger: PriceLedger) -> Self {
        ledger.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn ledger_at_ten() -> PriceLedger {
        PriceLedger::new(PriceEntry::new(cents(1_000), at(1))).unwrap()
    }

    #[test]
    fn initial_entry_is_current() {
        let ledger = ledger_at_ten();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.current().unwrap().value(), cents(1_000));
    }

    #[test]
    fn negative_initial_price_is_rejected() {
        let err = PriceLedger::new(PriceEntry::new(cents(-1), at(1))).unwrap_err();
        assert_eq!(err, CatalogError::InvalidValue(cents(-1)));
    }

    #[test]
    fn zero_is_a_valid_price() {
        let mut ledger = ledger_at_ten();
        ledger.append(Money::ZERO, at(2)).unwrap();
        assert_eq!(ledger.current().unwrap().value(), Money::ZERO);
    }

    #[test]
    fn price_change_scenario() {
        let mut ledger = ledger_at_ten();

        ledger.append(cents(1_250), at(2)).unwrap();
        assert_eq!(ledger.current().unwrap().value(), cents(1_250));

        let err = ledger.append(cents(900), at(1)).unwrap_err();
        assert_eq!(
            err,
            CatalogError::NonMonotonicTime {
                latest: at(2),
                attempted: at(1),
            }
        );

        let history: Vec<(i64, i64)> = ledger
            .history()
            .map(|e| (e.value().cents(), e.effective_at().timestamp()))
            .collect();
        assert_eq!(history, vec![(1_000, 1), (1_250, 2)]);
    }

    #[test]
    fn negative_append_leaves_ledger_unchanged() {
        let mut ledger = ledger_at_ten();
        let before = ledger.clone();

        let err = ledger.append(cents(-500), at(5)).unwrap_err();
        assert_eq!(err, CatalogError::InvalidValue(cents(-500)));
        assert_eq!(ledger, before);
    }

    #[test]
    fn equal_timestamps_resolve_to_later_append() {
        let mut ledger = ledger_at_ten();
        ledger.append(cents(2_000), at(1)).unwrap();
        assert_eq!(ledger.current().unwrap().value(), cents(2_000));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn changes_pair_each_entry_with_its_predecessor() {
        let mut ledger = ledger_at_ten();
        ledger
            .append_entry(PriceEntry::new(cents(1_250), at(2)).with_reason("supplier increase"))
            .unwrap();

        let rows: Vec<PriceChange> = ledger.changes().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].previous, None);
        assert_eq!(rows[0].new, cents(1_000));
        assert_eq!(rows[1].previous, Some(cents(1_000)));
        assert_eq!(rows[1].new, cents(1_250));
        assert_eq!(rows[1].reason.as_deref(), Some("supplier increase"));
    }

    #[test]
    fn blank_reason_is_dropped() {
        let entry = PriceEntry::new(cents(1), at(1)).with_reason("   ");
        assert_eq!(entry.reason(), None);
    }

    #[test]
    fn deserialisation_replays_append_rules() {
        let mut ledger = ledger_at_ten();
        ledger.append(cents(1_100), at(3)).unwrap();

        let entries: Vec<PriceEntry> = ledger.clone().into();
        assert_eq!(PriceLedger::try_from(entries.clone()).unwrap(), ledger);

        let reversed: Vec<PriceEntry> = entries.into_iter().rev().collect();
        assert!(matches!(
            PriceLedger::try_from(reversed),
            Err(CatalogError::NonMonotonicTime { .. })
        ));
        assert_eq!(PriceLedger::try_from(Vec::new()), Err(CatalogError::EmptyLedger));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        /// Non-negative prices at non-decreasing timestamps.
        fn price_series() -> impl Strategy<Value = Vec<(i64, i64)>> {
            prop::collection::vec((0i64..1_000_000, 0i64..1_000), 1..40).prop_map(|steps| {
                let mut t = 0;
                steps
                    .into_iter()
                    .map(|(value, gap)| {
                        t += gap;
                        (value, t)
                    })
                    .collect()
            })
        }

        proptest! {
            /// Property: after n valid appends the last value is current.
            #[test]
            fn last_append_is_current(series in price_series()) {
                let (first_value, first_t) = series[0];
                let mut ledger = PriceLedger::new(PriceEntry::new(cents(first_value), at(first_t))).unwrap();
                for &(value, t) in &series[1..] {
                    ledger.append(cents(value), at(t)).unwrap();
                }

                let (last_value, _) = series[series.len() - 1];
                prop_assert_eq!(ledger.current().unwrap().value(), cents(last_value));
                prop_assert_eq!(ledger.history().count(), series.len());
            }

            /// Property: history is restartable and ordered by timestamp.
            #[test]
            fn history_is_restartable(series in price_series()) {
                let mut ledger = PriceLedger::new(PriceEntry::new(cents(series[0].0), at(series[0].1))).unwrap();
                for &(value, t) in &series[1..] {
                    ledger.append(cents(value), at(t)).unwrap();
                }

                let first: Vec<&PriceEntry> = ledger.history().collect();
                let second: Vec<&PriceEntry> = ledger.history().collect();
                prop_assert_eq!(&first, &second);
                prop_assert!(first.windows(2).all(|w| w[0].effective_at() <= w[1].effective_at()));
            }

            /// Property: rejected appends never mutate the ledger.
            #[test]
            fn rejected_appends_leave_ledger_unchanged(
                series in price_series(),
                negative in i64::MIN..0,
                back in 1i64..100,
            ) {
                let mut ledger = PriceLedger::new(PriceEntry::new(cents(series[0].0), at(series[0].1))).unwrap();
                for &(value, t) in &series[1..] {
                    ledger.append(cents(value), at(t)).unwrap();
                }
                let before = ledger.clone();
                let latest = ledger.current().unwrap().effective_at();

                let invalid = ledger.append(cents(negative), latest).map(|_| ());
                prop_assert_eq!(invalid, Err(CatalogError::InvalidValue(cents(negative))));
                prop_assert_eq!(&ledger, &before);

                let earlier = latest - chrono::Duration::seconds(back);
                let stale = ledger.append(Money::ZERO, earlier).map(|_| ());
                prop_assert!(
                    matches!(stale, Err(CatalogError::NonMonotonicTime { .. })),
                    "expected NonMonotonicTime, got {:?}",
                    stale
                );
                prop_assert_eq!(&ledger, &before);
            }
        }
    }
}
