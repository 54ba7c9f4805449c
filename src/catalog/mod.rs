//! Price Catalog
//!
//! An immutable `item -> (vendor -> unit price)` view built once from raw
//! [`PriceRecord`]s, plus the set of vendors that appear in it.

use std::collections::{BTreeMap, BTreeSet};

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::shopping::ShoppingList;

pub mod document;

pub use document::document_id;

/// Errors raised while building a catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No records remained after filtering.
    #[error("no usable price records after filtering")]
    Empty,

    /// A record carried a negative unit price.
    #[error("negative unit price {price} for {item} at {vendor}")]
    NegativePrice {
        /// Item name
        item: String,
        /// Vendor name
        vendor: String,
        /// Offending price
        price: Decimal,
    },

    /// More than one record was supplied for the same item and vendor.
    #[error("duplicate price record for {item} at {vendor}")]
    DuplicateRecord {
        /// Item name
        item: String,
        /// Vendor name
        vendor: String,
    },
}

/// How to treat several records for the same item and vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The record seen last replaces earlier ones (upsert semantics).
    #[default]
    LastWriteWins,

    /// Any duplicate fails the build.
    Reject,
}

/// A single unit price offered by a vendor for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Item name
    pub item: String,

    /// Vendor name
    pub vendor: String,

    /// Price for one unit of the item
    pub unit_price: Decimal,

    /// When the price was last observed, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

impl PriceRecord {
    /// Create a new record without a timestamp.
    pub fn new(item: impl Into<String>, vendor: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            item: item.into(),
            vendor: vendor.into(),
            unit_price,
            last_updated: None,
        }
    }

    /// Key under which the record is stored by document stores.
    pub fn document_id(&self) -> String {
        document_id(&self.vendor, &self.item)
    }
}

/// Price Catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceCatalog {
    prices: BTreeMap<String, BTreeMap<String, Decimal>>,
    vendors: BTreeSet<String>,
}

impl PriceCatalog {
    /// Build a catalog with an explicit duplicate policy.
    ///
    /// When `restrict_to` is given, records for items not on the list are dropped
    /// before anything else, so the vendor set only contains vendors that offer at
    /// least one listed item.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Empty`] if no records remain after filtering,
    /// [`CatalogError::NegativePrice`] for a negative unit price, and
    /// [`CatalogError::DuplicateRecord`] for a repeated item/vendor pair under
    /// [`DuplicatePolicy::Reject`].
    pub fn build_with_policy<I>(
        records: I,
        restrict_to: Option<&ShoppingList>,
        policy: DuplicatePolicy,
    ) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = PriceRecord>,
    {
        let mut prices: BTreeMap<String, BTreeMap<String, Decimal>> = BTreeMap::new();
        let mut vendors = BTreeSet::new();
        let mut skipped = 0_usize;

        for record in records {
            if let Some(list) = restrict_to
                && !list.contains(&record.item)
            {
                skipped += 1;
                continue;
            }

            if record.unit_price < Decimal::ZERO {
                return Err(CatalogError::NegativePrice {
                    item: record.item,
                    vendor: record.vendor,
                    price: record.unit_price,
                });
            }

            let offers = prices.entry(record.item.clone()).or_default();

            if offers.contains_key(&record.vendor) {
                if policy == DuplicatePolicy::Reject {
                    return Err(CatalogError::DuplicateRecord {
                        item: record.item,
                        vendor: record.vendor,
                    });
                }

                warn!(
                    item = %record.item,
                    vendor = %record.vendor,
                    price = %record.unit_price,
                    "replacing earlier price record"
                );
            }

            vendors.insert(record.vendor.clone());
            offers.insert(record.vendor, record.unit_price);
        }

        if prices.is_empty() {
            return Err(CatalogError::Empty);
        }

        debug!(
            items = prices.len(),
            vendors = vendors.len(),
            skipped,
            "built price catalog"
        );

        Ok(Self { prices, vendors })
    }

    /// Iterate over item names in lexical order.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    /// All vendors appearing in the catalog, in lexical order.
    pub fn vendors(&self) -> &BTreeSet<String> {
        &self.vendors
    }

    /// Vendor offers for an item, keyed by vendor name.
    pub fn offers(&self, item: &str) -> Option<&BTreeMap<String, Decimal>> {
        self.prices.get(item)
    }

    /// Unit price of an item at a vendor.
    pub fn price(&self, item: &str, vendor: &str) -> Option<Decimal> {
        self.prices.get(item)?.get(vendor).copied()
    }

    /// Returns `true` if at least one vendor offers the item.
    pub fn contains_item(&self, item: &str) -> bool {
        self.prices.get(item).is_some_and(|offers| !offers.is_empty())
    }

    /// Number of distinct items in the catalog.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Returns `true` if the catalog has no items. Never true for a built catalog.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Build a catalog from raw records, keeping the last record seen for each
/// item/vendor pair.
///
/// # Errors
///
/// See [`PriceCatalog::build_with_policy`].
pub fn build_catalog<I>(
    records: I,
    restrict_to: Option<&ShoppingList>,
) -> Result<PriceCatalog, CatalogError>
where
    I: IntoIterator<Item = PriceRecord>,
{
    PriceCatalog::build_with_policy(records, restrict_to, DuplicatePolicy::LastWriteWins)
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;
    use testresult::TestResult;

    use super::*;

    fn records() -> Vec<PriceRecord> {
        vec![
            PriceRecord::new("Milk", "Corner Shop", dec!(8.00)),
            PriceRecord::new("Eggs", "Corner Shop", dec!(22.00)),
            PriceRecord::new("Milk", "Warehouse", dec!(7.50)),
            PriceRecord::new("Bread", "Bakery", dec!(4.00)),
        ]
    }

    #[test]
    fn builds_nested_price_map() -> TestResult {
        let catalog = build_catalog(records(), None)?;

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.price("Milk", "Warehouse"), Some(dec!(7.50)));
        assert_eq!(catalog.price("Eggs", "Warehouse"), None);
        assert_eq!(
            catalog.vendors().iter().collect::<Vec<_>>(),
            ["Bakery", "Corner Shop", "Warehouse"]
        );

        Ok(())
    }

    #[test]
    fn restricting_drops_items_and_their_only_vendors() -> TestResult {
        let list = ShoppingList::new(["Milk", "Eggs"])?;
        let catalog = build_catalog(records(), Some(&list))?;

        assert!(!catalog.contains_item("Bread"));
        assert!(!catalog.vendors().contains("Bakery"));
        assert_eq!(catalog.items().collect::<Vec<_>>(), ["Eggs", "Milk"]);

        Ok(())
    }

    #[test]
    fn every_vendor_offers_something() -> TestResult {
        let catalog = build_catalog(records(), None)?;

        for vendor in catalog.vendors() {
            let offers_something = catalog
                .items()
                .any(|item| catalog.price(item, vendor).is_some());

            assert!(offers_something, "{vendor} offers nothing");
        }

        Ok(())
    }

    #[test]
    fn empty_after_filtering_is_an_error() -> TestResult {
        let list = ShoppingList::new(["Caviar"])?;

        assert_eq!(build_catalog(records(), Some(&list)), Err(CatalogError::Empty));
        assert_eq!(build_catalog(Vec::new(), None), Err(CatalogError::Empty));

        Ok(())
    }

    #[test]
    fn last_write_wins_by_default() -> TestResult {
        let mut records = records();
        records.push(PriceRecord::new("Milk", "Warehouse", dec!(6.90)));

        let catalog = build_catalog(records, None)?;

        assert_eq!(catalog.price("Milk", "Warehouse"), Some(dec!(6.90)));

        Ok(())
    }

    #[test]
    fn reject_policy_refuses_duplicates() {
        let mut records = records();
        records.push(PriceRecord::new("Milk", "Warehouse", dec!(6.90)));

        let result = PriceCatalog::build_with_policy(records, None, DuplicatePolicy::Reject);

        assert_eq!(
            result,
            Err(CatalogError::DuplicateRecord {
                item: "Milk".to_string(),
                vendor: "Warehouse".to_string(),
            })
        );
    }

    #[test]
    fn negative_prices_are_rejected() {
        let result = build_catalog([PriceRecord::new("Milk", "Warehouse", dec!(-1))], None);

        assert!(matches!(result, Err(CatalogError::NegativePrice { .. })));
    }

    #[test]
    fn zero_prices_are_allowed() -> TestResult {
        let catalog = build_catalog([PriceRecord::new("Flyer", "Warehouse", dec!(0))], None)?;

        assert_eq!(catalog.price("Flyer", "Warehouse"), Some(Decimal::ZERO));

        Ok(())
    }
}
