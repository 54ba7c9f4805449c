//! Cost Models
//!
//! A cost model maps a vendor to the fixed access cost paid once if any item is
//! sourced there.

use std::fmt;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Maps a vendor to its fixed access cost.
///
/// Costs are expected to be non-negative; solvers reject negative values.
pub trait CostModel: fmt::Debug {
    /// Access cost for the given vendor.
    fn access_cost(&self, vendor: &str) -> Decimal;
}

impl<C: CostModel + ?Sized> CostModel for &C {
    fn access_cost(&self, vendor: &str) -> Decimal {
        (**self).access_cost(vendor)
    }
}

/// Two-tier cost model: one designated near vendor at a constant cost, every
/// other vendor at a shared cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoTierCostModel {
    /// Vendor charged the near cost
    pub near_vendor: String,

    /// Access cost of the near vendor
    pub near_cost: Decimal,

    /// Access cost of every other vendor
    pub far_cost: Decimal,
}

impl TwoTierCostModel {
    /// Create a new two-tier cost model.
    pub fn new(near_vendor: impl Into<String>, near_cost: Decimal, far_cost: Decimal) -> Self {
        Self {
            near_vendor: near_vendor.into(),
            near_cost,
            far_cost,
        }
    }

    /// Same model with a different far cost.
    #[must_use]
    pub fn with_far_cost(&self, far_cost: Decimal) -> Self {
        Self {
            far_cost,
            ..self.clone()
        }
    }
}

impl CostModel for TwoTierCostModel {
    fn access_cost(&self, vendor: &str) -> Decimal {
        if vendor == self.near_vendor {
            self.near_cost
        } else {
            self.far_cost
        }
    }
}

/// Explicit per-vendor access costs with a fallback for unlisted vendors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorCostTable {
    costs: FxHashMap<String, Decimal>,
    default_cost: Decimal,
}

impl VendorCostTable {
    /// Create an empty table charging `default_cost` for every vendor.
    pub fn new(default_cost: Decimal) -> Self {
        Self {
            costs: FxHashMap::default(),
            default_cost,
        }
    }

    /// Set the access cost of one vendor.
    #[must_use]
    pub fn with_cost(mut self, vendor: impl Into<String>, cost: Decimal) -> Self {
        self.costs.insert(vendor.into(), cost);
        self
    }

    /// Replace the access cost of one vendor in place.
    pub fn set_cost(&mut self, vendor: impl Into<String>, cost: Decimal) {
        self.costs.insert(vendor.into(), cost);
    }
}

impl CostModel for VendorCostTable {
    fn access_cost(&self, vendor: &str) -> Decimal {
        self.costs.get(vendor).copied().unwrap_or(self.default_cost)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;

    use super::*;

    #[test]
    fn two_tier_charges_near_vendor_its_own_cost() {
        let model = TwoTierCostModel::new("Supermarket A", dec!(5), dec!(15));

        assert_eq!(model.access_cost("Supermarket A"), dec!(5));
        assert_eq!(model.access_cost("Supermarket B"), dec!(15));
        assert_eq!(model.access_cost("Anywhere Else"), dec!(15));
    }

    #[test]
    fn with_far_cost_keeps_near_tier() {
        let model = TwoTierCostModel::new("Supermarket A", dec!(5), dec!(15)).with_far_cost(dec!(0));

        assert_eq!(model.access_cost("Supermarket A"), dec!(5));
        assert_eq!(model.access_cost("Supermarket B"), dec!(0));
    }

    #[test]
    fn cost_table_falls_back_to_default() {
        let model = VendorCostTable::new(dec!(10))
            .with_cost("Corner Shop", dec!(1))
            .with_cost("Warehouse", dec!(25));

        assert_eq!(model.access_cost("Corner Shop"), dec!(1));
        assert_eq!(model.access_cost("Warehouse"), dec!(25));
        assert_eq!(model.access_cost("Market"), dec!(10));
    }

    #[test]
    fn references_are_cost_models() {
        fn cost_of(model: impl CostModel) -> Decimal {
            model.access_cost("Market")
        }

        let model = VendorCostTable::new(dec!(3));

        assert_eq!(cost_of(&model), dec!(3));
    }
}
