//! Shopwise
//!
//! Shopwise decides which vendor supplies each item on a shopping list so that
//! item prices plus the cost of reaching every visited vendor is as low as
//! possible, and sweeps access costs to find where the decision flips.

pub mod catalog;
pub mod costs;
pub mod report;
pub mod repository;
pub mod scenario;
pub mod shopping;
pub mod solvers;
pub mod sweep;
pub mod utils;
