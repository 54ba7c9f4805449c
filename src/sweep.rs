//! Sensitivity Sweep
//!
//! Re-solves the assignment program over a range of values of one cost-model
//! parameter, recording whether a vendor of interest is visited and what the
//! optimal total costs, then locates the value at which that decision flips.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    catalog::PriceCatalog,
    costs::CostModel,
    shopping::ShoppingList,
    solvers::{
        SolveOptions, SolverError,
        ilp::{ILPSolver, NoopObserver},
    },
};

/// Largest number of values a [`SweepRange`] may expand to.
pub const MAX_SWEEP_SAMPLES: usize = 100_000;

/// Errors raised while sweeping.
#[derive(Debug, Error)]
pub enum SweepError {
    /// A solve failed; the sweep stops at the first failing value.
    #[error("solve failed at sweep value {value}: {source}")]
    Solve {
        /// Parameter value that triggered the failure
        value: Decimal,

        /// Underlying solver error
        #[source]
        source: SolverError,
    },

    /// The target vendor does not appear in the catalog.
    #[error("sweep target {vendor} is not a catalog vendor")]
    UnknownTarget {
        /// Requested target vendor
        vendor: String,
    },

    /// The sweep range is malformed.
    #[error("invalid sweep range: {reason}")]
    InvalidRange {
        /// Why the range was rejected
        reason: &'static str,
    },
}

/// Inclusive range of sweep values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepRange {
    /// First value
    pub start: Decimal,

    /// Last value (included when reachable by whole steps)
    pub end: Decimal,

    /// Distance between consecutive values
    pub step: Decimal,
}

impl SweepRange {
    /// Create a new range.
    pub fn new(start: Decimal, end: Decimal, step: Decimal) -> Self {
        Self { start, end, step }
    }

    /// Expand the range into its values, in increasing order.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::InvalidRange`] if the step is not positive, the end
    /// lies before the start, or the range holds more than [`MAX_SWEEP_SAMPLES`]
    /// values.
    pub fn values(&self) -> Result<Vec<Decimal>, SweepError> {
        if self.step <= Decimal::ZERO {
            return Err(SweepError::InvalidRange {
                reason: "step must be positive",
            });
        }

        if self.end < self.start {
            return Err(SweepError::InvalidRange {
                reason: "end lies before start",
            });
        }

        let mut values = Vec::new();
        let mut next = Some(self.start);

        while let Some(value) = next.filter(|value| *value <= self.end) {
            if values.len() == MAX_SWEEP_SAMPLES {
                return Err(SweepError::InvalidRange {
                    reason: "range yields too many samples",
                });
            }

            values.push(value);

            // Stepping past the largest representable decimal ends the range.
            next = value.checked_add(self.step);
        }

        Ok(values)
    }
}

/// Outcome of one solve in a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSample {
    /// Parameter value used for this solve
    pub value: Decimal,

    /// Whether the target vendor was visited
    pub visited_target: bool,

    /// Optimal total cost
    pub total_cost: Decimal,

    /// Every visited vendor
    pub visited: BTreeSet<String>,
}

/// Ordered samples of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepResult {
    target_vendor: String,
    samples: Vec<SweepSample>,
}

impl SweepResult {
    /// Create a result from samples in sweep order.
    pub fn new(target_vendor: impl Into<String>, samples: Vec<SweepSample>) -> Self {
        Self {
            target_vendor: target_vendor.into(),
            samples,
        }
    }

    /// Vendor whose visits were tracked.
    pub fn target_vendor(&self) -> &str {
        &self.target_vendor
    }

    /// Samples in sweep order.
    pub fn samples(&self) -> &[SweepSample] {
        &self.samples
    }

    /// Index of the first sample, after the first, whose `visited_target`
    /// differs from the sample before it.
    pub fn tipping_index(&self) -> Option<usize> {
        self.samples
            .windows(2)
            .position(|pair| match pair {
                [previous, current] => previous.visited_target != current.visited_target,
                _ => false,
            })
            .map(|idx| idx + 1)
    }

    /// Parameter value at which the target vendor's visit decision first changes.
    ///
    /// `None` when the decision is constant across the sweep or fewer than two
    /// samples exist. Later changes are not reported.
    pub fn tipping_point(&self) -> Option<Decimal> {
        self.tipping_index()
            .and_then(|idx| self.samples.get(idx))
            .map(|sample| sample.value)
    }
}

/// Solve once per value, in order, building each cost model with `factory`.
///
/// # Errors
///
/// Returns [`SweepError::UnknownTarget`] if the target vendor is not in the
/// catalog, and [`SweepError::Solve`] for the first value whose solve fails; no
/// later values are attempted.
#[tracing::instrument(
    name = "sweep",
    skip(catalog, shopping_list, factory, values, options),
    fields(samples = values.len())
)]
pub fn sweep<F, C>(
    catalog: &PriceCatalog,
    shopping_list: &ShoppingList,
    target_vendor: &str,
    factory: F,
    values: &[Decimal],
    options: &SolveOptions,
) -> Result<SweepResult, SweepError>
where
    F: Fn(Decimal) -> C,
    C: CostModel,
{
    ensure_target(catalog, target_vendor)?;

    let samples = values
        .iter()
        .map(|&value| sample(catalog, shopping_list, target_vendor, &factory, value, options))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(finish(target_vendor, samples))
}

/// Parallel [`sweep`]: values are solved concurrently on the rayon pool.
///
/// Samples come back in sweep order and, when several values fail, the error for
/// the earliest one is returned, so the outcome matches [`sweep`].
///
/// # Errors
///
/// Returns [`SweepError::UnknownTarget`] if the target vendor is not in the
/// catalog, and [`SweepError::Solve`] for the earliest failing value.
#[cfg(feature = "parallel")]
#[tracing::instrument(
    name = "sweep.parallel",
    skip(catalog, shopping_list, factory, values, options),
    fields(samples = values.len())
)]
pub fn sweep_parallel<F, C>(
    catalog: &PriceCatalog,
    shopping_list: &ShoppingList,
    target_vendor: &str,
    factory: F,
    values: &[Decimal],
    options: &SolveOptions,
) -> Result<SweepResult, SweepError>
where
    F: Fn(Decimal) -> C + Sync,
    C: CostModel,
{
    use rayon::prelude::*;

    ensure_target(catalog, target_vendor)?;

    let mut outcomes: Vec<(usize, Result<SweepSample, SweepError>)> = values
        .par_iter()
        .enumerate()
        .map(|(idx, &value)| {
            (
                idx,
                sample(catalog, shopping_list, target_vendor, &factory, value, options),
            )
        })
        .collect();

    outcomes.sort_by_key(|(idx, _)| *idx);

    let samples = outcomes
        .into_iter()
        .map(|(_, outcome)| outcome)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(finish(target_vendor, samples))
}

fn ensure_target(catalog: &PriceCatalog, target_vendor: &str) -> Result<(), SweepError> {
    if catalog.vendors().contains(target_vendor) {
        Ok(())
    } else {
        Err(SweepError::UnknownTarget {
            vendor: target_vendor.to_string(),
        })
    }
}

fn sample<F, C>(
    catalog: &PriceCatalog,
    shopping_list: &ShoppingList,
    target_vendor: &str,
    factory: &F,
    value: Decimal,
    options: &SolveOptions,
) -> Result<SweepSample, SweepError>
where
    F: Fn(Decimal) -> C,
    C: CostModel,
{
    let cost_model = factory(value);

    let assignment = ILPSolver::solve_with_options(
        catalog,
        shopping_list,
        &cost_model,
        options,
        &mut NoopObserver,
    )
    .map_err(|source| SweepError::Solve { value, source })?;

    let sample = SweepSample {
        value,
        visited_target: assignment.is_visited(target_vendor),
        total_cost: assignment.total_cost(),
        visited: assignment.visited().map(str::to_string).collect(),
    };

    debug!(
        %value,
        visited_target = sample.visited_target,
        total_cost = %sample.total_cost,
        "sweep sample"
    );

    Ok(sample)
}

fn finish(target_vendor: &str, samples: Vec<SweepSample>) -> SweepResult {
    let result = SweepResult::new(target_vendor, samples);

    match result.tipping_point() {
        Some(value) => info!(target_vendor, %value, "found tipping point"),
        None => info!(target_vendor, "visit decision constant across sweep"),
    }

    result
}
