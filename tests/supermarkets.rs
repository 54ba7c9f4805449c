//! Integration tests for the two-supermarket fixture set.
//!
//! Supermarket A is near (access cost 5.00 SAR), Supermarket B is far. Item
//! prices:
//!
//! | Item    | A     | B     |
//! |---------|-------|-------|
//! | Milk    |  8.00 |  7.50 |
//! | Eggs    | 22.00 | 18.00 |
//! | Chicken | 18.00 | 16.50 |
//! | Rice    | 35.00 | 34.00 |
//!
//! Buying everything at A costs 83.00 + 5.00 = 88.00. Buying everything at B
//! costs 76.00 plus B's access cost. Any mix pays both access costs, so it is
//! never better than the cheaper single-vendor option. The optimum is therefore
//! `min(88.00, 76.00 + c)` where `c` is B's access cost, and B stops being worth
//! the trip once `c` reaches 12.

use rust_decimal::{Decimal, dec};
use testresult::TestResult;

use shopwise::{
    catalog::PriceCatalog,
    repository::YamlPriceRepository,
    scenario::Scenario,
    solvers::{Solver, ilp::ILPSolver},
    sweep::sweep,
};

const NEAR: &str = "Supermarket A";
const FAR: &str = "Supermarket B";

fn load() -> TestResult<(Scenario, PriceCatalog)> {
    let scenario = Scenario::from_set("./fixtures", "supermarkets")?;
    let repository = YamlPriceRepository::from_set("./fixtures", "supermarkets");
    let catalog = scenario.load_catalog(&repository)?;

    Ok((scenario, catalog))
}

#[test]
fn expensive_trip_keeps_everything_at_near_vendor() -> TestResult {
    let (scenario, catalog) = load()?;

    let assignment = ILPSolver::solve(&catalog, &scenario.shopping_list, &scenario.cost_model())?;

    assert_eq!(assignment.total_cost(), dec!(88.00));
    assert_eq!(assignment.visited().collect::<Vec<_>>(), vec![NEAR]);

    for item in scenario.shopping_list.iter() {
        assert_eq!(assignment.vendor_for(item), Some(NEAR), "{item}");
    }

    Ok(())
}

#[test]
fn free_trip_moves_everything_to_far_vendor() -> TestResult {
    let (scenario, catalog) = load()?;
    let cost_model = scenario.cost_model().with_far_cost(Decimal::ZERO);

    let assignment = ILPSolver::solve(&catalog, &scenario.shopping_list, &cost_model)?;

    assert_eq!(assignment.total_cost(), dec!(76.00));
    assert_eq!(assignment.visited().collect::<Vec<_>>(), vec![FAR]);
    assert_eq!(assignment.item_cost(), dec!(76.00));
    assert_eq!(assignment.access_cost_total(), Decimal::ZERO);

    Ok(())
}

#[test]
fn sweep_finds_where_far_vendor_stops_paying_off() -> TestResult {
    let (scenario, catalog) = load()?;
    let config = scenario.sweep()?;
    let values = config.range().values()?;

    let result = sweep(
        &catalog,
        &scenario.shopping_list,
        &config.target_vendor,
        |value| scenario.swept_cost_model(&config.target_vendor, value),
        &values,
        &scenario.solve_options(),
    )?;

    let samples = result.samples();

    assert_eq!(samples.len(), 31);
    assert!(samples.first().is_some_and(|sample| sample.visited_target));
    assert!(samples.last().is_some_and(|sample| !sample.visited_target));

    // At 12 both options cost 88.00, so either side of the tie is optimal.
    let tipping_point = result.tipping_point();
    assert!(
        tipping_point == Some(dec!(12)) || tipping_point == Some(dec!(13)),
        "{tipping_point:?}"
    );

    for sample in samples {
        assert_eq!(
            sample.total_cost,
            (dec!(76.00) + sample.value).min(dec!(88.00)),
            "access cost {}",
            sample.value
        );

        if sample.value < dec!(12) {
            assert!(sample.visited_target, "access cost {}", sample.value);
        }

        if sample.value > dec!(12) {
            assert!(!sample.visited_target, "access cost {}", sample.value);
        }
    }

    assert!(
        samples
            .windows(2)
            .all(|pair| pair.first().map(|s| s.total_cost) <= pair.last().map(|s| s.total_cost))
    );

    Ok(())
}
