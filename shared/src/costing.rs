//! Batch costing arithmetic
//!
//! Pure calculations behind production-batch food costing. All quantities and
//! money use `Decimal` so repeated small additions accumulate without
//! floating-point drift. Display rounding (2 fractional digits for euro
//! amounts) is a presentation concern and happens at the edges.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Total and per-unit cost of a production batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTotals {
    pub total: Decimal,
    pub per_unit: Decimal,
}

/// Quantity of an ingredient needed for an actual produced quantity.
///
/// Recipe lines are expressed against the recipe's nominal batch yield;
/// production scales each line linearly:
/// `line_quantity / nominal_yield * produced_quantity`.
///
/// A non-positive nominal yield yields zero; such recipes are rejected at the
/// validation boundary, this guard only keeps the arithmetic total.
pub fn scale_quantity(
    line_quantity: Decimal,
    nominal_yield: Decimal,
    produced_quantity: Decimal,
) -> Decimal {
    if nominal_yield <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    line_quantity / nominal_yield * produced_quantity
}

/// Cost of one batch detail line at its frozen unit price
pub fn line_cost(unit_price: Decimal, quantity_used: Decimal) -> Decimal {
    unit_price * quantity_used
}

/// Sum line costs into batch totals.
///
/// `per_unit` is zero when the produced quantity is not positive; this never
/// divides by zero.
pub fn batch_totals(line_costs: &[Decimal], produced_quantity: Decimal) -> BatchTotals {
    let total: Decimal = line_costs.iter().sum();
    let per_unit = if produced_quantity > Decimal::ZERO {
        total / produced_quantity
    } else {
        Decimal::ZERO
    };
    BatchTotals { total, per_unit }
}

/// Round a monetary amount for display (euro, 2 fractional digits)
pub fn display_amount(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn scaling_is_linear_in_produced_quantity() {
        // 2 kg per 10 kg nominal yield, producing 5 kg -> 1 kg
        assert_eq!(scale_quantity(dec("2"), dec("10"), dec("5")), dec("1"));
        // producing the nominal yield returns the line quantity unchanged
        assert_eq!(scale_quantity(dec("2"), dec("10"), dec("10")), dec("2"));
        // doubling production doubles the requirement
        assert_eq!(scale_quantity(dec("2"), dec("10"), dec("20")), dec("4"));
    }

    #[test]
    fn scaling_guards_non_positive_yield() {
        assert_eq!(scale_quantity(dec("2"), Decimal::ZERO, dec("5")), Decimal::ZERO);
        assert_eq!(scale_quantity(dec("2"), dec("-1"), dec("5")), Decimal::ZERO);
    }

    #[test]
    fn per_unit_guards_non_positive_production() {
        let totals = batch_totals(&[dec("18")], Decimal::ZERO);
        assert_eq!(totals.total, dec("18"));
        assert_eq!(totals.per_unit, Decimal::ZERO);
    }

    #[test]
    fn pistachio_gelato_scenario() {
        // Recipe: nominal yield 10 kg, 2 kg pistachio paste at 18 EUR/kg.
        // Producing 5 kg charges 1 kg of paste.
        let qty_needed = scale_quantity(dec("2"), dec("10"), dec("5"));
        assert_eq!(qty_needed, dec("1"));

        let cost = line_cost(dec("18"), qty_needed);
        assert_eq!(cost, dec("18"));

        let totals = batch_totals(&[cost], dec("5"));
        assert_eq!(display_amount(totals.total), dec("18.00"));
        assert_eq!(display_amount(totals.per_unit), dec("3.60"));
    }

    #[test]
    fn totals_accumulate_all_lines() {
        let totals = batch_totals(&[dec("1.25"), dec("0.75"), dec("3")], dec("2"));
        assert_eq!(totals.total, dec("5"));
        assert_eq!(totals.per_unit, dec("2.5"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100_000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 1000.00
    }

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=1_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Producing k times the nominal yield costs k times as much
        #[test]
        fn prop_total_scales_linearly(
            lines in prop::collection::vec((price_strategy(), quantity_strategy()), 1..8),
            nominal in quantity_strategy(),
            k in 1u32..=10,
        ) {
            let k = Decimal::from(k);
            let at_nominal: Vec<Decimal> = lines
                .iter()
                .map(|(price, qty)| line_cost(*price, scale_quantity(*qty, nominal, nominal)))
                .collect();
            let scaled: Vec<Decimal> = lines
                .iter()
                .map(|(price, qty)| line_cost(*price, scale_quantity(*qty, nominal, nominal * k)))
                .collect();

            let base = batch_totals(&at_nominal, nominal);
            let bigger = batch_totals(&scaled, nominal * k);

            prop_assert_eq!(bigger.total.round_dp(6), (base.total * k).round_dp(6));
            // per-unit cost is invariant under linear scaling
            prop_assert_eq!(bigger.per_unit.round_dp(6), base.per_unit.round_dp(6));
        }

        /// Per-unit never divides by zero
        #[test]
        fn prop_per_unit_total_consistency(
            costs in prop::collection::vec(price_strategy(), 0..8),
            produced in quantity_strategy(),
        ) {
            let totals = batch_totals(&costs, produced);
            // division is exact to 28 significant digits; allow that rounding
            let delta = (totals.per_unit * produced - totals.total).abs();
            prop_assert!(delta <= Decimal::new(1, 10));
        }
    }
}
