//! Batch costing tests
//!
//! Covers recipe scaling, line costs and batch totals:
//! - costs scale linearly with the produced quantity
//! - per-unit cost never divides by zero
//! - the frozen totals follow from the detail lines alone

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::costing::{batch_totals, display_amount, line_cost, scale_quantity};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Producing the nominal yield uses the recipe quantities unchanged
    #[test]
    fn test_scaling_at_nominal_yield() {
        assert_eq!(scale_quantity(dec("2.5"), dec("10"), dec("10")), dec("2.5"));
    }

    /// Producing half the nominal yield halves every line
    #[test]
    fn test_scaling_at_half_yield() {
        assert_eq!(scale_quantity(dec("2"), dec("10"), dec("5")), dec("1"));
        assert_eq!(scale_quantity(dec("0.3"), dec("10"), dec("5")), dec("0.15"));
    }

    /// Pistachio gelato: nominal yield 10 kg with 2 kg paste at 18 EUR/kg,
    /// producing 5 kg charges 1 kg of paste
    #[test]
    fn test_pistachio_gelato_batch() {
        let qty_needed = scale_quantity(dec("2"), dec("10"), dec("5"));
        assert_eq!(qty_needed, dec("1"));

        let cost = line_cost(dec("18"), qty_needed);
        assert_eq!(display_amount(cost), dec("18.00"));

        let totals = batch_totals(&[cost], dec("5"));
        assert_eq!(display_amount(totals.total), dec("18.00"));
        assert_eq!(display_amount(totals.per_unit), dec("3.60"));
    }

    /// A multi-line batch sums every line into the total
    #[test]
    fn test_multi_line_totals() {
        let lines = [
            line_cost(dec("18.00"), dec("1.0")),  // pistachio paste
            line_cost(dec("0.85"), dec("3.2")),   // milk
            line_cost(dec("1.40"), dec("0.9")),   // sugar
        ];
        let totals = batch_totals(&lines, dec("5"));

        assert_eq!(totals.total, dec("21.98"));
        assert_eq!(display_amount(totals.per_unit), dec("4.40"));
    }

    /// An unpriced ingredient contributes a zero-cost line, not an error
    #[test]
    fn test_unpriced_line_is_zero() {
        let cost = line_cost(Decimal::ZERO, dec("4.5"));
        assert_eq!(cost, Decimal::ZERO);

        let totals = batch_totals(&[cost, dec("10")], dec("2"));
        assert_eq!(totals.total, dec("10"));
    }

    /// Zero produced quantity never divides by zero
    #[test]
    fn test_per_unit_zero_guard() {
        let totals = batch_totals(&[dec("7")], Decimal::ZERO);
        assert_eq!(totals.total, dec("7"));
        assert_eq!(totals.per_unit, Decimal::ZERO);

        let totals = batch_totals(&[dec("7")], dec("-1"));
        assert_eq!(totals.per_unit, Decimal::ZERO);
    }

    /// A batch with no lines has zero cost
    #[test]
    fn test_empty_batch() {
        let totals = batch_totals(&[], dec("10"));
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.per_unit, Decimal::ZERO);
    }

    /// Non-positive nominal yield yields nothing instead of dividing by zero
    #[test]
    fn test_scaling_zero_yield_guard() {
        assert_eq!(scale_quantity(dec("2"), Decimal::ZERO, dec("5")), Decimal::ZERO);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid quantities (positive decimals)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100_000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 1000.00
    }

    /// Strategy for generating valid unit prices
    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=100_000i64).prop_map(|n| Decimal::new(n, 2)) // 0.00 to 1000.00
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Producing k times the nominal yield costs k times as much
        #[test]
        fn prop_linear_scaling(
            lines in prop::collection::vec((price_strategy(), quantity_strategy()), 1..6),
            nominal in quantity_strategy(),
            k in 1u32..=8,
        ) {
            let k = Decimal::from(k);

            let base_costs: Vec<Decimal> = lines
                .iter()
                .map(|(p, q)| line_cost(*p, scale_quantity(*q, nominal, nominal)))
                .collect();
            let scaled_costs: Vec<Decimal> = lines
                .iter()
                .map(|(p, q)| line_cost(*p, scale_quantity(*q, nominal, nominal * k)))
                .collect();

            let base = batch_totals(&base_costs, nominal);
            let scaled = batch_totals(&scaled_costs, nominal * k);

            prop_assert_eq!(scaled.total.round_dp(6), (base.total * k).round_dp(6));
        }

        /// Line cost is monotone in both price and quantity
        #[test]
        fn prop_line_cost_monotone(
            price in price_strategy(),
            qty in quantity_strategy(),
            extra in quantity_strategy(),
        ) {
            prop_assert!(line_cost(price, qty + extra) >= line_cost(price, qty));
            prop_assert!(line_cost(price + extra, qty) >= line_cost(price, qty));
        }

        /// The total is exactly the sum of the line costs
        #[test]
        fn prop_total_is_sum(costs in prop::collection::vec(price_strategy(), 0..10)) {
            let expected: Decimal = costs.iter().sum();
            let totals = batch_totals(&costs, dec("1"));
            prop_assert_eq!(totals.total, expected);
        }

        /// Per-unit times produced quantity recovers the total (up to the
        /// 28-digit division rounding)
        #[test]
        fn prop_per_unit_consistency(
            costs in prop::collection::vec(price_strategy(), 1..10),
            produced in quantity_strategy(),
        ) {
            let totals = batch_totals(&costs, produced);
            let delta = (totals.per_unit * produced - totals.total).abs();
            prop_assert!(delta <= Decimal::new(1, 10));
        }

        /// Scaled quantity is never negative for non-negative inputs
        #[test]
        fn prop_scaled_quantity_non_negative(
            line_qty in quantity_strategy(),
            nominal in quantity_strategy(),
            produced in quantity_strategy(),
        ) {
            prop_assert!(scale_quantity(line_qty, nominal, produced) >= Decimal::ZERO);
        }
    }
}
