//! Production batch workflow tests
//!
//! Tests for price resolution and cost freezing:
//! - the current price is the newest record by purchase date
//! - an ingredient without price data resolves to zero, flagged as unpriced
//! - once a batch's totals are frozen, later price changes never alter them
//! - incomplete batches (no frozen totals) are detectable and resumable

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::costing::{batch_totals, line_cost, scale_quantity};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Append-only price history for one ingredient
#[derive(Debug, Clone, Default)]
struct PriceHistory {
    records: Vec<(NaiveDate, Decimal)>,
}

impl PriceHistory {
    fn record(&mut self, day: NaiveDate, price: Decimal) {
        self.records.push((day, price));
    }

    /// Newest record by purchase date; zero and unknown when empty
    fn current(&self) -> (Decimal, bool) {
        self.records
            .iter()
            .max_by_key(|(day, _)| *day)
            .map(|(_, price)| (*price, true))
            .unwrap_or((Decimal::ZERO, false))
    }
}

/// A frozen batch detail line, as written once at production time
#[derive(Debug, Clone, PartialEq)]
struct FrozenDetail {
    quantity_used: Decimal,
    frozen_unit_price: Decimal,
    price_known: bool,
    line_cost: Decimal,
}

/// Freeze one recipe line against the current price history
fn freeze_line(
    history: &PriceHistory,
    recipe_quantity: Decimal,
    nominal_yield: Decimal,
    produced_quantity: Decimal,
) -> FrozenDetail {
    let (unit_price, price_known) = history.current();
    let quantity_used = scale_quantity(recipe_quantity, nominal_yield, produced_quantity);
    FrozenDetail {
        quantity_used,
        frozen_unit_price: unit_price,
        price_known,
        line_cost: line_cost(unit_price, quantity_used),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The newest purchase date wins, regardless of insertion order
    #[test]
    fn test_current_price_is_newest() {
        let mut history = PriceHistory::default();
        history.record(date("2026-03-01"), dec("17.50"));
        history.record(date("2026-01-15"), dec("19.00"));
        history.record(date("2026-02-10"), dec("18.20"));

        assert_eq!(history.current(), (dec("17.50"), true));
    }

    /// No price data resolves to zero, explicitly flagged as unpriced
    #[test]
    fn test_missing_price_resolves_to_zero() {
        let history = PriceHistory::default();
        let (price, known) = history.current();

        assert_eq!(price, Decimal::ZERO);
        assert!(!known);

        // The zero price flows into a zero-cost line instead of blocking
        let detail = freeze_line(&history, dec("2"), dec("10"), dec("5"));
        assert_eq!(detail.line_cost, Decimal::ZERO);
        assert!(!detail.price_known);
    }

    /// Pistachio gelato end to end: 10 kg nominal recipe, 2 kg paste at
    /// 18 EUR/kg, producing 5 kg
    #[test]
    fn test_pistachio_batch_freeze() {
        let mut history = PriceHistory::default();
        history.record(date("2026-05-02"), dec("18"));

        let detail = freeze_line(&history, dec("2"), dec("10"), dec("5"));
        assert_eq!(detail.quantity_used, dec("1"));
        assert_eq!(detail.line_cost, dec("18"));

        let totals = batch_totals(&[detail.line_cost], dec("5"));
        assert_eq!(totals.total, dec("18"));
        assert_eq!(totals.per_unit.round_dp(2), dec("3.60"));
    }

    /// Frozen details do not change when the price history moves on
    #[test]
    fn test_frozen_cost_survives_price_change() {
        let mut history = PriceHistory::default();
        history.record(date("2026-05-02"), dec("18"));

        let frozen = freeze_line(&history, dec("2"), dec("10"), dec("5"));
        let frozen_totals = batch_totals(&[frozen.line_cost], dec("5"));

        // Pistachio paste doubles in price after production
        history.record(date("2026-06-01"), dec("36"));

        // Re-reading the stored detail yields the same numbers
        assert_eq!(frozen.frozen_unit_price, dec("18"));
        assert_eq!(frozen.line_cost, dec("18"));
        let reread_totals = batch_totals(&[frozen.line_cost], dec("5"));
        assert_eq!(reread_totals, frozen_totals);

        // Only a NEW batch sees the new price
        let new_detail = freeze_line(&history, dec("2"), dec("10"), dec("5"));
        assert_eq!(new_detail.frozen_unit_price, dec("36"));
    }

    /// An incomplete batch is one with no frozen totals; resuming processes
    /// the missing lines and finalizes from all details
    #[test]
    fn test_incomplete_batch_resume() {
        let mut history = PriceHistory::default();
        history.record(date("2026-05-02"), dec("10"));

        let recipe_lines = [dec("1"), dec("2"), dec("3")];
        let nominal = dec("10");
        let produced = dec("10");

        // The first run failed after two of three lines
        let mut details: Vec<FrozenDetail> = recipe_lines[..2]
            .iter()
            .map(|q| freeze_line(&history, *q, nominal, produced))
            .collect();
        let total_cost: Option<Decimal> = None; // header never finalized
        assert!(total_cost.is_none());

        // Resume: only the line without a detail row is processed
        let already_done = details.len();
        for q in &recipe_lines[already_done..] {
            details.push(freeze_line(&history, *q, nominal, produced));
        }
        assert_eq!(details.len(), recipe_lines.len());

        // Finalization sums all detail rows, including the pre-failure ones
        let line_costs: Vec<Decimal> = details.iter().map(|d| d.line_cost).collect();
        let totals = batch_totals(&line_costs, produced);
        assert_eq!(totals.total, dec("60"));
        assert_eq!(totals.per_unit, dec("6"));
    }

    /// Ties on purchase date are broken by recency of insertion in the
    /// reference queries; same-day repricing is at least deterministic here
    #[test]
    fn test_same_day_reprice() {
        let mut history = PriceHistory::default();
        history.record(date("2026-03-01"), dec("10"));
        history.record(date("2026-03-01"), dec("12"));

        let (price, known) = history.current();
        assert!(known);
        // max_by_key returns the last maximal element
        assert_eq!(price, dec("12"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10_000i64).prop_map(|n| Decimal::new(n, 1))
    }

    fn day_strategy() -> impl Strategy<Value = NaiveDate> {
        (0u32..=1000).prop_map(|offset| {
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(offset as u64)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: frozen details are invariant under any later history
        #[test]
        fn prop_frozen_details_immutable(
            initial_records in prop::collection::vec((day_strategy(), price_strategy()), 1..10),
            later_records in prop::collection::vec((day_strategy(), price_strategy()), 0..10),
            recipe_qty in quantity_strategy(),
            nominal in quantity_strategy(),
            produced in quantity_strategy(),
        ) {
            let mut history = PriceHistory::default();
            for (day, price) in initial_records {
                history.record(day, price);
            }

            let frozen = freeze_line(&history, recipe_qty, nominal, produced);
            let snapshot = frozen.clone();

            for (day, price) in later_records {
                history.record(day, price);
            }

            prop_assert_eq!(frozen, snapshot);
        }

        /// Property: the resolved price is always one of the recorded prices
        /// (or zero-unknown when the history is empty)
        #[test]
        fn prop_resolved_price_from_history(
            records in prop::collection::vec((day_strategy(), price_strategy()), 0..10),
        ) {
            let mut history = PriceHistory::default();
            for (day, price) in &records {
                history.record(*day, *price);
            }

            let (price, known) = history.current();
            if records.is_empty() {
                prop_assert!(!known);
                prop_assert_eq!(price, Decimal::ZERO);
            } else {
                prop_assert!(known);
                prop_assert!(records.iter().any(|(_, p)| *p == price));
                // and it belongs to the newest date
                let newest = records.iter().map(|(d, _)| *d).max();
                prop_assert!(records
                    .iter()
                    .any(|(d, p)| Some(*d) == newest && *p == price));
            }
        }
    }
}
