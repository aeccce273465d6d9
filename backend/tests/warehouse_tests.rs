//! Warehouse lot tests
//!
//! Tests for lot allocation and the movement ledger:
//! - a lot's current quantity never goes below zero; over-draws are rejected,
//!   not clamped
//! - every quantity change pairs with exactly one movement of matching
//!   direction and quantity
//! - available lots are offered earliest-expiry-first (FEFO)

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::MovementDirection;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory stand-in for a lot row plus its movement ledger, mirroring the
/// conditional-update semantics of the storage layer
#[derive(Debug, Clone)]
struct SimulatedLot {
    initial_quantity: Decimal,
    current_quantity: Decimal,
    movements: Vec<(MovementDirection, Decimal)>,
}

impl SimulatedLot {
    fn new(initial: Decimal) -> Self {
        Self {
            initial_quantity: initial,
            current_quantity: initial,
            movements: vec![(MovementDirection::Inbound, initial)],
        }
    }

    /// Conditional deduction: only touches the row when enough stock remains
    fn deduct(&mut self, qty: Decimal) -> Result<(), &'static str> {
        if qty <= Decimal::ZERO {
            return Err("Quantity must be positive");
        }
        if self.current_quantity < qty {
            return Err("Insufficient stock");
        }
        self.current_quantity -= qty;
        self.movements.push((MovementDirection::Outbound, qty));
        Ok(())
    }

    /// Ledger balance: signed sum of movements
    fn ledger_balance(&self) -> Decimal {
        self.movements.iter().fold(Decimal::ZERO, |acc, (dir, qty)| {
            acc + *qty * Decimal::from(dir.sign())
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Normal deduction decrements and records one outbound movement
    #[test]
    fn test_deduct_decrements_and_logs() {
        let mut lot = SimulatedLot::new(dec("10"));
        lot.deduct(dec("3.5")).unwrap();

        assert_eq!(lot.current_quantity, dec("6.5"));
        assert_eq!(lot.movements.len(), 2);
        assert_eq!(lot.movements[1], (MovementDirection::Outbound, dec("3.5")));
    }

    /// A 1.0 kg draw from a 0.5 kg lot fails and leaves the lot unchanged
    #[test]
    fn test_overdraw_rejected_not_clamped() {
        let mut lot = SimulatedLot::new(dec("0.5"));
        let result = lot.deduct(dec("1.0"));

        assert!(result.is_err());
        assert_eq!(lot.current_quantity, dec("0.5"));
        // No movement is written for a refused deduction
        assert_eq!(lot.movements.len(), 1);
    }

    /// Draining a lot exactly to zero is allowed; the lot stays for
    /// traceability
    #[test]
    fn test_exact_drain_to_zero() {
        let mut lot = SimulatedLot::new(dec("2"));
        lot.deduct(dec("2")).unwrap();

        assert_eq!(lot.current_quantity, Decimal::ZERO);
        assert!(lot.deduct(dec("0.001")).is_err());
    }

    /// Zero and negative draws are invalid
    #[test]
    fn test_non_positive_draw_rejected() {
        let mut lot = SimulatedLot::new(dec("5"));
        assert!(lot.deduct(Decimal::ZERO).is_err());
        assert!(lot.deduct(dec("-1")).is_err());
        assert_eq!(lot.current_quantity, dec("5"));
    }

    /// The ledger balance always matches the lot's current quantity
    #[test]
    fn test_ledger_matches_quantity() {
        let mut lot = SimulatedLot::new(dec("20"));
        lot.deduct(dec("4")).unwrap();
        lot.deduct(dec("6")).unwrap();
        let _ = lot.deduct(dec("100")); // refused, must not show in the ledger

        assert_eq!(lot.ledger_balance(), lot.current_quantity);
        assert_eq!(lot.ledger_balance(), dec("10"));
    }

    /// FEFO ordering: earliest expiry first, lots without expiry last
    #[test]
    fn test_fefo_ordering() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        let mut lots = vec![
            ("L3", d("2026-09-01")),
            ("L1", d("2026-06-15")),
            ("L4", None),
            ("L2", d("2026-07-01")),
        ];

        // ORDER BY expiry_date ASC NULLS LAST
        lots.sort_by(|a, b| match (a.1, b.1) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let order: Vec<&str> = lots.iter().map(|l| l.0).collect();
        assert_eq!(order, vec!["L1", "L2", "L3", "L4"]);
    }

    /// Expiry is a warning, not a block: an expired lot can still be drawn
    #[test]
    fn test_expired_lot_still_deductible() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let expiry = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let expired = expiry < today;
        assert!(expired);

        // The deduction path does not look at the expiry date
        let mut lot = SimulatedLot::new(dec("3"));
        assert!(lot.deduct(dec("1")).is_ok());
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
        (1i64..=10_000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: for any sequence of draws, the quantity never goes
        /// below zero and never exceeds the initial quantity
        #[test]
        fn prop_quantity_stays_in_bounds(
            initial in quantity_strategy(),
            draws in prop::collection::vec(quantity_strategy(), 0..20),
        ) {
            let mut lot = SimulatedLot::new(initial);
            for draw in draws {
                let _ = lot.deduct(draw);
                prop_assert!(lot.current_quantity >= Decimal::ZERO);
                prop_assert!(lot.current_quantity <= lot.initial_quantity);
            }
        }

        /// Property: every successful draw appends exactly one outbound
        /// movement; refused draws append none
        #[test]
        fn prop_movement_pairing(
            initial in quantity_strategy(),
            draws in prop::collection::vec(quantity_strategy(), 0..20),
        ) {
            let mut lot = SimulatedLot::new(initial);
            for draw in draws {
                let before = lot.movements.len();
                let result = lot.deduct(draw);
                let appended = lot.movements.len() - before;
                prop_assert_eq!(appended, if result.is_ok() { 1 } else { 0 });
            }
        }

        /// Property: the ledger balance equals the lot quantity after any
        /// sequence of draws
        #[test]
        fn prop_ledger_balance_consistent(
            initial in quantity_strategy(),
            draws in prop::collection::vec(quantity_strategy(), 0..20),
        ) {
            let mut lot = SimulatedLot::new(initial);
            for draw in draws {
                let _ = lot.deduct(draw);
            }
            prop_assert_eq!(lot.ledger_balance(), lot.current_quantity);
        }

        /// Property: a refused draw leaves the lot exactly as it was
        #[test]
        fn prop_refused_draw_changes_nothing(initial in quantity_strategy()) {
            let mut lot = SimulatedLot::new(initial);
            let before = lot.current_quantity;
            let result = lot.deduct(initial + Decimal::ONE);
            prop_assert!(result.is_err());
            prop_assert_eq!(lot.current_quantity, before);
        }
    }
}
