//! Template application tests
//!
//! Tests for the day-by-day template applier:
//! - the date range is inclusive and rejects end-before-start
//! - idempotency per (template, calendar day): re-applying with
//!   skip-existing creates nothing and skips every day
//! - created batches count per line, skipped days count per day
//! - pre-flight findings classify as errors (unusable line) or warnings
//!   (lot problems)

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::HashSet;

use shared::validation::{days_in_range, validate_date_range};
use shared::IssueSeverity;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Outcome counters of one application run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Outcome {
    created: u32,
    skipped: u32,
}

/// Simulate applying a template across a range. `generated` holds the days
/// that already carry a batch from this template; a run adds to it.
fn apply(
    generated: &mut HashSet<NaiveDate>,
    start: NaiveDate,
    end: NaiveDate,
    line_count: u32,
    skip_existing: bool,
) -> Result<Outcome, &'static str> {
    validate_date_range(start, end)?;

    let mut outcome = Outcome {
        created: 0,
        skipped: 0,
    };

    let mut day = start;
    while day <= end {
        if skip_existing && generated.contains(&day) {
            outcome.skipped += 1;
        } else {
            for _ in 0..line_count {
                outcome.created += 1;
            }
            generated.insert(day);
        }
        day = day.succ_opt().ok_or("date overflow")?;
    }

    Ok(outcome)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// End before start is rejected before anything is written
    #[test]
    fn test_inverted_range_rejected() {
        let mut generated = HashSet::new();
        let result = apply(
            &mut generated,
            date("2026-01-03"),
            date("2026-01-01"),
            1,
            true,
        );
        assert!(result.is_err());
        assert!(generated.is_empty());
    }

    /// A single-day range is one day of work
    #[test]
    fn test_single_day_range() {
        let day = date("2026-01-01");
        assert!(validate_date_range(day, day).is_ok());
        assert_eq!(days_in_range(day, day), 1);
    }

    /// Three days, one line, one day already generated: 2 created, 1 skipped
    #[test]
    fn test_partial_skip_scenario() {
        let mut generated = HashSet::from([date("2026-01-02")]);
        let outcome = apply(
            &mut generated,
            date("2026-01-01"),
            date("2026-01-03"),
            1,
            true,
        )
        .unwrap();

        assert_eq!(outcome, Outcome { created: 2, skipped: 1 });
    }

    /// Re-applying the same range with skip-existing is a no-op
    #[test]
    fn test_idempotent_reapply() {
        let mut generated = HashSet::new();
        let start = date("2026-01-01");
        let end = date("2026-01-05");

        let first = apply(&mut generated, start, end, 2, true).unwrap();
        assert_eq!(first, Outcome { created: 10, skipped: 0 });

        let second = apply(&mut generated, start, end, 2, true).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped as i64, days_in_range(start, end));
    }

    /// Without skip-existing, every day is regenerated
    #[test]
    fn test_no_skip_regenerates() {
        let mut generated = HashSet::from([date("2026-01-01")]);
        let outcome = apply(
            &mut generated,
            date("2026-01-01"),
            date("2026-01-02"),
            1,
            false,
        )
        .unwrap();

        assert_eq!(outcome, Outcome { created: 2, skipped: 0 });
    }

    /// Created counts batches (per line), skipped counts days
    #[test]
    fn test_counter_units() {
        let mut generated = HashSet::from([date("2026-01-02")]);
        let outcome = apply(
            &mut generated,
            date("2026-01-01"),
            date("2026-01-03"),
            3,
            true,
        )
        .unwrap();

        // 2 usable days x 3 lines
        assert_eq!(outcome, Outcome { created: 6, skipped: 1 });
    }

    /// Pre-flight severity: a missing recipe or ingredient makes the line
    /// unusable; lot problems only warn
    #[test]
    fn test_preflight_severity() {
        assert_eq!(classify_finding(Finding::RecipeMissing), IssueSeverity::Error);
        assert_eq!(classify_finding(Finding::IngredientMissing), IssueSeverity::Error);
        assert_eq!(classify_finding(Finding::LotMissing), IssueSeverity::Warning);
        assert_eq!(classify_finding(Finding::LotExpired), IssueSeverity::Warning);
        assert_eq!(classify_finding(Finding::LotInsufficient), IssueSeverity::Warning);
        assert_eq!(classify_finding(Finding::LotNotPreselected), IssueSeverity::Warning);
    }

    #[derive(Debug, Clone, Copy)]
    pub enum Finding {
        RecipeMissing,
        IngredientMissing,
        LotMissing,
        LotExpired,
        LotInsufficient,
        LotNotPreselected,
    }

    pub fn classify_finding(finding: Finding) -> IssueSeverity {
        match finding {
            Finding::RecipeMissing | Finding::IngredientMissing => IssueSeverity::Error,
            Finding::LotMissing
            | Finding::LotExpired
            | Finding::LotInsufficient
            | Finding::LotNotPreselected => IssueSeverity::Warning,
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn day_strategy() -> impl Strategy<Value = NaiveDate> {
        (0u32..=365).prop_map(|offset| {
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(offset as u64)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: created + skipped accounts for every day exactly once
        /// when one line is applied
        #[test]
        fn prop_every_day_accounted(
            start in day_strategy(),
            length in 0u64..30,
            pre_generated in prop::collection::hash_set(day_strategy(), 0..20),
        ) {
            let end = start + chrono::Days::new(length);
            let mut generated = pre_generated;
            let outcome = apply(&mut generated, start, end, 1, true).unwrap();

            prop_assert_eq!(
                (outcome.created + outcome.skipped) as i64,
                days_in_range(start, end)
            );
        }

        /// Property: the second run over any range creates nothing and skips
        /// every day
        #[test]
        fn prop_second_run_skips_all(
            start in day_strategy(),
            length in 0u64..30,
            lines in 1u32..5,
        ) {
            let end = start + chrono::Days::new(length);
            let mut generated = HashSet::new();

            apply(&mut generated, start, end, lines, true).unwrap();
            let second = apply(&mut generated, start, end, lines, true).unwrap();

            prop_assert_eq!(second.created, 0);
            prop_assert_eq!(second.skipped as i64, days_in_range(start, end));
        }

        /// Property: first run on fresh days creates lines x days batches
        #[test]
        fn prop_fresh_run_counts(
            start in day_strategy(),
            length in 0u64..30,
            lines in 1u32..5,
        ) {
            let end = start + chrono::Days::new(length);
            let mut generated = HashSet::new();

            let outcome = apply(&mut generated, start, end, lines, true).unwrap();
            prop_assert_eq!(
                outcome.created as i64,
                lines as i64 * days_in_range(start, end)
            );
            prop_assert_eq!(outcome.skipped, 0);
        }
    }
}
