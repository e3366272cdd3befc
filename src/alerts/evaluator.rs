use rust_decimal::Decimal;

use crate::alerts::aggregator::AggregateResult;

/// Alert fires when at most this share of the salary is left.
pub const LOW_BALANCE_THRESHOLD: Decimal = Decimal::TEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertDecision {
    pub should_fire: bool,
    /// Remaining share of the salary, in percent. Zero when the salary is
    /// zero and no percentage is defined.
    pub percentage: Decimal,
}

/// Pure threshold policy: fire iff the salary is positive and at most 10%
/// of it remains. The boundary is inclusive. A zero salary means
/// "insufficient data", never an error and never an alert.
pub fn evaluate(result: &AggregateResult) -> AlertDecision {
    match result.remaining_percentage() {
        Some(percentage) => AlertDecision {
            should_fire: percentage <= LOW_BALANCE_THRESHOLD,
            percentage,
        },
        None => AlertDecision {
            should_fire: false,
            percentage: Decimal::ZERO,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;

    use super::*;
    use crate::period::Period;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn result_with(salary: &str, remaining: &str) -> AggregateResult {
        AggregateResult {
            user_id: 1,
            period: Period::containing(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()),
            salary: dec(salary),
            monthly_expenses: Vec::new(),
            total_expenses: dec(salary) - dec(remaining),
            remaining_balance: dec(remaining),
        }
    }

    #[test]
    fn fires_at_exactly_ten_percent() {
        let decision = evaluate(&result_with("1000000", "100000"));

        assert!(decision.should_fire);
        assert_eq!(decision.percentage, dec("10"));
    }

    #[test]
    fn holds_just_above_the_boundary() {
        // 100001 / 1000000 = 10.0001%
        let decision = evaluate(&result_with("1000000", "100001"));

        assert!(!decision.should_fire);
    }

    #[test]
    fn fires_just_below_the_boundary() {
        // 99999 / 1000000 = 9.9999%
        let decision = evaluate(&result_with("1000000", "99999"));

        assert!(decision.should_fire);
    }

    #[test]
    fn fires_when_overspent() {
        let decision = evaluate(&result_with("50000", "-1200"));

        assert!(decision.should_fire);
    }

    #[test]
    fn zero_salary_never_fires() {
        let decision = evaluate(&result_with("0", "0"));

        assert!(!decision.should_fire);
        assert_eq!(decision.percentage, Decimal::ZERO);
    }

    #[test]
    fn nine_percent_scenario_fires() {
        // salary 50000, expenses 45500 -> 4500 left -> 9.0%
        let decision = evaluate(&result_with("50000", "4500"));

        assert!(decision.should_fire);
        assert_eq!(decision.percentage, dec("9"));
    }

    #[test]
    fn twenty_percent_scenario_holds() {
        // salary 50000, expenses 40000 -> 10000 left -> 20.0%
        let decision = evaluate(&result_with("50000", "10000"));

        assert!(!decision.should_fire);
        assert_eq!(decision.percentage, dec("20"));
    }
}
