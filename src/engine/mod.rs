//! # Settlement Engine (pure domain logic)
//!
//! This module holds the calculation core of the service, kept free of any
//! I/O so it stays deterministic and directly testable:
//!
//! | Module | Responsibility |
//! |--------|---------------|
//! | `accrual` | Elapsed-time daily earnings from principal and plan terms |
//! | `adjustment` | Manual-override precedence over calculated earnings |
//! | `lifecycle` | Status transitions and the accrual clock |
//!
//! Every function takes an explicit `as_of` timestamp; wall-clock time is
//! only read at the service layer. Derived fields are recomputed from
//! principal on every call, never incremented, so repeated evaluation is
//! idempotent and accumulates no rounding error.

pub mod accrual;
pub mod adjustment;
pub mod lifecycle;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::db::InvestmentRecord;
use accrual::AccrualResult;

/// Errors from the pure engine.
#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    /// The stored principal is non-positive. This is a data-integrity
    /// error: such a record must never exist, and the calculator refuses
    /// to divide through it.
    #[error("Investment {id} has non-positive amount {amount}")]
    NonPositiveAmount { id: Uuid, amount: Decimal },

    /// The requested admin status change is not allowed.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

/// Compute all derived fields for an investment at `as_of`.
///
/// This is the full read path: clamp the accrual clock (paused records
/// stop at `paused_at`), run the accrual calculator, overlay the manual
/// adjustment, and for terminal records return the frozen earnings
/// instead of a live value.
///
/// ## Example
///
/// ```rust,ignore
/// let derived = engine::evaluate(&investment, Utc::now())?;
/// println!("current earnings: {}", derived.current_earnings);
/// ```
pub fn evaluate(
    inv: &InvestmentRecord,
    as_of: DateTime<Utc>,
) -> Result<AccrualResult, EngineError> {
    let cutoff = lifecycle::accrual_cutoff(inv, as_of);
    let calc = accrual::calculate(inv, cutoff)?;

    let effective = if inv.status.is_terminal() {
        // Frozen at finalization; fall back to the resolver only if a
        // legacy row is missing its frozen value.
        inv.final_earnings
            .unwrap_or_else(|| adjustment::resolve(inv, calc.current_earnings))
    } else {
        adjustment::resolve(inv, calc.current_earnings)
    };

    Ok(calc.with_effective_earnings(inv.amount, effective))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InvestmentRecord, InvestmentStatus};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn sample_investment() -> InvestmentRecord {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        InvestmentRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            crypto: "BTC".to_string(),
            plan_id: Uuid::new_v4(),
            amount: dec!(1000),
            plan_daily_return_percentage: dec!(1.5),
            daily_return_percentage: dec!(1.5),
            total_return_percentage: dec!(21),
            duration_days: 14,
            start_date: start,
            end_date: start + Duration::days(14),
            status: InvestmentStatus::Active,
            adjustment_amount: None,
            adjustment_reason: None,
            adjustment_applied_at: None,
            adjustment_active: false,
            final_earnings: None,
            paused_at: None,
            finalized_at: None,
            admin_notes: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn evaluate_active_uses_calculated_earnings() {
        let inv = sample_investment();
        let as_of = inv.start_date + Duration::days(7);

        let derived = evaluate(&inv, as_of).unwrap();
        assert_eq!(derived.days_elapsed, 7);
        assert_eq!(derived.current_earnings, dec!(105));
        assert_eq!(derived.current_value, dec!(1105));
        assert_eq!(derived.profit_loss_percentage, dec!(10.5));
    }

    #[test]
    fn evaluate_override_wins_at_any_elapsed_time() {
        let mut inv = sample_investment();
        inv.adjustment_amount = Some(dec!(50));
        inv.adjustment_active = true;

        for days in [0i64, 3, 7, 14, 100] {
            let derived = evaluate(&inv, inv.start_date + Duration::days(days)).unwrap();
            assert_eq!(derived.current_earnings, dec!(50));
            assert_eq!(derived.current_value, dec!(1050));
            assert_eq!(derived.profit_loss, dec!(50));
        }
    }

    #[test]
    fn evaluate_terminal_returns_frozen_earnings() {
        let mut inv = sample_investment();
        inv.status = InvestmentStatus::Completed;
        inv.final_earnings = Some(dec!(210));

        // Long after maturity the frozen value still comes back unchanged.
        let derived = evaluate(&inv, inv.end_date + Duration::days(365)).unwrap();
        assert_eq!(derived.current_earnings, dec!(210));
        assert_eq!(derived.current_value, dec!(1210));
        assert_eq!(derived.days_elapsed, 14);
    }

    #[test]
    fn evaluate_cancelled_day_clock_matches_frozen_earnings() {
        let mut inv = sample_investment();
        inv.status = InvestmentStatus::Cancelled;
        // Cancelled on day 5: earnings frozen at 1000 * 1.5% * 5.
        inv.finalized_at = Some(inv.start_date + Duration::days(5));
        inv.final_earnings = Some(dec!(75));

        for later in [6i64, 14, 400] {
            let derived = evaluate(&inv, inv.start_date + Duration::days(later)).unwrap();
            assert_eq!(derived.days_elapsed, 5);
            assert_eq!(derived.days_remaining, 9);
            assert_eq!(derived.current_earnings, dec!(75));
        }
    }

    #[test]
    fn evaluate_paused_stops_the_clock() {
        let mut inv = sample_investment();
        inv.status = InvestmentStatus::Paused;
        inv.paused_at = Some(inv.start_date + Duration::days(5));

        // Queried three days into the pause: still five elapsed days.
        let derived = evaluate(&inv, inv.start_date + Duration::days(8)).unwrap();
        assert_eq!(derived.days_elapsed, 5);
        assert_eq!(derived.current_earnings, dec!(75));
    }

    #[test]
    fn evaluate_is_idempotent() {
        let inv = sample_investment();
        let as_of = inv.start_date + Duration::days(9);

        let first = evaluate(&inv, as_of).unwrap();
        let second = evaluate(&inv, as_of).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn evaluate_rejects_non_positive_amount() {
        let mut inv = sample_investment();
        inv.amount = dec!(0);

        let err = evaluate(&inv, inv.start_date).unwrap_err();
        assert!(matches!(err, EngineError::NonPositiveAmount { .. }));
    }
}
