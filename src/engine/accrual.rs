//! # Accrual Calculator
//!
//! Pure computation of elapsed-time daily earnings. Given an investment's
//! stored fields and an explicit `as_of` timestamp, it produces every
//! derived field the API exposes.
//!
//! ## Yield Model
//!
//! Simple (non-compounding) daily yield:
//!
//! ```text
//! currentEarnings = amount * dailyReturnPercentage / 100 * daysElapsed
//! daysElapsed     = clamp(floor((asOf - startDate) / 1 day), 0, duration)
//! ```
//!
//! This matches the plan semantics where
//! `totalReturnPercentage = dailyReturnPercentage * duration`. Earnings are
//! recomputed from principal on every call - nothing is incremented - so
//! the calculation is idempotent and safe to run on every read.
//!
//! Values are kept at full `Decimal` precision here; rounding to two
//! decimal places happens only at the response-building edge.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::db::InvestmentRecord;
use super::EngineError;

/// All derived fields for one investment at one point in time.
///
/// Field names follow the persisted-state contract: these serialize (via
/// the response models) as `daysElapsed`, `daysRemaining`,
/// `currentEarnings`, `currentValue`, `profitLoss`,
/// `profitLossPercentage`.
#[derive(Debug, Clone, PartialEq)]
pub struct AccrualResult {
    /// Whole days elapsed since start, clamped to `[0, duration]`.
    pub days_elapsed: i64,

    /// `duration - days_elapsed`.
    pub days_remaining: i64,

    /// Earnings at the effective daily rate.
    pub current_earnings: Decimal,

    /// `amount + current_earnings`.
    pub current_value: Decimal,

    /// Equal to `current_earnings`.
    pub profit_loss: Decimal,

    /// `current_earnings / amount * 100`.
    pub profit_loss_percentage: Decimal,
}

impl AccrualResult {
    /// Rebuild the monetary fields around a different earnings figure,
    /// keeping the elapsed-day clock.
    ///
    /// Used when a manual adjustment or a frozen terminal value replaces
    /// the calculated earnings. `amount` must be positive (the calculator
    /// has already verified it).
    pub fn with_effective_earnings(self, amount: Decimal, earnings: Decimal) -> Self {
        Self {
            days_elapsed: self.days_elapsed,
            days_remaining: self.days_remaining,
            current_earnings: earnings,
            current_value: amount + earnings,
            profit_loss: earnings,
            profit_loss_percentage: earnings / amount * Decimal::ONE_HUNDRED,
        }
    }
}

/// Compute calculated (pre-adjustment) derived fields at `as_of`.
///
/// Pure over the stored fields and the explicit timestamp. Querying before
/// `start_date` clamps elapsed days to zero; querying after `end_date`
/// clamps to `duration`, so accrual can never exceed the plan duration.
///
/// ## Errors
///
/// `EngineError::NonPositiveAmount` when the stored principal is not
/// positive. That row is corrupt; the caller surfaces the error without
/// aborting work on other records.
pub fn calculate(
    inv: &InvestmentRecord,
    as_of: DateTime<Utc>,
) -> Result<AccrualResult, EngineError> {
    if inv.amount <= Decimal::ZERO {
        return Err(EngineError::NonPositiveAmount {
            id: inv.id,
            amount: inv.amount,
        });
    }

    let days_elapsed = elapsed_days(inv.start_date, as_of, inv.duration_days);
    let days_remaining = i64::from(inv.duration_days) - days_elapsed;

    let current_earnings = inv.amount
        * inv.daily_return_percentage
        / Decimal::ONE_HUNDRED
        * Decimal::from(days_elapsed);

    Ok(AccrualResult {
        days_elapsed,
        days_remaining,
        current_earnings,
        current_value: inv.amount + current_earnings,
        profit_loss: current_earnings,
        profit_loss_percentage: current_earnings / inv.amount * Decimal::ONE_HUNDRED,
    })
}

/// Whole days between `start` and `as_of`, clamped to `[0, duration]`.
fn elapsed_days(start: DateTime<Utc>, as_of: DateTime<Utc>, duration_days: i32) -> i64 {
    if as_of <= start {
        return 0;
    }
    (as_of - start).num_days().clamp(0, i64::from(duration_days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InvestmentStatus;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_investment() -> InvestmentRecord {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        InvestmentRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            crypto: "ETH".to_string(),
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
    fn worked_example_day_seven() {
        // amount=1000, rate=1.5%/day, duration=14.
        let inv = sample_investment();
        let result = calculate(&inv, inv.start_date + Duration::days(7)).unwrap();

        assert_eq!(result.days_elapsed, 7);
        assert_eq!(result.days_remaining, 7);
        assert_eq!(result.current_earnings, dec!(105));
        assert_eq!(result.current_value, dec!(1105));
        assert_eq!(result.profit_loss, dec!(105));
        assert_eq!(result.profit_loss_percentage, dec!(10.5));
    }

    #[test]
    fn maturity_matches_total_return_percentage() {
        let inv = sample_investment();
        let result = calculate(&inv, inv.start_date + Duration::days(14)).unwrap();

        // 1.5% * 14 days = 21% of principal.
        assert_eq!(result.current_earnings, dec!(210));
        assert_eq!(
            result.current_earnings,
            inv.amount * inv.total_return_percentage / dec!(100)
        );
    }

    #[test]
    fn elapsed_days_clamped_at_duration() {
        let inv = sample_investment();
        // 100 days past maturity: still 14 elapsed days, never more.
        let result = calculate(&inv, inv.end_date + Duration::days(100)).unwrap();

        assert_eq!(result.days_elapsed, 14);
        assert_eq!(result.days_remaining, 0);
        assert_eq!(result.current_earnings, dec!(210));
    }

    #[test]
    fn elapsed_days_clamped_at_zero() {
        let inv = sample_investment();
        let result = calculate(&inv, inv.start_date - Duration::days(3)).unwrap();

        assert_eq!(result.days_elapsed, 0);
        assert_eq!(result.current_earnings, dec!(0));
        assert_eq!(result.current_value, dec!(1000));
    }

    #[test]
    fn partial_days_floor_to_whole_days() {
        let inv = sample_investment();
        let result = calculate(&inv, inv.start_date + Duration::hours(47)).unwrap();
        assert_eq!(result.days_elapsed, 1);
    }

    #[test]
    fn repeated_reads_are_identical() {
        let inv = sample_investment();
        let as_of = inv.start_date + Duration::days(5);

        let a = calculate(&inv, as_of).unwrap();
        let b = calculate(&inv, as_of).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_zero_amount() {
        let mut inv = sample_investment();
        inv.amount = dec!(0);
        assert!(calculate(&inv, inv.start_date).is_err());
    }

    #[test]
    fn with_effective_earnings_rebuilds_monetary_fields() {
        let inv = sample_investment();
        let result = calculate(&inv, inv.start_date + Duration::days(7)).unwrap();
        let adjusted = result.with_effective_earnings(inv.amount, dec!(50));

        assert_eq!(adjusted.days_elapsed, 7);
        assert_eq!(adjusted.current_earnings, dec!(50));
        assert_eq!(adjusted.current_value, dec!(1050));
        assert_eq!(adjusted.profit_loss_percentage, dec!(5));
    }
}
