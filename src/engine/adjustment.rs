//! # Adjustment Resolver
//!
//! Applies the optional admin manual override on top of calculated
//! earnings. The override is a full replacement, never additive: while
//! `adjustment_active` is set, the stored adjustment amount IS the
//! investment's current earnings, regardless of elapsed time.
//!
//! This is a deliberate non-ledger correction mechanism. Setting or
//! clearing an adjustment creates no transaction record - which is
//! symmetric with organic accrual, which is never materialized as discrete
//! transactions either.

use rust_decimal::Decimal;

use crate::db::InvestmentRecord;

/// Resolve the effective earnings for an investment.
///
/// Returns the manual adjustment amount verbatim when the adjustment is
/// active, otherwise the calculated earnings. An active flag with no
/// stored amount should not occur; it resolves to zero rather than
/// falling through to calculated earnings, keeping the override total.
pub fn resolve(inv: &InvestmentRecord, calculated_earnings: Decimal) -> Decimal {
    if inv.adjustment_active {
        inv.adjustment_amount.unwrap_or(Decimal::ZERO)
    } else {
        calculated_earnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InvestmentStatus;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_investment() -> InvestmentRecord {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        InvestmentRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            crypto: "SOL".to_string(),
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
    fn inactive_adjustment_passes_calculated_through() {
        let inv = sample_investment();
        assert_eq!(resolve(&inv, dec!(105)), dec!(105));
    }

    #[test]
    fn active_adjustment_fully_replaces_calculated() {
        let mut inv = sample_investment();
        inv.adjustment_amount = Some(dec!(50));
        inv.adjustment_reason = Some("support correction".to_string());
        inv.adjustment_active = true;

        // Replacement, not addition.
        assert_eq!(resolve(&inv, dec!(105)), dec!(50));
        assert_eq!(resolve(&inv, dec!(0)), dec!(50));
    }

    #[test]
    fn deactivated_adjustment_resumes_calculated_earnings() {
        let mut inv = sample_investment();
        // Historical record stays; only the flag matters.
        inv.adjustment_amount = Some(dec!(50));
        inv.adjustment_reason = Some("old correction".to_string());
        inv.adjustment_active = false;

        assert_eq!(resolve(&inv, dec!(105)), dec!(105));
    }

    #[test]
    fn negative_adjustment_is_honored() {
        // Admins may correct earnings downward past zero (a recorded loss).
        let mut inv = sample_investment();
        inv.adjustment_amount = Some(dec!(-25));
        inv.adjustment_active = true;

        assert_eq!(resolve(&inv, dec!(105)), dec!(-25));
    }
}
