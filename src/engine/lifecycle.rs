//! # Lifecycle State Machine
//!
//! Governs investment status and the accrual clock.
//!
//! ## State Diagram
//!
//! ```text
//!             automatic (settlement pass, daysElapsed >= duration)
//!   ┌────────┐─────────────────────────────────────►┌───────────┐
//!   │ active │                                      │ completed │ (terminal)
//!   └────────┘◄──────────┐                          └───────────┘
//!       │    admin resume│                                ▲
//!       │ admin          │                     admin force│
//!       ▼                │                                │
//!   ┌────────┐───────────┴──────────────────────────────  │
//!   │ paused │──────────────────────────►┌───────────┐────┘
//!   └────────┘        admin              │ cancelled │ (terminal)
//!                                        └───────────┘
//! ```
//!
//! Terminal states are closed: reopening a completed or cancelled
//! investment is unsupported, because the source contract leaves
//! recompute-vs-restart semantics undefined.
//!
//! ## Pause Semantics
//!
//! Pausing freezes the duration clock. `paused_at` marks where it stopped;
//! accrual reads of a paused record are evaluated as of that moment, and
//! resuming extends `end_date` by the paused interval (done in SQL, see
//! `queries::resume_investment`).

use chrono::{DateTime, Utc};

use crate::db::{InvestmentRecord, InvestmentStatus};
use super::EngineError;

/// The timestamp the accrual clock has actually reached for this record.
///
/// For a paused investment that is `paused_at`; for a terminal one it is
/// `finalized_at`, so the displayed day count stops where the earnings were
/// frozen instead of drifting on toward the full duration. Everything else
/// reads the caller's `as_of` unchanged.
pub fn accrual_cutoff(inv: &InvestmentRecord, as_of: DateTime<Utc>) -> DateTime<Utc> {
    let stamp = match inv.status {
        InvestmentStatus::Paused => inv.paused_at,
        InvestmentStatus::Completed | InvestmentStatus::Cancelled => inv.finalized_at,
        InvestmentStatus::Active => None,
    };
    stamp.map_or(as_of, |t| t.min(as_of))
}

/// Whether the settlement pass should mature this record at `as_of`.
///
/// Only `active` investments mature, and only once their end date has
/// passed (equivalently, once `daysElapsed >= duration`).
pub fn is_matured(inv: &InvestmentRecord, as_of: DateTime<Utc>) -> bool {
    inv.status == InvestmentStatus::Active && as_of >= inv.end_date
}

/// Validate an admin-forced status transition.
///
/// Allowed edges:
/// - `active -> paused | cancelled | completed` (force-complete freezes
///   earnings at the days elapsed when the transition lands, not at full
///   maturity - early completion does not pay out the remaining days)
/// - `paused -> active | cancelled | completed`
///
/// Terminal states reject everything, and same-state transitions are
/// rejected as no-ops so the audit trail never records a change that
/// didn't happen.
pub fn validate_transition(
    from: InvestmentStatus,
    to: InvestmentStatus,
) -> Result<(), EngineError> {
    let err = || EngineError::InvalidTransition {
        from: from.as_str(),
        to: to.as_str(),
    };

    if from.is_terminal() || from == to {
        return Err(err());
    }

    match (from, to) {
        (InvestmentStatus::Active, _) => Ok(()),
        (InvestmentStatus::Paused, _) => Ok(()),
        _ => Err(err()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_investment(status: InvestmentStatus) -> InvestmentRecord {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        InvestmentRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            crypto: "BTC".to_string(),
            plan_id: Uuid::new_v4(),
            amount: dec!(500),
            plan_daily_return_percentage: dec!(1),
            daily_return_percentage: dec!(1),
            total_return_percentage: dec!(30),
            duration_days: 30,
            start_date: start,
            end_date: start + Duration::days(30),
            status,
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
    fn active_matures_at_end_date() {
        let inv = sample_investment(InvestmentStatus::Active);
        assert!(!is_matured(&inv, inv.end_date - Duration::seconds(1)));
        assert!(is_matured(&inv, inv.end_date));
        assert!(is_matured(&inv, inv.end_date + Duration::days(100)));
    }

    #[test]
    fn non_active_never_matures() {
        for status in [
            InvestmentStatus::Paused,
            InvestmentStatus::Completed,
            InvestmentStatus::Cancelled,
        ] {
            let inv = sample_investment(status);
            assert!(!is_matured(&inv, inv.end_date + Duration::days(1)));
        }
    }

    #[test]
    fn cutoff_stops_at_paused_at() {
        let mut inv = sample_investment(InvestmentStatus::Paused);
        let paused = inv.start_date + Duration::days(10);
        inv.paused_at = Some(paused);

        assert_eq!(accrual_cutoff(&inv, paused + Duration::days(5)), paused);
        // A query from before the pause is not pushed forward.
        let earlier = paused - Duration::days(2);
        assert_eq!(accrual_cutoff(&inv, earlier), earlier);
    }

    #[test]
    fn cutoff_stops_at_finalized_at_for_terminal() {
        for status in [InvestmentStatus::Cancelled, InvestmentStatus::Completed] {
            let mut inv = sample_investment(status);
            let frozen = inv.start_date + Duration::days(12);
            inv.finalized_at = Some(frozen);

            // The day clock never drifts past the freeze moment.
            assert_eq!(accrual_cutoff(&inv, frozen + Duration::days(90)), frozen);
        }
    }

    #[test]
    fn cutoff_passthrough_for_active() {
        let inv = sample_investment(InvestmentStatus::Active);
        let as_of = inv.start_date + Duration::days(3);
        assert_eq!(accrual_cutoff(&inv, as_of), as_of);
    }

    #[test]
    fn admin_transitions_from_active() {
        use InvestmentStatus::*;
        assert!(validate_transition(Active, Paused).is_ok());
        assert!(validate_transition(Active, Cancelled).is_ok());
        assert!(validate_transition(Active, Completed).is_ok());
        assert!(validate_transition(Active, Active).is_err());
    }

    #[test]
    fn admin_transitions_from_paused() {
        use InvestmentStatus::*;
        assert!(validate_transition(Paused, Active).is_ok());
        assert!(validate_transition(Paused, Cancelled).is_ok());
        assert!(validate_transition(Paused, Completed).is_ok());
        assert!(validate_transition(Paused, Paused).is_err());
    }

    #[test]
    fn terminal_states_are_closed() {
        use InvestmentStatus::*;
        for from in [Completed, Cancelled] {
            for to in [Active, Paused, Completed, Cancelled] {
                assert!(validate_transition(from, to).is_err());
            }
        }
    }
}
