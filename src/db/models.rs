//! # Database Models
//!
//! This module defines the data structures that map to database tables.
//! Each struct represents a row in a table.
//!
//! ## Table Overview
//!
//! | Table | Description |
//! |-------|-------------|
//! | `investment_plans` | Read-only plan templates |
//! | `investments` | One row per subscription investment |
//! | `commissions` | One-shot referral commission ledger |
//!
//! ## Relationship Diagram
//!
//! ```text
//! ┌──────────────────┐       ┌──────────────────┐
//! │ investment_plans │──────<│   investments    │
//! │                  │       │                  │
//! │ id (PK)          │       │ plan_id (FK)     │
//! │ min/max amount   │       │ amount           │
//! │ daily return %   │       │ status           │
//! └──────────────────┘       └──────────────────┘
//!                                     │
//!                                     │ 1:0..1
//!                                     ▼
//!                            ┌──────────────────┐
//!                            │   commissions    │
//!                            │                  │
//!                            │ investment (UQ)  │
//!                            │ rate, amount     │
//!                            └──────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an investment.
///
/// `Active` is the only state from which automatic accrual happens.
/// `Completed` and `Cancelled` are terminal; once reached, earnings are
/// frozen and only the stored `final_earnings` is returned on reads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentStatus {
    /// Accruing daily earnings
    Active,
    /// Reached maturity (or force-completed); earnings frozen
    Completed,
    /// Admin-paused; the duration clock is stopped
    Paused,
    /// Admin-cancelled; earnings frozen at cancellation
    Cancelled,
}

impl InvestmentStatus {
    /// Database/API string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentStatus::Active => "active",
            InvestmentStatus::Completed => "completed",
            InvestmentStatus::Paused => "paused",
            InvestmentStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from the database/API string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(InvestmentStatus::Active),
            "completed" => Some(InvestmentStatus::Completed),
            "paused" => Some(InvestmentStatus::Paused),
            "cancelled" => Some(InvestmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states stop automatic accrual permanently.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvestmentStatus::Completed | InvestmentStatus::Cancelled)
    }
}

/// Commission status.
///
/// `pending → paid` is a one-way admin action; there is no automatic
/// transition and no way back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    /// Awaiting admin payout
    Pending,
    /// Paid out to the referrer
    Paid,
}

impl CommissionStatus {
    /// Database/API string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Paid => "paid",
        }
    }

    /// Parse from the database/API string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CommissionStatus::Pending),
            "paid" => Some(CommissionStatus::Paid),
            _ => None,
        }
    }
}

/// Represents an investment plan template row.
///
/// Plans are reference data, read-only to this service. Their terms are
/// copied into each investment at creation time, so later plan edits never
/// retroactively change existing investments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    /// Plan ID.
    pub id: Uuid,

    /// Display name ("Starter", "Growth", ...).
    pub name: String,

    /// Minimum principal accepted by this plan.
    pub min_amount: Decimal,

    /// Maximum principal accepted by this plan.
    pub max_amount: Decimal,

    /// Simple daily yield in percent (e.g. 1.5 for 1.5%/day).
    pub daily_return_percentage: Decimal,

    /// Fixed investment duration in days.
    pub duration_days: i32,

    /// Total yield at maturity in percent.
    /// Consistent with `daily_return_percentage * duration_days`.
    pub total_return_percentage: Decimal,

    /// When the plan was created.
    pub created_at: DateTime<Utc>,
}

/// Represents an investment row.
///
/// ## Field Groups
///
/// | Group | Fields | Mutability |
/// |-------|--------|------------|
/// | Identity | id, user_id, crypto, plan_id | immutable |
/// | Principal | amount | immutable |
/// | Plan snapshot | plan_daily_return_percentage, total_return_percentage, duration_days | immutable |
/// | Effective rate | daily_return_percentage | admin-overridable |
/// | Schedule | start_date, end_date, paused_at | end_date extends on resume |
/// | Lifecycle | status, final_earnings, admin_notes | narrow updates only |
/// | Adjustment | adjustment_* | narrow updates only |
///
/// ## Note on the Two Rate Fields
///
/// `plan_daily_return_percentage` is the immutable snapshot taken from the
/// plan at creation. `daily_return_percentage` is the effective rate that
/// feeds the accrual calculator; it starts equal to the snapshot and may be
/// overridden per investment by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentRecord {
    /// Unique investment ID (UUID v4).
    pub id: Uuid,

    /// Owning user.
    pub user_id: Uuid,

    /// Asset symbol the investment is denominated in (e.g. "BTC").
    pub crypto: String,

    /// The plan this investment was created from.
    pub plan_id: Uuid,

    /// Principal. Fixed at creation, always positive.
    pub amount: Decimal,

    /// Immutable snapshot of the plan's daily return percentage.
    pub plan_daily_return_percentage: Decimal,

    /// Effective daily return percentage feeding accrual.
    pub daily_return_percentage: Decimal,

    /// Total return percentage snapshot.
    pub total_return_percentage: Decimal,

    /// Duration in days.
    pub duration_days: i32,

    /// When accrual starts.
    pub start_date: DateTime<Utc>,

    /// `start_date + duration_days`, extended only by pause/resume.
    pub end_date: DateTime<Utc>,

    /// Current lifecycle status.
    pub status: InvestmentStatus,

    /// Manual adjustment amount. Kept as history after deactivation.
    pub adjustment_amount: Option<Decimal>,

    /// Why the adjustment was applied.
    pub adjustment_reason: Option<String>,

    /// When the adjustment was last activated.
    pub adjustment_applied_at: Option<DateTime<Utc>>,

    /// When true, the adjustment amount fully replaces calculated earnings.
    pub adjustment_active: bool,

    /// Earnings frozen when the investment entered a terminal state.
    pub final_earnings: Option<Decimal>,

    /// Set while paused; the duration clock stops here.
    pub paused_at: Option<DateTime<Utc>>,

    /// The moment the earnings were frozen (terminal states only). The
    /// displayed day clock stops here too, so the elapsed days shown for a
    /// cancelled investment always match its frozen earnings.
    pub finalized_at: Option<DateTime<Utc>>,

    /// Note recorded with the last admin-forced status change.
    pub admin_notes: Option<String>,

    /// When the investment was created.
    pub created_at: DateTime<Utc>,

    /// When this row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Represents a commission row.
///
/// A commission is a ledger entry: written once when a referred investment
/// is created, never recomputed afterwards. This deliberately differs from
/// the investment's derived fields, which are live values recomputed on
/// every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionRecord {
    /// Unique commission ID (UUID v4).
    pub id: Uuid,

    /// The user who referred the investor.
    pub referrer_id: Uuid,

    /// The investing (referred) user.
    pub referee_id: Uuid,

    /// The triggering investment. UNIQUE: one commission per investment.
    pub investment_id: Uuid,

    /// Snapshot of the investment principal at creation.
    pub investment_amount: Decimal,

    /// Commission rate in percent, snapshotted from configuration.
    pub rate: Decimal,

    /// `investment_amount * rate / 100`.
    pub amount: Decimal,

    /// Current status.
    pub status: CommissionStatus,

    /// When the commission was derived.
    pub created_at: DateTime<Utc>,

    /// When the commission was marked paid (if it has been).
    pub paid_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["active", "completed", "paused", "cancelled"] {
            assert_eq!(InvestmentStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(InvestmentStatus::parse("archived").is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(InvestmentStatus::Completed.is_terminal());
        assert!(InvestmentStatus::Cancelled.is_terminal());
        assert!(!InvestmentStatus::Active.is_terminal());
        assert!(!InvestmentStatus::Paused.is_terminal());
    }

    #[test]
    fn test_commission_status_round_trip() {
        assert_eq!(CommissionStatus::parse("pending"), Some(CommissionStatus::Pending));
        assert_eq!(CommissionStatus::parse("paid"), Some(CommissionStatus::Paid));
        assert!(CommissionStatus::parse("void").is_none());
    }
}
