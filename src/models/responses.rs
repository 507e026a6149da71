//! # API Response Models
//!
//! Structures for outgoing API response bodies.
//! All responses are wrapped in a standard format.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{CommissionRecord, InvestmentRecord, PlanRecord};
use crate::engine::accrual::AccrualResult;
use crate::utils::round_money;

/// Standard API response wrapper.
///
/// All API responses follow this format:
///
/// ## Success Response
///
/// ```json
/// {
///     "success": true,
///     "data": { ... },
///     "error": null
/// }
/// ```
///
/// ## Error Response
///
/// ```json
/// {
///     "success": false,
///     "data": null,
///     "error": {
///         "code": "INVALID_STATUS_TRANSITION",
///         "message": "Invalid status transition: completed -> active"
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the request was successful.
    pub success: bool,

    /// Response data (null on error).
    pub data: Option<T>,

    /// Error information (null on success).
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// API error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Error code (e.g., "INVALID_STATUS_TRANSITION").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// Manual adjustment view, nested under `manualAdjustment`.
///
/// Present whenever an adjustment has ever been set on the investment;
/// `isActive` says whether it currently overrides calculated earnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAdjustmentView {
    /// Override earnings amount.
    pub amount: Decimal,

    /// Why the override was applied.
    pub reason: Option<String>,

    /// When the override was last activated.
    pub applied_at: Option<DateTime<Utc>>,

    /// Whether the override is currently in effect.
    pub is_active: bool,
}

/// Investment with server-side derived fields.
///
/// Field names match the persisted-state contract exactly:
/// `dailyReturnPercentage`, `totalReturnPercentage`, `duration`,
/// `manualAdjustment.{amount,reason,appliedAt,isActive}`, `status`,
/// `daysElapsed`, `daysRemaining`, `currentEarnings`, `currentValue`,
/// `profitLoss`, `profitLossPercentage`.
///
/// Monetary and percentage values are rounded to two decimal places here,
/// at the display edge; all upstream computation keeps full precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentResponse {
    /// Investment ID.
    pub id: Uuid,

    /// Owning user.
    pub user: Uuid,

    /// Asset symbol.
    pub crypto: String,

    /// Originating plan.
    pub investment_plan: Uuid,

    /// Principal.
    pub amount: Decimal,

    /// Immutable plan-snapshot rate.
    pub plan_daily_return_percentage: Decimal,

    /// Effective (admin-overridable) rate.
    pub daily_return_percentage: Decimal,

    /// Total return percentage snapshot.
    pub total_return_percentage: Decimal,

    /// Duration in days.
    pub duration: i32,

    /// When accrual started.
    pub start_date: DateTime<Utc>,

    /// When the investment matures.
    pub end_date: DateTime<Utc>,

    /// Lifecycle status.
    pub status: String,

    /// Manual adjustment, if one has ever been set.
    pub manual_adjustment: Option<ManualAdjustmentView>,

    /// Whole days elapsed, clamped to duration.
    pub days_elapsed: i64,

    /// Days until maturity.
    pub days_remaining: i64,

    /// Effective earnings right now.
    pub current_earnings: Decimal,

    /// `amount + currentEarnings`.
    pub current_value: Decimal,

    /// Equal to `currentEarnings`.
    pub profit_loss: Decimal,

    /// `currentEarnings / amount * 100`.
    pub profit_loss_percentage: Decimal,

    /// Note from the last admin-forced status change.
    pub admin_notes: Option<String>,

    /// When the investment was created.
    pub created_at: DateTime<Utc>,
}

impl InvestmentResponse {
    /// Build from a stored record plus its evaluated derived fields.
    pub fn from_record(record: &InvestmentRecord, derived: &AccrualResult) -> Self {
        let manual_adjustment = record.adjustment_amount.map(|amount| ManualAdjustmentView {
            amount: round_money(amount),
            reason: record.adjustment_reason.clone(),
            applied_at: record.adjustment_applied_at,
            is_active: record.adjustment_active,
        });

        Self {
            id: record.id,
            user: record.user_id,
            crypto: record.crypto.clone(),
            investment_plan: record.plan_id,
            amount: round_money(record.amount),
            plan_daily_return_percentage: record.plan_daily_return_percentage,
            daily_return_percentage: record.daily_return_percentage,
            total_return_percentage: record.total_return_percentage,
            duration: record.duration_days,
            start_date: record.start_date,
            end_date: record.end_date,
            status: record.status.as_str().to_string(),
            manual_adjustment,
            days_elapsed: derived.days_elapsed,
            days_remaining: derived.days_remaining,
            current_earnings: round_money(derived.current_earnings),
            current_value: round_money(derived.current_value),
            profit_loss: round_money(derived.profit_loss),
            profit_loss_percentage: round_money(derived.profit_loss_percentage),
            admin_notes: record.admin_notes.clone(),
            created_at: record.created_at,
        }
    }
}

/// Investment list response with pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentListResponse {
    /// Page of investments.
    pub investments: Vec<InvestmentResponse>,

    /// Total matching records (for pagination).
    pub total: i64,

    /// Current 1-based page.
    pub page: i64,

    /// Page size used.
    pub limit: i64,
}

/// Plan catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    /// Plan ID.
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// Minimum principal.
    pub min_amount: Decimal,

    /// Maximum principal.
    pub max_amount: Decimal,

    /// Daily yield in percent.
    pub daily_return_percentage: Decimal,

    /// Duration in days.
    pub duration: i32,

    /// Total yield at maturity in percent.
    pub total_return_percentage: Decimal,
}

impl From<&PlanRecord> for PlanResponse {
    fn from(plan: &PlanRecord) -> Self {
        Self {
            id: plan.id,
            name: plan.name.clone(),
            min_amount: plan.min_amount,
            max_amount: plan.max_amount,
            daily_return_percentage: plan.daily_return_percentage,
            duration: plan.duration_days,
            total_return_percentage: plan.total_return_percentage,
        }
    }
}

/// Commission record response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionResponse {
    /// Commission ID.
    pub id: Uuid,

    /// Referring user.
    pub referrer: Uuid,

    /// Referred (investing) user.
    pub referee: Uuid,

    /// The triggering investment.
    pub investment: Uuid,

    /// Principal snapshot at derivation time.
    pub investment_amount: Decimal,

    /// Commission rate in percent (snapshot).
    pub rate: Decimal,

    /// `investmentAmount * rate / 100`.
    pub amount: Decimal,

    /// pending or paid.
    pub status: String,

    /// When the commission was derived.
    pub created_at: DateTime<Utc>,

    /// When it was marked paid.
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&CommissionRecord> for CommissionResponse {
    fn from(record: &CommissionRecord) -> Self {
        Self {
            id: record.id,
            referrer: record.referrer_id,
            referee: record.referee_id,
            investment: record.investment_id,
            investment_amount: round_money(record.investment_amount),
            rate: record.rate,
            amount: round_money(record.amount),
            status: record.status.as_str().to_string(),
            created_at: record.created_at,
            paid_at: record.paid_at,
        }
    }
}

/// Commission list response with pagination.
///
/// Matches the admin console contract: `{items, total, page, limit}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionListResponse {
    /// Page of commissions.
    pub items: Vec<CommissionResponse>,

    /// Total matching records.
    pub total: i64,

    /// Current 1-based page.
    pub page: i64,

    /// Page size used.
    pub limit: i64,
}

/// Aggregated totals for the client portfolio view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    /// Sum of principals.
    pub total_invested: Decimal,

    /// Sum of current values.
    pub total_current_value: Decimal,

    /// Sum of profit/loss.
    pub total_profit_loss: Decimal,

    /// `totalProfitLoss / totalInvested * 100` (0 for an empty portfolio).
    pub total_profit_loss_percentage: Decimal,
}

/// Client portfolio response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    /// The user's investments with derived fields.
    pub investments: Vec<InvestmentResponse>,

    /// Aggregated totals.
    pub summary: PortfolioSummary,
}

/// Result of one settlement pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementPassResponse {
    /// Active investments inspected.
    pub scanned: u64,

    /// Investments matured to `completed`.
    pub matured: u64,

    /// Records that failed and were skipped.
    pub failed: u64,

    /// When the pass ran.
    pub ran_at: DateTime<Utc>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status: "healthy" or "unhealthy".
    pub status: String,

    /// Database connection status.
    pub database: bool,

    /// Service version.
    pub version: String,

    /// Current timestamp.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InvestmentStatus;
    use crate::engine;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn sample_record() -> InvestmentRecord {
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
    fn test_contract_field_names() {
        let record = sample_record();
        let derived = engine::evaluate(&record, record.start_date + Duration::days(7)).unwrap();
        let response = InvestmentResponse::from_record(&record, &derived);

        let json = serde_json::to_value(&response).unwrap();
        // Persisted-state names the admin console and dashboard consume.
        for key in [
            "dailyReturnPercentage",
            "totalReturnPercentage",
            "duration",
            "status",
            "daysElapsed",
            "daysRemaining",
            "currentEarnings",
            "currentValue",
            "profitLoss",
            "profitLossPercentage",
        ] {
            assert!(json.get(key).is_some(), "missing field {}", key);
        }
    }

    #[test]
    fn test_manual_adjustment_nested_names() {
        let mut record = sample_record();
        record.adjustment_amount = Some(dec!(50));
        record.adjustment_reason = Some("correction".to_string());
        record.adjustment_applied_at = Some(record.start_date);
        record.adjustment_active = true;

        let derived = engine::evaluate(&record, record.start_date + Duration::days(3)).unwrap();
        let response = InvestmentResponse::from_record(&record, &derived);
        let json = serde_json::to_value(&response).unwrap();

        let adj = json.get("manualAdjustment").unwrap();
        for key in ["amount", "reason", "appliedAt", "isActive"] {
            assert!(adj.get(key).is_some(), "missing adjustment field {}", key);
        }
        assert_eq!(json["currentEarnings"], serde_json::json!(50.0));
    }

    #[test]
    fn test_deactivated_adjustment_keeps_history_in_view() {
        // After the reset idiom {"amount": 0, "isActive": false} the stored
        // columns still carry the last-active override (the deactivating
        // write leaves them untouched); the view must show that history
        // while earnings fall back to the calculated figure.
        let mut record = sample_record();
        record.adjustment_amount = Some(dec!(50));
        record.adjustment_reason = Some("ticket #4821".to_string());
        record.adjustment_applied_at = Some(record.start_date);
        record.adjustment_active = false;

        let derived = engine::evaluate(&record, record.start_date + Duration::days(7)).unwrap();
        let response = InvestmentResponse::from_record(&record, &derived);
        let json = serde_json::to_value(&response).unwrap();

        let adj = json.get("manualAdjustment").unwrap();
        assert_eq!(adj["amount"], serde_json::json!(50.0));
        assert_eq!(adj["reason"], serde_json::json!("ticket #4821"));
        assert_eq!(adj["isActive"], serde_json::json!(false));
        assert_eq!(json["currentEarnings"], serde_json::json!(105.0));
    }

    #[test]
    fn test_envelope_shapes() {
        let ok: ApiResponse<i32> = ApiResponse::success(7);
        assert!(ok.success);
        assert_eq!(ok.data, Some(7));
        assert!(ok.error.is_none());

        let err: ApiResponse<i32> = ApiResponse::error("BAD_INPUT", "nope");
        assert!(!err.success);
        assert!(err.data.is_none());
        assert_eq!(err.error.unwrap().code, "BAD_INPUT");
    }
}
