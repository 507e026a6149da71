//! # API Request Models
//!
//! Structures for incoming API request bodies and query strings.
//! Each struct represents the expected JSON body for an endpoint.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create a new subscription investment.
///
/// ## Example JSON
///
/// ```json
/// {
///     "userId": "a3f1c9c2-...",
///     "crypto": "BTC",
///     "planId": "5b0f7b9e-...",
///     "amount": 1000,
///     "referrerId": "7d2e5a10-..."
/// }
/// ```
///
/// ## Notes
///
/// - `amount` must lie within the plan's `[minAmount, maxAmount]`.
/// - `referrerId` is optional; when present, a referral commission is
///   derived once against the principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvestmentRequest {
    /// The investing user.
    pub user_id: Uuid,

    /// Asset symbol (e.g. "BTC").
    pub crypto: String,

    /// The plan to subscribe to.
    pub plan_id: Uuid,

    /// Principal to invest.
    pub amount: Decimal,

    /// The user who referred this investor, if any.
    pub referrer_id: Option<Uuid>,
}

/// Request to override an investment's effective daily return percentage.
///
/// ## Example JSON
///
/// ```json
/// {
///     "dailyReturnPercentage": 1.75
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDailyReturnRequest {
    /// New effective rate, in percent. Must lie within `[0, cap]`
    /// (`MAX_DAILY_RETURN_PERCENTAGE`, default 10).
    pub daily_return_percentage: Decimal,
}

/// Request to set or clear a manual earnings adjustment.
///
/// ## Example JSON
///
/// ```json
/// {
///     "amount": 50,
///     "reason": "support ticket #4821 correction",
///     "isActive": true
/// }
/// ```
///
/// ## Notes
///
/// - While active, `amount` fully replaces calculated earnings.
/// - `reason` is required when activating.
/// - `{"amount": 0, "isActive": false}` is the documented reset idiom:
///   calculated earnings resume on the next read, the old
///   amount/reason/appliedAt stay as history.
/// - No transaction record is created by this operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAdjustRequest {
    /// Override earnings amount.
    pub amount: Decimal,

    /// Why the override is applied. Required when `isActive` is true.
    pub reason: Option<String>,

    /// Whether the override is in effect.
    pub is_active: bool,
}

/// Request to force an investment status change.
///
/// ## Example JSON
///
/// ```json
/// {
///     "status": "paused",
///     "adminNotes": "pending compliance review"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    /// Target status: active, completed, paused or cancelled.
    pub status: String,

    /// Note recorded with the transition.
    pub admin_notes: Option<String>,
}

/// Query parameters for investment listings.
///
/// ## Example URL
///
/// ```text
/// GET /api/admin/subscription-investments?status=active&page=2&limit=20
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentQuery {
    /// Filter by status (optional).
    pub status: Option<String>,

    /// 1-based page number. Default: 1
    #[serde(default = "default_page")]
    pub page: i64,

    /// Page size. Default: 20, clamped to the configured maximum.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query parameters for commission listings.
///
/// ## Example URL
///
/// ```text
/// GET /api/admin/commissions?status=pending&page=1&limit=20
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionQuery {
    /// Filter by status (optional).
    pub status: Option<String>,

    /// 1-based page number. Default: 1
    #[serde(default = "default_page")]
    pub page: i64,

    /// Page size. Default: 20, clamped to the configured maximum.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query parameters for the commission CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    /// Filter by status (optional); empty exports everything.
    pub status: Option<String>,
}

/// Query parameters for the client portfolio view.
///
/// Authentication is handled upstream; the owning user arrives as an
/// explicit identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioQuery {
    /// The user whose portfolio to aggregate.
    pub user_id: Uuid,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let q: InvestmentQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 20);
        assert!(q.status.is_none());
    }

    #[test]
    fn test_manual_adjust_reset_idiom() {
        let req: ManualAdjustRequest =
            serde_json::from_str(r#"{"amount": 0, "isActive": false}"#).unwrap();
        assert!(!req.is_active);
        assert!(req.reason.is_none());
    }
}
