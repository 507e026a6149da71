//! # API Request Handlers
//!
//! This module contains the handler functions for each API endpoint.
//! Each handler:
//! 1. Extracts request data
//! 2. Validates input
//! 3. Calls the appropriate service
//! 4. Returns a formatted response
//!
//! ## Error Handling
//!
//! All errors are caught and returned as JSON:
//!
//! ```json
//! {
//!     "success": false,
//!     "error": {
//!         "code": "AMOUNT_OUT_OF_BOUNDS",
//!         "message": "Amount 50 outside plan bounds [100, 999]"
//!     }
//! }
//! ```

use std::sync::Arc;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::{self, EngineError};
use crate::models::{
    ApiResponse, CreateInvestmentRequest, CommissionQuery, ExportQuery, HealthResponse,
    InvestmentQuery, InvestmentResponse, ManualAdjustRequest, PlanResponse, PortfolioQuery,
    UpdateDailyReturnRequest, UpdateStatusRequest,
};
use crate::services::commission::CommissionError;
use crate::services::settlement::SettlementError;
use crate::AppState;
use serde_json::json;

/// API information endpoint (root).
///
/// Returns information about available API endpoints.
///
/// ## Endpoint
///
/// `GET /`
pub async fn api_info() -> HttpResponse {
    let info = json!({
        "name": "Subscription Settlement API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Accrual and settlement backend for subscription investments",
        "endpoints": {
            "health": {
                "method": "GET",
                "path": "/health",
                "description": "Health check endpoint"
            },
            "investments": {
                "create": {
                    "method": "POST",
                    "path": "/api/investments",
                    "description": "Create a subscription investment"
                },
                "plans": {
                    "method": "GET",
                    "path": "/api/investments/plans",
                    "description": "List available plans"
                },
                "portfolio": {
                    "method": "GET",
                    "path": "/api/investments/portfolio?userId=...",
                    "description": "Aggregated portfolio for one user"
                }
            },
            "admin": {
                "list": {
                    "method": "GET",
                    "path": "/api/admin/subscription-investments",
                    "description": "List investments with derived fields"
                },
                "dailyReturn": {
                    "method": "PUT",
                    "path": "/api/admin/subscription-investments/{id}/daily-return",
                    "description": "Override the effective daily return"
                },
                "status": {
                    "method": "PUT",
                    "path": "/api/admin/subscription-investments/{id}/status",
                    "description": "Force a lifecycle transition"
                },
                "manualAdjust": {
                    "method": "PUT",
                    "path": "/api/admin/investments/{id}/manual-adjust",
                    "description": "Set or clear the manual earnings adjustment"
                },
                "commissions": {
                    "method": "GET",
                    "path": "/api/admin/commissions",
                    "description": "List referral commissions"
                },
                "commissionsExport": {
                    "method": "GET",
                    "path": "/api/admin/commissions/export.csv",
                    "description": "Export commissions as CSV"
                },
                "commissionPay": {
                    "method": "PUT",
                    "path": "/api/admin/commissions/{id}/pay",
                    "description": "Mark a pending commission as paid"
                },
                "settlementRun": {
                    "method": "POST",
                    "path": "/api/admin/settlement/run",
                    "description": "Run a settlement pass now"
                }
            }
        }
    });

    HttpResponse::Ok().json(ApiResponse::success(info))
}

/// Health check endpoint.
///
/// ## Endpoint
///
/// `GET /health`
///
/// ## Response
///
/// ```json
/// {
///     "success": true,
///     "data": {
///         "status": "healthy",
///         "database": true,
///         "version": "0.1.0",
///         "timestamp": "2026-08-23T12:00:00Z"
///     }
/// }
/// ```
pub async fn health_check(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let db_healthy = state.db.pool().get().await.is_ok();

    let response = HealthResponse {
        status: if db_healthy { "healthy" } else { "unhealthy" }.to_string(),
        database: db_healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    };

    let status_code = if db_healthy {
        actix_web::http::StatusCode::OK
    } else {
        actix_web::http::StatusCode::SERVICE_UNAVAILABLE
    };

    HttpResponse::build(status_code).json(ApiResponse::success(response))
}

// ==========================================
// CLIENT ENDPOINTS
// ==========================================

/// Create a new subscription investment.
///
/// ## Endpoint
///
/// `POST /api/investments`
///
/// ## Example
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/api/investments \
///   -H "Content-Type: application/json" \
///   -d '{
///     "userId": "a3f1c9c2-6f0e-4d0a-9d55-1c2b3a4d5e6f",
///     "crypto": "BTC",
///     "planId": "5b0f7b9e-0b1a-4f57-9c6f-2a4d1f8e3c02",
///     "amount": 1000,
///     "referrerId": "7d2e5a10-8b4c-4f1d-a2e3-9c8b7a6d5e4f"
///   }'
/// ```
///
/// When `referrerId` is present a referral commission is derived against
/// the principal. A commission failure does not fail the creation; it is
/// logged and the investment response is returned regardless.
pub async fn create_investment(
    state: web::Data<Arc<AppState>>,
    body: web::Json<CreateInvestmentRequest>,
) -> HttpResponse {
    info!(
        "Create investment request: user {} plan {} amount {}",
        body.user_id, body.plan_id, body.amount
    );

    let now = Utc::now();
    let request = body.into_inner();

    let record = match state.settlement.create_investment(&request, now).await {
        Ok(record) => record,
        Err(e) => {
            error!("Create investment failed: {}", e);
            return settlement_error_response(&e);
        }
    };

    if let Some(referrer_id) = request.referrer_id {
        if let Err(e) = state
            .commissions
            .derive_for_investment(&record, referrer_id, now)
            .await
        {
            warn!(
                "Commission derivation failed for investment {}: {}",
                record.id, e
            );
        }
    }

    match engine::evaluate(&record, now) {
        Ok(derived) => HttpResponse::Ok().json(ApiResponse::success(
            InvestmentResponse::from_record(&record, &derived),
        )),
        Err(e) => {
            error!("Evaluation failed for new investment {}: {}", record.id, e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("EVALUATION_FAILED", &e.to_string()))
        }
    }
}

/// List available investment plans.
///
/// ## Endpoint
///
/// `GET /api/investments/plans`
pub async fn list_plans(state: web::Data<Arc<AppState>>) -> HttpResponse {
    match crate::db::queries::list_plans(state.db.pool()).await {
        Ok(plans) => {
            let plans: Vec<PlanResponse> = plans.iter().map(PlanResponse::from).collect();
            HttpResponse::Ok().json(ApiResponse::success(plans))
        }
        Err(e) => {
            error!("List plans failed: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("DATABASE_ERROR", &e.to_string()))
        }
    }
}

/// Aggregated portfolio for one user.
///
/// ## Endpoint
///
/// `GET /api/investments/portfolio?userId={uuid}`
///
/// Authentication is handled upstream; the owning user arrives as an
/// explicit query parameter.
pub async fn get_portfolio(
    state: web::Data<Arc<AppState>>,
    query: web::Query<PortfolioQuery>,
) -> HttpResponse {
    match state.settlement.portfolio(query.user_id, Utc::now()).await {
        Ok(portfolio) => HttpResponse::Ok().json(ApiResponse::success(portfolio)),
        Err(e) => {
            error!("Portfolio failed for user {}: {}", query.user_id, e);
            settlement_error_response(&e)
        }
    }
}

// ==========================================
// ADMIN: INVESTMENTS
// ==========================================

/// List investments with derived fields (admin console).
///
/// ## Endpoint
///
/// `GET /api/admin/subscription-investments?status=active&page=1&limit=20`
pub async fn list_investments(
    state: web::Data<Arc<AppState>>,
    query: web::Query<InvestmentQuery>,
) -> HttpResponse {
    match state
        .settlement
        .list_investments(query.status.as_deref(), query.page, query.limit, Utc::now())
        .await
    {
        Ok(page) => HttpResponse::Ok().json(ApiResponse::success(page)),
        Err(e) => {
            error!("List investments failed: {}", e);
            settlement_error_response(&e)
        }
    }
}

/// Override one investment's effective daily return percentage.
///
/// ## Endpoint
///
/// `PUT /api/admin/subscription-investments/{id}/daily-return`
///
/// ## Example
///
/// ```bash
/// curl -X PUT .../subscription-investments/ID/daily-return \
///   -H "Content-Type: application/json" \
///   -d '{"dailyReturnPercentage": 1.75}'
/// ```
pub async fn update_daily_return(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateDailyReturnRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    info!(
        "Daily return override for {}: {}",
        id, body.daily_return_percentage
    );

    match state
        .settlement
        .set_daily_return(id, body.daily_return_percentage)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(json!({ "id": id }))),
        Err(e) => {
            error!("Daily return override failed for {}: {}", id, e);
            settlement_error_response(&e)
        }
    }
}

/// Force an investment status change.
///
/// ## Endpoint
///
/// `PUT /api/admin/subscription-investments/{id}/status`
///
/// ## Example
///
/// ```bash
/// curl -X PUT .../subscription-investments/ID/status \
///   -H "Content-Type: application/json" \
///   -d '{"status": "paused", "adminNotes": "pending compliance review"}'
/// ```
pub async fn update_status(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    info!("Status change for {}: -> {}", id, body.status);

    match state.settlement.set_status(id, &body, Utc::now()).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(json!({
            "id": id,
            "status": body.status,
        }))),
        Err(e) => {
            error!("Status change failed for {}: {}", id, e);
            settlement_error_response(&e)
        }
    }
}

/// Set or clear a manual earnings adjustment.
///
/// ## Endpoint
///
/// `PUT /api/admin/investments/{id}/manual-adjust`
///
/// ## Example
///
/// ```bash
/// curl -X PUT .../investments/ID/manual-adjust \
///   -H "Content-Type: application/json" \
///   -d '{"amount": 50, "reason": "ticket #4821", "isActive": true}'
/// ```
///
/// Sending `{"amount": 0, "isActive": false}` deactivates the override;
/// calculated earnings resume on the next read.
pub async fn manual_adjust(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
    body: web::Json<ManualAdjustRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    info!(
        "Manual adjustment for {}: amount {} active {}",
        id, body.amount, body.is_active
    );

    match state
        .settlement
        .set_manual_adjustment(id, &body, Utc::now())
        .await
    {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(json!({ "id": id }))),
        Err(e) => {
            error!("Manual adjustment failed for {}: {}", id, e);
            settlement_error_response(&e)
        }
    }
}

// ==========================================
// ADMIN: COMMISSIONS
// ==========================================

/// List referral commissions.
///
/// ## Endpoint
///
/// `GET /api/admin/commissions?status=pending&page=1&limit=20`
pub async fn list_commissions(
    state: web::Data<Arc<AppState>>,
    query: web::Query<CommissionQuery>,
) -> HttpResponse {
    match state
        .commissions
        .list(query.status.as_deref(), query.page, query.limit)
        .await
    {
        Ok(page) => HttpResponse::Ok().json(ApiResponse::success(page)),
        Err(e) => {
            error!("List commissions failed: {}", e);
            commission_error_response(&e)
        }
    }
}

/// Export commissions as a CSV attachment.
///
/// ## Endpoint
///
/// `GET /api/admin/commissions/export.csv?status=paid`
pub async fn export_commissions(
    state: web::Data<Arc<AppState>>,
    query: web::Query<ExportQuery>,
) -> HttpResponse {
    match state.commissions.export_csv(query.status.as_deref()).await {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                "Content-Disposition",
                "attachment; filename=\"commissions.csv\"",
            ))
            .body(csv),
        Err(e) => {
            error!("Commission export failed: {}", e);
            commission_error_response(&e)
        }
    }
}

/// Mark a pending commission as paid.
///
/// ## Endpoint
///
/// `PUT /api/admin/commissions/{id}/pay`
pub async fn pay_commission(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let id = path.into_inner();
    info!("Commission payout request: {}", id);

    match state.commissions.mark_paid(id, Utc::now()).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(json!({
            "id": id,
            "status": "paid",
        }))),
        Err(e) => {
            error!("Commission payout failed for {}: {}", id, e);
            commission_error_response(&e)
        }
    }
}

// ==========================================
// ADMIN: SETTLEMENT
// ==========================================

/// Run a settlement pass immediately.
///
/// ## Endpoint
///
/// `POST /api/admin/settlement/run`
///
/// The pass is idempotent; running it while the scheduled pass ticks
/// is safe because finalization is a guarded single-row write.
pub async fn run_settlement(state: web::Data<Arc<AppState>>) -> HttpResponse {
    info!("On-demand settlement pass requested");

    let summary = state.settlement.run_pass(Utc::now()).await;
    HttpResponse::Ok().json(ApiResponse::success(summary))
}

// ==========================================
// ERROR MAPPING
// ==========================================

/// Map a settlement service error to an HTTP response.
fn settlement_error_response(e: &SettlementError) -> HttpResponse {
    let (code, builder) = match e {
        SettlementError::InvestmentNotFound(_) => {
            ("INVESTMENT_NOT_FOUND", HttpResponse::NotFound())
        }
        SettlementError::PlanNotFound(_) => ("PLAN_NOT_FOUND", HttpResponse::NotFound()),
        SettlementError::AmountOutOfBounds { .. } => {
            ("AMOUNT_OUT_OF_BOUNDS", HttpResponse::BadRequest())
        }
        SettlementError::RateOutOfRange { .. } => {
            ("RATE_OUT_OF_RANGE", HttpResponse::BadRequest())
        }
        SettlementError::MissingReason => ("REASON_REQUIRED", HttpResponse::BadRequest()),
        SettlementError::UnknownStatus(_) => ("UNKNOWN_STATUS", HttpResponse::BadRequest()),
        SettlementError::TransitionConflict(_) => {
            ("TRANSITION_CONFLICT", HttpResponse::Conflict())
        }
        SettlementError::Engine(EngineError::InvalidTransition { .. }) => {
            ("INVALID_STATUS_TRANSITION", HttpResponse::BadRequest())
        }
        SettlementError::Engine(_) => ("CORRUPT_RECORD", HttpResponse::InternalServerError()),
        SettlementError::Database(_) => ("DATABASE_ERROR", HttpResponse::InternalServerError()),
    };

    let mut builder = builder;
    builder.json(ApiResponse::<()>::error(code, &e.to_string()))
}

/// Map a commission service error to an HTTP response.
fn commission_error_response(e: &CommissionError) -> HttpResponse {
    let (code, builder) = match e {
        CommissionError::NotFound(_) => ("COMMISSION_NOT_FOUND", HttpResponse::NotFound()),
        CommissionError::AlreadyPaid(_) => ("ALREADY_PAID", HttpResponse::Conflict()),
        CommissionError::UnknownStatus(_) => ("UNKNOWN_STATUS", HttpResponse::BadRequest()),
        CommissionError::Database(_) => ("DATABASE_ERROR", HttpResponse::InternalServerError()),
        CommissionError::Export(_) => ("EXPORT_FAILED", HttpResponse::InternalServerError()),
    };

    let mut builder = builder;
    builder.json(ApiResponse::<()>::error(code, &e.to_string()))
}
