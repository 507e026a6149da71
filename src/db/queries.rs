//! # Database Queries
//!
//! This module contains all the SQL queries for interacting with the database.
//! Each function performs a specific database operation.
//!
//! ## Query Organization
//!
//! Queries are grouped by the table they operate on:
//! - `plan_*` / `get_plan` - Plan template reads
//! - `*_investment*` - Investment table operations
//! - `*_commission*` - Commission table operations
//!
//! ## Write Discipline
//!
//! Investment writes are narrow, single-intent UPDATE statements
//! (daily-return, manual-adjust, pause, resume, finalize) rather than
//! generic record replacement. Each statement carries the reason/notes for
//! the change and touches only the columns that intent owns, so concurrent
//! admin writes cannot interleave partial field sets.
//!
//! ## Error Handling
//!
//! All queries return `Result<T, DatabaseError>`. Common errors:
//! - `NotFound` - Record doesn't exist
//! - `QueryError` - SQL execution failed
//! - `CorruptRecord` - Stored row fails to parse (bad status string)

use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use rust_decimal::Decimal;
use tokio_postgres::Row;
use uuid::Uuid;
use tracing::{debug, info};

use super::models::*;
use super::DatabaseError;

/// Shared SELECT column list for investments.
const INVESTMENT_COLUMNS: &str = r#"
    id, user_id, crypto, plan_id, amount,
    plan_daily_return_percentage, daily_return_percentage,
    total_return_percentage, duration_days,
    start_date, end_date, status,
    adjustment_amount, adjustment_reason, adjustment_applied_at, adjustment_active,
    final_earnings, paused_at, finalized_at, admin_notes,
    created_at, updated_at
"#;

/// Shared SELECT column list for commissions.
const COMMISSION_COLUMNS: &str = r#"
    id, referrer_id, referee_id, investment_id,
    investment_amount, rate, amount, status,
    created_at, paid_at
"#;

// ============================================
// HELPER FUNCTIONS
// ============================================

/// Helper to convert a database row to PlanRecord
fn row_to_plan(row: &Row) -> PlanRecord {
    PlanRecord {
        id: row.get("id"),
        name: row.get("name"),
        min_amount: row.get("min_amount"),
        max_amount: row.get("max_amount"),
        daily_return_percentage: row.get("daily_return_percentage"),
        duration_days: row.get("duration_days"),
        total_return_percentage: row.get("total_return_percentage"),
        created_at: row.get("created_at"),
    }
}

/// Helper to convert a database row to InvestmentRecord
fn row_to_investment(row: &Row) -> Result<InvestmentRecord, DatabaseError> {
    let status_str: String = row.get("status");
    let status = InvestmentStatus::parse(&status_str).ok_or_else(|| {
        DatabaseError::CorruptRecord(format!("unknown investment status '{}'", status_str))
    })?;

    Ok(InvestmentRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        crypto: row.get("crypto"),
        plan_id: row.get("plan_id"),
        amount: row.get("amount"),
        plan_daily_return_percentage: row.get("plan_daily_return_percentage"),
        daily_return_percentage: row.get("daily_return_percentage"),
        total_return_percentage: row.get("total_return_percentage"),
        duration_days: row.get("duration_days"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        status,
        adjustment_amount: row.get("adjustment_amount"),
        adjustment_reason: row.get("adjustment_reason"),
        adjustment_applied_at: row.get("adjustment_applied_at"),
        adjustment_active: row.get("adjustment_active"),
        final_earnings: row.get("final_earnings"),
        paused_at: row.get("paused_at"),
        finalized_at: row.get("finalized_at"),
        admin_notes: row.get("admin_notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Helper to convert a database row to CommissionRecord
fn row_to_commission(row: &Row) -> Result<CommissionRecord, DatabaseError> {
    let status_str: String = row.get("status");
    let status = CommissionStatus::parse(&status_str).ok_or_else(|| {
        DatabaseError::CorruptRecord(format!("unknown commission status '{}'", status_str))
    })?;

    Ok(CommissionRecord {
        id: row.get("id"),
        referrer_id: row.get("referrer_id"),
        referee_id: row.get("referee_id"),
        investment_id: row.get("investment_id"),
        investment_amount: row.get("investment_amount"),
        rate: row.get("rate"),
        amount: row.get("amount"),
        status,
        created_at: row.get("created_at"),
        paid_at: row.get("paid_at"),
    })
}

// ============================================
// PLAN QUERIES
// ============================================

/// Get a plan template by ID.
pub async fn get_plan(pool: &Pool, id: Uuid) -> Result<Option<PlanRecord>, DatabaseError> {
    debug!("Fetching plan: {}", id);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        r#"
        SELECT id, name, min_amount, max_amount,
               daily_return_percentage, duration_days, total_return_percentage,
               created_at
        FROM investment_plans
        WHERE id = $1
        "#,
        &[&id],
    ).await?;

    Ok(rows.first().map(row_to_plan))
}

/// Get the full plan catalog.
pub async fn list_plans(pool: &Pool) -> Result<Vec<PlanRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        r#"
        SELECT id, name, min_amount, max_amount,
               daily_return_percentage, duration_days, total_return_percentage,
               created_at
        FROM investment_plans
        ORDER BY min_amount ASC
        "#,
        &[],
    ).await?;

    Ok(rows.iter().map(row_to_plan).collect())
}

// ============================================
// INVESTMENT QUERIES
// ============================================

/// Insert a new investment record.
pub async fn create_investment(
    pool: &Pool,
    inv: &InvestmentRecord,
) -> Result<Uuid, DatabaseError> {
    debug!("Creating investment {} for user {}", inv.id, inv.user_id);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    client.execute(
        r#"
        INSERT INTO investments (
            id, user_id, crypto, plan_id, amount,
            plan_daily_return_percentage, daily_return_percentage,
            total_return_percentage, duration_days,
            start_date, end_date, status,
            adjustment_active, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, FALSE, $13, $13)
        "#,
        &[
            &inv.id,
            &inv.user_id,
            &inv.crypto,
            &inv.plan_id,
            &inv.amount,
            &inv.plan_daily_return_percentage,
            &inv.daily_return_percentage,
            &inv.total_return_percentage,
            &inv.duration_days,
            &inv.start_date,
            &inv.end_date,
            &inv.status.as_str().to_string(),
            &inv.created_at,
        ],
    ).await?;

    info!("Investment created: {}", inv.id);
    Ok(inv.id)
}

/// Get an investment by ID.
pub async fn get_investment(
    pool: &Pool,
    id: Uuid,
) -> Result<Option<InvestmentRecord>, DatabaseError> {
    debug!("Fetching investment: {}", id);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        &format!("SELECT {} FROM investments WHERE id = $1", INVESTMENT_COLUMNS),
        &[&id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_investment(row)?)),
        None => Ok(None),
    }
}

/// List investments, optionally filtered by status, newest first.
pub async fn list_investments(
    pool: &Pool,
    status: Option<InvestmentStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<InvestmentRecord>, DatabaseError> {
    debug!("Listing investments (status: {:?}, limit: {}, offset: {})", status, limit, offset);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = match status {
        Some(s) => {
            client.query(
                &format!(
                    "SELECT {} FROM investments WHERE status = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                    INVESTMENT_COLUMNS
                ),
                &[&s.as_str().to_string(), &limit, &offset],
            ).await?
        }
        None => {
            client.query(
                &format!(
                    "SELECT {} FROM investments \
                     ORDER BY created_at DESC LIMIT $1 OFFSET $2",
                    INVESTMENT_COLUMNS
                ),
                &[&limit, &offset],
            ).await?
        }
    };

    rows.iter().map(row_to_investment).collect()
}

/// Count investments, optionally filtered by status.
pub async fn count_investments(
    pool: &Pool,
    status: Option<InvestmentStatus>,
) -> Result<i64, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let row = match status {
        Some(s) => {
            client.query_one(
                "SELECT COUNT(*) AS count FROM investments WHERE status = $1",
                &[&s.as_str().to_string()],
            ).await?
        }
        None => {
            client.query_one("SELECT COUNT(*) AS count FROM investments", &[]).await?
        }
    };

    Ok(row.get("count"))
}

/// Get all investments for a user, newest first.
pub async fn list_user_investments(
    pool: &Pool,
    user_id: Uuid,
) -> Result<Vec<InvestmentRecord>, DatabaseError> {
    debug!("Fetching investments for user: {}", user_id);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        &format!(
            "SELECT {} FROM investments WHERE user_id = $1 ORDER BY created_at DESC",
            INVESTMENT_COLUMNS
        ),
        &[&user_id],
    ).await?;

    rows.iter().map(row_to_investment).collect()
}

/// Get active investments whose end date has passed, i.e. the settlement
/// pass candidates. Paged so a pass over a large table stays bounded.
pub async fn list_matured_investments(
    pool: &Pool,
    as_of: DateTime<Utc>,
    limit: i64,
    offset: i64,
) -> Result<Vec<InvestmentRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        &format!(
            "SELECT {} FROM investments \
             WHERE status = 'active' AND end_date <= $1 \
             ORDER BY end_date ASC LIMIT $2 OFFSET $3",
            INVESTMENT_COLUMNS
        ),
        &[&as_of, &limit, &offset],
    ).await?;

    rows.iter().map(row_to_investment).collect()
}

/// Override the effective daily return percentage for one investment.
///
/// The plan snapshot (`plan_daily_return_percentage`) is never touched.
pub async fn update_daily_return(
    pool: &Pool,
    id: Uuid,
    daily_return_percentage: Decimal,
) -> Result<(), DatabaseError> {
    debug!("Updating daily return for investment {} to {}", id, daily_return_percentage);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows_affected = client.execute(
        r#"
        UPDATE investments
        SET daily_return_percentage = $2,
            updated_at = NOW()
        WHERE id = $1
        "#,
        &[&id, &daily_return_percentage],
    ).await?;

    if rows_affected == 0 {
        return Err(DatabaseError::NotFound(format!("Investment not found: {}", id)));
    }

    info!("Daily return updated for investment {}: {}%", id, daily_return_percentage);
    Ok(())
}

/// Set or clear the manual adjustment on one investment.
///
/// All four adjustment columns move in a single statement, so a concurrent
/// reader can never observe a half-written override. Deactivating only
/// drops the flag: amount, reason and applied_at keep their last-active
/// values as a historical record, whatever the request body carried.
///
/// No transaction/ledger record is created by this write. That is
/// deliberate: organic accrual is never materialized as transactions
/// either, and the override must stay symmetric with it.
pub async fn update_manual_adjustment(
    pool: &Pool,
    id: Uuid,
    amount: Decimal,
    reason: Option<&str>,
    is_active: bool,
    applied_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    debug!("Updating manual adjustment for investment {} (active: {})", id, is_active);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows_affected = client.execute(
        r#"
        UPDATE investments
        SET adjustment_amount = CASE WHEN $4 THEN $2 ELSE adjustment_amount END,
            adjustment_reason = CASE WHEN $4 THEN COALESCE($3, adjustment_reason) ELSE adjustment_reason END,
            adjustment_applied_at = CASE WHEN $4 THEN $5 ELSE adjustment_applied_at END,
            adjustment_active = $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
        &[&id, &amount, &reason, &is_active, &applied_at],
    ).await?;

    if rows_affected == 0 {
        return Err(DatabaseError::NotFound(format!("Investment not found: {}", id)));
    }

    info!(
        "Manual adjustment {} for investment {}: amount {}",
        if is_active { "activated" } else { "deactivated" },
        id,
        amount
    );
    Ok(())
}

/// Pause an active investment, stamping when the clock stopped.
///
/// Returns the number of rows updated: 0 means the investment was not in
/// `active` state (or does not exist) at the time of the write.
pub async fn pause_investment(
    pool: &Pool,
    id: Uuid,
    paused_at: DateTime<Utc>,
    admin_notes: Option<&str>,
) -> Result<u64, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows_affected = client.execute(
        r#"
        UPDATE investments
        SET status = 'paused',
            paused_at = $2,
            admin_notes = COALESCE($3, admin_notes),
            updated_at = NOW()
        WHERE id = $1 AND status = 'active'
        "#,
        &[&id, &paused_at, &admin_notes],
    ).await?;

    Ok(rows_affected)
}

/// Reactivate a paused investment.
///
/// The duration clock was stopped at `paused_at`, so the end date is pushed
/// out by the paused interval. Everything happens in one statement against
/// the row's own `paused_at`, so resume cannot race another writer into an
/// inconsistent schedule.
pub async fn resume_investment(
    pool: &Pool,
    id: Uuid,
    resumed_at: DateTime<Utc>,
    admin_notes: Option<&str>,
) -> Result<u64, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows_affected = client.execute(
        r#"
        UPDATE investments
        SET status = 'active',
            end_date = end_date + ($2 - paused_at),
            paused_at = NULL,
            admin_notes = COALESCE($3, admin_notes),
            updated_at = NOW()
        WHERE id = $1 AND status = 'paused'
        "#,
        &[&id, &resumed_at, &admin_notes],
    ).await?;

    Ok(rows_affected)
}

/// Move an investment into a terminal state (`completed` or `cancelled`),
/// freezing its earnings.
///
/// The frozen value is computed inside the statement from the row's own
/// columns, applying the manual-override rule at the moment of freezing:
/// an active adjustment wins verbatim, otherwise earnings are calculated
/// from principal at the effective rate for the clamped elapsed days. This
/// is what guards the race between an admin setting a manual adjustment and
/// the settlement pass maturing the same record - whichever write lands
/// first, the freeze never bypasses the resolver.
///
/// For a paused record being cancelled, elapsed days are measured up to
/// `paused_at` (the clock was stopped there). The same moment is stamped
/// into `finalized_at`, so later reads stop the displayed day clock where
/// the earnings were frozen.
///
/// Returns the number of rows updated: 0 means the record was already
/// terminal (or missing) and nothing changed.
pub async fn finalize_investment(
    pool: &Pool,
    id: Uuid,
    new_status: InvestmentStatus,
    as_of: DateTime<Utc>,
    admin_notes: Option<&str>,
) -> Result<u64, DatabaseError> {
    debug!("Finalizing investment {} as {}", id, new_status.as_str());

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows_affected = client.execute(
        r#"
        UPDATE investments
        SET status = $2,
            final_earnings = CASE
                WHEN adjustment_active THEN adjustment_amount
                ELSE amount * daily_return_percentage / 100 *
                     LEAST(
                         GREATEST(
                             FLOOR(EXTRACT(EPOCH FROM (LEAST($3, COALESCE(paused_at, $3)) - start_date)) / 86400)::numeric,
                             0
                         ),
                         duration_days::numeric
                     )
            END,
            finalized_at = LEAST($3, COALESCE(paused_at, $3)),
            paused_at = NULL,
            admin_notes = COALESCE($4, admin_notes),
            updated_at = NOW()
        WHERE id = $1 AND status IN ('active', 'paused')
        "#,
        &[&id, &new_status.as_str().to_string(), &as_of, &admin_notes],
    ).await?;

    if rows_affected > 0 {
        info!("Investment {} finalized as {}", id, new_status.as_str());
    }

    Ok(rows_affected)
}

// ============================================
// COMMISSION QUERIES
// ============================================

/// Insert a commission record.
///
/// The UNIQUE constraint on `investment_id` plus `ON CONFLICT DO NOTHING`
/// makes duplicate derivation for the same investment a no-op.
///
/// Returns `true` if the row was inserted, `false` if the investment was
/// already commissioned.
pub async fn insert_commission(
    pool: &Pool,
    commission: &CommissionRecord,
) -> Result<bool, DatabaseError> {
    debug!(
        "Inserting commission {} for investment {}",
        commission.id, commission.investment_id
    );

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows_affected = client.execute(
        r#"
        INSERT INTO commissions (
            id, referrer_id, referee_id, investment_id,
            investment_amount, rate, amount, status,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (investment_id) DO NOTHING
        "#,
        &[
            &commission.id,
            &commission.referrer_id,
            &commission.referee_id,
            &commission.investment_id,
            &commission.investment_amount,
            &commission.rate,
            &commission.amount,
            &commission.status.as_str().to_string(),
            &commission.created_at,
        ],
    ).await?;

    if rows_affected == 1 {
        info!("Commission created: {}", commission.id);
        Ok(true)
    } else {
        debug!(
            "Investment {} already commissioned, skipping",
            commission.investment_id
        );
        Ok(false)
    }
}

/// Get a commission by ID.
pub async fn get_commission(
    pool: &Pool,
    id: Uuid,
) -> Result<Option<CommissionRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        &format!("SELECT {} FROM commissions WHERE id = $1", COMMISSION_COLUMNS),
        &[&id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_commission(row)?)),
        None => Ok(None),
    }
}

/// Mark a pending commission as paid.
///
/// The `status = 'pending'` guard makes the transition one-way: repeating
/// the call (or racing it) affects zero rows.
pub async fn mark_commission_paid(
    pool: &Pool,
    id: Uuid,
    paid_at: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    debug!("Marking commission {} as paid", id);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows_affected = client.execute(
        r#"
        UPDATE commissions
        SET status = 'paid',
            paid_at = $2
        WHERE id = $1 AND status = 'pending'
        "#,
        &[&id, &paid_at],
    ).await?;

    Ok(rows_affected)
}

/// List commissions, optionally filtered by status, newest first.
pub async fn list_commissions(
    pool: &Pool,
    status: Option<CommissionStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<CommissionRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = match status {
        Some(s) => {
            client.query(
                &format!(
                    "SELECT {} FROM commissions WHERE status = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                    COMMISSION_COLUMNS
                ),
                &[&s.as_str().to_string(), &limit, &offset],
            ).await?
        }
        None => {
            client.query(
                &format!(
                    "SELECT {} FROM commissions \
                     ORDER BY created_at DESC LIMIT $1 OFFSET $2",
                    COMMISSION_COLUMNS
                ),
                &[&limit, &offset],
            ).await?
        }
    };

    rows.iter().map(row_to_commission).collect()
}

/// Count commissions, optionally filtered by status.
pub async fn count_commissions(
    pool: &Pool,
    status: Option<CommissionStatus>,
) -> Result<i64, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let row = match status {
        Some(s) => {
            client.query_one(
                "SELECT COUNT(*) AS count FROM commissions WHERE status = $1",
                &[&s.as_str().to_string()],
            ).await?
        }
        None => {
            client.query_one("SELECT COUNT(*) AS count FROM commissions", &[]).await?
        }
    };

    Ok(row.get("count"))
}

/// Get all commissions for CSV export, oldest first (ledger order).
pub async fn list_commissions_for_export(
    pool: &Pool,
    status: Option<CommissionStatus>,
) -> Result<Vec<CommissionRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = match status {
        Some(s) => {
            client.query(
                &format!(
                    "SELECT {} FROM commissions WHERE status = $1 ORDER BY created_at ASC",
                    COMMISSION_COLUMNS
                ),
                &[&s.as_str().to_string()],
            ).await?
        }
        None => {
            client.query(
                &format!(
                    "SELECT {} FROM commissions ORDER BY created_at ASC",
                    COMMISSION_COLUMNS
                ),
                &[],
            ).await?
        }
    };

    rows.iter().map(row_to_commission).collect()
}
