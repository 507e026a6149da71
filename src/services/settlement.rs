//! # Settlement Engine Service
//!
//! The SettlementEngine is the central service for investment operations.
//! It owns every read and write against the investments table and runs the
//! periodic settlement pass.
//!
//! ## Responsibilities
//!
//! - Create investments from plan templates (snapshot copy, bounds check)
//! - Serve listings and the client portfolio with derived fields
//! - Apply admin overrides: daily-return, manual adjustment, status
//! - Mature due investments in the background pass
//!
//! ## Settlement Pass Flow
//!
//! ```text
//! 1. Tick (every SETTLEMENT_INTERVAL seconds, or on-demand via API)
//!                ↓
//! 2. Page through active investments with end_date <= now
//!                ↓
//! 3. For each: finalize as 'completed' (single conditional UPDATE,
//!    earnings frozen respecting any active manual adjustment)
//!                ↓
//! 4. Per-record failures are logged and skipped; the pass continues
//!                ↓
//! 5. Summary logged. Re-running is always safe: earnings are
//!    recomputed from principal, never accumulated.
//! ```

use std::time::Duration as StdDuration;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{queries, Database, DatabaseError, InvestmentRecord, InvestmentStatus};
use crate::engine::{self, lifecycle, EngineError};
use crate::models::{
    CreateInvestmentRequest, InvestmentListResponse, InvestmentResponse, ManualAdjustRequest,
    PortfolioResponse, PortfolioSummary, SettlementPassResponse, UpdateStatusRequest,
};

/// How many matured records one settlement batch pulls at a time.
const PASS_BATCH_SIZE: i64 = 500;

/// How many times a finalize write is retried before the record is skipped.
const FINALIZE_ATTEMPTS: u32 = 3;

/// Errors that can occur in settlement operations.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// Investment not found.
    #[error("Investment not found: {0}")]
    InvestmentNotFound(Uuid),

    /// Plan not found.
    #[error("Investment plan not found: {0}")]
    PlanNotFound(Uuid),

    /// Principal outside the plan's bounds.
    #[error("Amount {amount} outside plan bounds [{min}, {max}]")]
    AmountOutOfBounds {
        amount: Decimal,
        min: Decimal,
        max: Decimal,
    },

    /// Daily return override outside the configured cap.
    #[error("Daily return percentage {rate} outside allowed range [0, {cap}]")]
    RateOutOfRange { rate: Decimal, cap: Decimal },

    /// Activating a manual adjustment without saying why.
    #[error("A reason is required when activating a manual adjustment")]
    MissingReason,

    /// Unrecognized status string in a request.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    /// The record changed state concurrently; the transition was not applied.
    #[error("Investment {0} changed state concurrently; transition not applied")]
    TransitionConflict(Uuid),

    /// Pure-engine failure (invalid transition, corrupt record).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<DatabaseError> for SettlementError {
    fn from(e: DatabaseError) -> Self {
        SettlementError::Database(e.to_string())
    }
}

/// The main service for investment settlement.
///
/// ## Usage
///
/// ```rust,ignore
/// let engine = SettlementEngine::new(db, config);
///
/// // Admin override
/// engine.set_daily_return(id, dec!(1.75)).await?;
///
/// // Background scheduler (runs forever)
/// tokio::spawn(async move { engine.start().await });
/// ```
#[derive(Clone)]
pub struct SettlementEngine {
    /// Database connection.
    db: Database,

    /// Application configuration.
    config: AppConfig,
}

impl SettlementEngine {
    /// Create a new SettlementEngine instance.
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self { db, config }
    }

    // ==========================================
    // CREATION
    // ==========================================

    /// Create a new investment from a plan template.
    ///
    /// Plan terms are snapshotted into the record so later plan edits
    /// never retroactively change it. The principal must lie within the
    /// plan's `[min_amount, max_amount]`.
    ///
    /// Commission derivation for referred investments happens in
    /// `CommissionService::derive_for_investment`, driven by the handler.
    pub async fn create_investment(
        &self,
        request: &CreateInvestmentRequest,
        now: DateTime<Utc>,
    ) -> Result<InvestmentRecord, SettlementError> {
        let plan = queries::get_plan(self.db.pool(), request.plan_id)
            .await?
            .ok_or(SettlementError::PlanNotFound(request.plan_id))?;

        if request.amount < plan.min_amount || request.amount > plan.max_amount {
            return Err(SettlementError::AmountOutOfBounds {
                amount: request.amount,
                min: plan.min_amount,
                max: plan.max_amount,
            });
        }

        let record = InvestmentRecord {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            crypto: request.crypto.clone(),
            plan_id: plan.id,
            amount: request.amount,
            plan_daily_return_percentage: plan.daily_return_percentage,
            daily_return_percentage: plan.daily_return_percentage,
            total_return_percentage: plan.total_return_percentage,
            duration_days: plan.duration_days,
            start_date: now,
            end_date: now + Duration::days(i64::from(plan.duration_days)),
            status: InvestmentStatus::Active,
            adjustment_amount: None,
            adjustment_reason: None,
            adjustment_applied_at: None,
            adjustment_active: false,
            final_earnings: None,
            paused_at: None,
            finalized_at: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };

        queries::create_investment(self.db.pool(), &record).await?;

        info!(
            "Investment {} created: {} {} on plan '{}' for user {}",
            record.id, record.amount, record.crypto, plan.name, record.user_id
        );

        Ok(record)
    }

    // ==========================================
    // READS
    // ==========================================

    /// List investments with derived fields, filtered and paginated.
    ///
    /// Records that fail evaluation (non-positive amount, corrupt data)
    /// are logged and skipped so one bad row never hides the rest.
    pub async fn list_investments(
        &self,
        status: Option<&str>,
        page: i64,
        limit: i64,
        as_of: DateTime<Utc>,
    ) -> Result<InvestmentListResponse, SettlementError> {
        let status = parse_status_filter(status)?;
        let (page, limit) = self.clamp_page(page, limit);
        let offset = (page - 1) * limit;

        let records = queries::list_investments(self.db.pool(), status, limit, offset).await?;
        let total = queries::count_investments(self.db.pool(), status).await?;

        Ok(InvestmentListResponse {
            investments: self.evaluate_all(&records, as_of),
            total,
            page,
            limit,
        })
    }

    /// Aggregate one user's investments into the portfolio view.
    ///
    /// The summary is computed at full precision across all evaluable
    /// investments and rounded only in the response.
    pub async fn portfolio(
        &self,
        user_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> Result<PortfolioResponse, SettlementError> {
        let records = queries::list_user_investments(self.db.pool(), user_id).await?;

        let mut total_invested = Decimal::ZERO;
        let mut total_current_value = Decimal::ZERO;
        let mut total_profit_loss = Decimal::ZERO;
        let mut investments = Vec::with_capacity(records.len());

        for record in &records {
            match engine::evaluate(record, as_of) {
                Ok(derived) => {
                    total_invested += record.amount;
                    total_current_value += derived.current_value;
                    total_profit_loss += derived.profit_loss;
                    investments.push(InvestmentResponse::from_record(record, &derived));
                }
                Err(e) => {
                    warn!("Skipping investment {} in portfolio: {}", record.id, e);
                }
            }
        }

        let total_profit_loss_percentage = if total_invested > Decimal::ZERO {
            total_profit_loss / total_invested * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        Ok(PortfolioResponse {
            investments,
            summary: PortfolioSummary {
                total_invested: crate::utils::round_money(total_invested),
                total_current_value: crate::utils::round_money(total_current_value),
                total_profit_loss: crate::utils::round_money(total_profit_loss),
                total_profit_loss_percentage: crate::utils::round_money(
                    total_profit_loss_percentage,
                ),
            },
        })
    }

    // ==========================================
    // ADMIN WRITES
    // ==========================================

    /// Override the effective daily return percentage for one investment.
    ///
    /// The plan snapshot stays untouched; only the effective rate feeding
    /// the accrual calculator changes, and only for this record.
    pub async fn set_daily_return(
        &self,
        id: Uuid,
        rate: Decimal,
    ) -> Result<(), SettlementError> {
        let cap = self.config.max_daily_return_percentage;
        if rate < Decimal::ZERO || rate > cap {
            return Err(SettlementError::RateOutOfRange { rate, cap });
        }

        queries::update_daily_return(self.db.pool(), id, rate)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => SettlementError::InvestmentNotFound(id),
                other => other.into(),
            })
    }

    /// Set or clear the manual earnings adjustment on one investment.
    ///
    /// While active, the amount fully replaces calculated earnings. No
    /// transaction record is created - this is a non-ledger correction.
    pub async fn set_manual_adjustment(
        &self,
        id: Uuid,
        request: &ManualAdjustRequest,
        now: DateTime<Utc>,
    ) -> Result<(), SettlementError> {
        let reason = request.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
        if request.is_active && reason.is_none() {
            return Err(SettlementError::MissingReason);
        }

        queries::update_manual_adjustment(
            self.db.pool(),
            id,
            request.amount,
            reason,
            request.is_active,
            now,
        )
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound(_) => SettlementError::InvestmentNotFound(id),
            other => other.into(),
        })
    }

    /// Force an investment status change.
    ///
    /// Validates the edge against the lifecycle state machine, then
    /// dispatches to the matching narrow write:
    ///
    /// | Target | Write |
    /// |--------|-------|
    /// | paused | stamp `paused_at`, stop the clock |
    /// | active | extend `end_date` by the paused interval, clear `paused_at` |
    /// | completed / cancelled | freeze earnings via the finalize statement |
    ///
    /// Every write is guarded by the expected current status, so a record
    /// that changed underfoot affects zero rows and surfaces as a
    /// `TransitionConflict` instead of clobbering the concurrent change.
    pub async fn set_status(
        &self,
        id: Uuid,
        request: &UpdateStatusRequest,
        now: DateTime<Utc>,
    ) -> Result<(), SettlementError> {
        let target = InvestmentStatus::parse(&request.status)
            .ok_or_else(|| SettlementError::UnknownStatus(request.status.clone()))?;

        let record = queries::get_investment(self.db.pool(), id)
            .await?
            .ok_or(SettlementError::InvestmentNotFound(id))?;

        lifecycle::validate_transition(record.status, target)?;

        let notes = request.admin_notes.as_deref();
        let rows = match target {
            InvestmentStatus::Paused => {
                queries::pause_investment(self.db.pool(), id, now, notes).await?
            }
            InvestmentStatus::Active => {
                queries::resume_investment(self.db.pool(), id, now, notes).await?
            }
            InvestmentStatus::Completed | InvestmentStatus::Cancelled => {
                queries::finalize_investment(self.db.pool(), id, target, now, notes).await?
            }
        };

        if rows == 0 {
            return Err(SettlementError::TransitionConflict(id));
        }

        info!(
            "Investment {} forced {} -> {}",
            id,
            record.status.as_str(),
            target.as_str()
        );
        Ok(())
    }

    // ==========================================
    // SETTLEMENT PASS
    // ==========================================

    /// Run one settlement pass: mature every active investment whose end
    /// date has passed.
    ///
    /// The pass is restartable by construction - finalization is a
    /// conditional single-row UPDATE and earnings are recomputed from
    /// principal, so interrupting and re-running changes nothing that
    /// already settled. Per-record failures are retried with backoff,
    /// then logged and skipped.
    pub async fn run_pass(&self, as_of: DateTime<Utc>) -> SettlementPassResponse {
        debug!("Settlement pass starting at {}", as_of);

        let mut scanned: u64 = 0;
        let mut matured: u64 = 0;
        let mut failed: u64 = 0;

        loop {
            // Finalized rows leave the matured-set, so the next batch is
            // always read from the front; failed rows stay behind and are
            // skipped over via the offset.
            let batch = match queries::list_matured_investments(
                self.db.pool(),
                as_of,
                PASS_BATCH_SIZE,
                failed as i64,
            )
            .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    error!("Settlement pass aborted while listing candidates: {}", e);
                    break;
                }
            };

            if batch.is_empty() {
                break;
            }

            for record in &batch {
                scanned += 1;
                match self.finalize_with_retry(record, as_of).await {
                    Ok(rows) => {
                        if rows > 0 {
                            matured += 1;
                        } else {
                            // Raced an admin write; no longer active.
                            debug!("Investment {} left active state mid-pass", record.id);
                        }
                    }
                    Err(e) => {
                        error!("Skipping investment {} in settlement pass: {}", record.id, e);
                        failed += 1;
                    }
                }
            }
        }

        if matured > 0 || failed > 0 {
            info!(
                "Settlement pass done: {} scanned, {} matured, {} failed",
                scanned, matured, failed
            );
        } else {
            debug!("Settlement pass done: nothing due");
        }

        SettlementPassResponse {
            scanned,
            matured,
            failed,
            ran_at: as_of,
        }
    }

    /// Finalize one matured record, retrying transient write failures.
    async fn finalize_with_retry(
        &self,
        record: &InvestmentRecord,
        as_of: DateTime<Utc>,
    ) -> Result<u64, SettlementError> {
        // Surface corrupt rows before writing anything.
        if record.amount <= Decimal::ZERO {
            return Err(EngineError::NonPositiveAmount {
                id: record.id,
                amount: record.amount,
            }
            .into());
        }
        if !lifecycle::is_matured(record, as_of) {
            return Ok(0);
        }

        let mut last_err = None;
        for attempt in 1..=FINALIZE_ATTEMPTS {
            match queries::finalize_investment(
                self.db.pool(),
                record.id,
                InvestmentStatus::Completed,
                as_of,
                None,
            )
            .await
            {
                Ok(rows) => return Ok(rows),
                Err(e) => {
                    warn!(
                        "Finalize attempt {}/{} failed for investment {}: {}",
                        attempt, FINALIZE_ATTEMPTS, record.id, e
                    );
                    last_err = Some(e);
                    if attempt < FINALIZE_ATTEMPTS {
                        tokio::time::sleep(StdDuration::from_millis(200 * u64::from(attempt)))
                            .await;
                    }
                }
            }
        }

        Err(last_err
            .map(SettlementError::from)
            .unwrap_or_else(|| SettlementError::Database("finalize failed".to_string())))
    }

    /// Start the background scheduler loop.
    ///
    /// Ticks every `settlement_interval` seconds and runs a full pass.
    /// Runs forever; spawn it on its own task.
    pub async fn start(&self) {
        info!(
            "Starting settlement scheduler (interval: {}s)",
            self.config.settlement_interval
        );

        let mut ticker = interval(StdDuration::from_secs(self.config.settlement_interval));

        loop {
            ticker.tick().await;
            self.run_pass(Utc::now()).await;
        }
    }

    // ==========================================
    // HELPERS
    // ==========================================

    /// Evaluate derived fields for a page of records, skipping bad rows.
    fn evaluate_all(
        &self,
        records: &[InvestmentRecord],
        as_of: DateTime<Utc>,
    ) -> Vec<InvestmentResponse> {
        records
            .iter()
            .filter_map(|record| match engine::evaluate(record, as_of) {
                Ok(derived) => Some(InvestmentResponse::from_record(record, &derived)),
                Err(e) => {
                    warn!("Skipping investment {} in listing: {}", record.id, e);
                    None
                }
            })
            .collect()
    }

    /// Normalize page/limit against the configured maximum.
    fn clamp_page(&self, page: i64, limit: i64) -> (i64, i64) {
        let page = page.max(1);
        let limit = limit.clamp(1, self.config.max_page_size);
        (page, limit)
    }
}

/// Parse an optional status filter string.
fn parse_status_filter(
    status: Option<&str>,
) -> Result<Option<InvestmentStatus>, SettlementError> {
    match status {
        None | Some("") => Ok(None),
        Some(s) => InvestmentStatus::parse(s)
            .map(Some)
            .ok_or_else(|| SettlementError::UnknownStatus(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_filter() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(parse_status_filter(Some("")).unwrap(), None);
        assert_eq!(
            parse_status_filter(Some("active")).unwrap(),
            Some(InvestmentStatus::Active)
        );
        assert!(parse_status_filter(Some("archived")).is_err());
    }
}
