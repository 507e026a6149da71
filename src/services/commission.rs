//! # Commission Service
//!
//! Derives, pays out and exports referral commissions.
//!
//! A commission is created exactly once, when a referred investment is
//! created. It is a pure snapshot: `investment_amount * rate / 100` at
//! the configured rate, never recomputed afterward. Later changes to the
//! rate configuration, the investment's effective daily return, or manual
//! earnings adjustments have no effect on already-derived commissions.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{
    queries, CommissionRecord, CommissionStatus, Database, DatabaseError, InvestmentRecord,
};
use crate::models::{CommissionListResponse, CommissionResponse};
use crate::utils::format_amount;

/// Errors that can occur in commission operations.
#[derive(Debug, thiserror::Error)]
pub enum CommissionError {
    /// Commission not found.
    #[error("Commission not found: {0}")]
    NotFound(Uuid),

    /// Payout requested for a commission that is already paid.
    #[error("Commission {0} is already paid")]
    AlreadyPaid(Uuid),

    /// Unrecognized status string in a request.
    #[error("Unknown commission status: {0}")]
    UnknownStatus(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// CSV serialization failed.
    #[error("Export failed: {0}")]
    Export(String),
}

impl From<DatabaseError> for CommissionError {
    fn from(e: DatabaseError) -> Self {
        CommissionError::Database(e.to_string())
    }
}

/// Service managing referral commissions.
#[derive(Clone)]
pub struct CommissionService {
    /// Database connection.
    db: Database,

    /// Application configuration.
    config: AppConfig,
}

impl CommissionService {
    /// Create a new CommissionService instance.
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self { db, config }
    }

    /// Derive the one-shot referral commission for a new investment.
    ///
    /// Returns the created record, or `None` when a commission for this
    /// investment already exists (the UNIQUE constraint makes re-derivation
    /// a no-op, so retried creations stay idempotent).
    pub async fn derive_for_investment(
        &self,
        investment: &InvestmentRecord,
        referrer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<CommissionRecord>, CommissionError> {
        let rate = self.config.referral_commission_rate;
        let record = CommissionRecord {
            id: Uuid::new_v4(),
            referrer_id,
            referee_id: investment.user_id,
            investment_id: investment.id,
            investment_amount: investment.amount,
            rate,
            amount: investment.amount * rate / rust_decimal::Decimal::ONE_HUNDRED,
            status: CommissionStatus::Pending,
            created_at: now,
            paid_at: None,
        };

        let inserted = queries::insert_commission(self.db.pool(), &record).await?;
        if inserted {
            info!(
                "Commission {} derived: {} ({}% of {}) for referrer {}",
                record.id, record.amount, rate, record.investment_amount, referrer_id
            );
            Ok(Some(record))
        } else {
            debug!(
                "Commission for investment {} already exists, skipping",
                investment.id
            );
            Ok(None)
        }
    }

    /// Mark a pending commission as paid.
    ///
    /// The write is guarded on `status = 'pending'`, so paying twice is
    /// rejected rather than overwriting the original payout timestamp.
    pub async fn mark_paid(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), CommissionError> {
        let rows = queries::mark_commission_paid(self.db.pool(), id, now).await?;
        if rows > 0 {
            info!("Commission {} marked paid", id);
            return Ok(());
        }

        // Zero rows: either the commission does not exist or it was paid
        // already. Distinguish for the API error.
        match queries::get_commission(self.db.pool(), id).await? {
            None => Err(CommissionError::NotFound(id)),
            Some(_) => Err(CommissionError::AlreadyPaid(id)),
        }
    }

    /// List commissions, filtered and paginated.
    pub async fn list(
        &self,
        status: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<CommissionListResponse, CommissionError> {
        let status = parse_status_filter(status)?;
        let page = page.max(1);
        let limit = limit.clamp(1, self.config.max_page_size);
        let offset = (page - 1) * limit;

        let records = queries::list_commissions(self.db.pool(), status, limit, offset).await?;
        let total = queries::count_commissions(self.db.pool(), status).await?;

        Ok(CommissionListResponse {
            items: records.iter().map(CommissionResponse::from).collect(),
            total,
            page,
            limit,
        })
    }

    /// Export commissions as CSV, oldest first.
    ///
    /// Column headers match the JSON field names of the listing endpoint
    /// so the admin console can reuse its mapping. Money cells are fixed
    /// two-decimal strings, timestamps RFC 3339.
    pub async fn export_csv(&self, status: Option<&str>) -> Result<Vec<u8>, CommissionError> {
        let status = parse_status_filter(status)?;
        let records = queries::list_commissions_for_export(self.db.pool(), status).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "id",
                "referrer",
                "referee",
                "investment",
                "investmentAmount",
                "rate",
                "amount",
                "status",
                "createdAt",
                "paidAt",
            ])
            .map_err(|e| CommissionError::Export(e.to_string()))?;

        for record in &records {
            writer
                .write_record([
                    record.id.to_string(),
                    record.referrer_id.to_string(),
                    record.referee_id.to_string(),
                    record.investment_id.to_string(),
                    format_amount(record.investment_amount),
                    record.rate.to_string(),
                    format_amount(record.amount),
                    record.status.as_str().to_string(),
                    record.created_at.to_rfc3339(),
                    record.paid_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                ])
                .map_err(|e| CommissionError::Export(e.to_string()))?;
        }

        if records.is_empty() {
            warn!("Commission export produced headers only (no matching records)");
        }

        writer
            .into_inner()
            .map_err(|e| CommissionError::Export(e.to_string()))
    }
}

/// Parse an optional status filter string.
fn parse_status_filter(
    status: Option<&str>,
) -> Result<Option<CommissionStatus>, CommissionError> {
    match status {
        None | Some("") => Ok(None),
        Some(s) => CommissionStatus::parse(s)
            .map(Some)
            .ok_or_else(|| CommissionError::UnknownStatus(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_status_filter() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(
            parse_status_filter(Some("pending")).unwrap(),
            Some(CommissionStatus::Pending)
        );
        assert!(parse_status_filter(Some("refunded")).is_err());
    }

    #[test]
    fn test_commission_amount_formula() {
        // 5% of 1000 = 50
        let amount = dec!(1000) * dec!(5) / rust_decimal::Decimal::ONE_HUNDRED;
        assert_eq!(amount, dec!(50));
    }
}
