//! # Services Module
//!
//! This module contains the core business logic services for the
//! settlement backend. Each service handles a specific domain.
//!
//! ## Services Overview
//!
//! | Service | Responsibility |
//! |---------|---------------|
//! | `SettlementEngine` | Investment creation, admin writes, derived reads, the periodic settlement pass |
//! | `CommissionService` | Referral commission derivation, payout, listing, CSV export |
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SERVICES LAYER                            │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                   SettlementEngine                        │   │
//! │  │  • create_investment()   • list_investments()             │   │
//! │  │  • set_daily_return()    • set_manual_adjustment()        │   │
//! │  │  • set_status()          • portfolio()                    │   │
//! │  │  • run_pass() / start()  (background scheduler)           │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              │                                   │
//! │                              ▼                                   │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                  CommissionService                        │   │
//! │  │  • derive_for_investment()  • mark_paid()                 │   │
//! │  │  • list()                   • export_csv()                │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both services sit on the pure calculation core in `crate::engine`;
//! everything time-dependent takes an explicit `as_of` so the services
//! decide when "now" is sampled.

pub mod settlement;
pub mod commission;

pub use settlement::SettlementEngine;
pub use commission::CommissionService;
