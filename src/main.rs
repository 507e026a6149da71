//! # Subscription Settlement Backend Service
//!
//! This is the main entry point for the backend service that manages
//! subscription investments. It provides:
//!
//! - REST API for investment creation, admin overrides and portfolio reads
//! - Background settlement scheduler that matures due investments
//! - Referral commission derivation, payout tracking and CSV export
//! - PostgreSQL storage for investments, plans and commissions
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        BACKEND SERVICE                           │
//! │                                                                  │
//! │  ┌──────────────────────┐       ┌─────────────────────────────┐ │
//! │  │      REST API        │       │    Background Services      │ │
//! │  │      (Actix)         │       │  • Settlement scheduler     │ │
//! │  │                      │       │    (periodic maturity pass) │ │
//! │  │  /api/investments    │       │                             │ │
//! │  │  /api/admin/...      │       │                             │ │
//! │  └──────────────────────┘       └─────────────────────────────┘ │
//! │         │                                   │                    │
//! │         └───────────────┬───────────────────┘                    │
//! │  ┌──────────────────────┴───────────────────────────────────┐   │
//! │  │                    SERVICE LAYER                          │   │
//! │  │  ┌───────────────────┐   ┌────────────────────┐          │   │
//! │  │  │ SettlementEngine  │   │ CommissionService  │          │   │
//! │  │  └───────────────────┘   └────────────────────┘          │   │
//! │  └──────────────────────┬───────────────────────────────────┘   │
//! │  ┌──────────────────────┴───────────────────────────────────┐   │
//! │  │        PURE CORE (engine: accrual / adjustment /          │   │
//! │  │                   lifecycle state machine)                │   │
//! │  └──────────────────────┬───────────────────────────────────┘   │
//! │                  ┌──────┴──────┐                                 │
//! │                  │  PostgreSQL │                                 │
//! │                  └─────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! 1. Set up PostgreSQL and create the database
//! 2. Copy `.env.example` to `.env` and configure
//! 3. Start the server: `cargo run` (migrations run automatically)
//!
//! ## Environment Variables
//!
//! See `.env.example` for all required configuration.

use std::sync::Arc;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer, middleware};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod api;
mod config;
mod db;
mod engine;
mod models;
mod services;
mod utils;

use config::AppConfig;
use db::Database;
use services::{CommissionService, SettlementEngine};

/// Application state shared across all handlers.
///
/// This struct contains all the shared resources that API handlers
/// and background services need access to.
///
/// ## Why Arc?
/// `Arc` (Atomic Reference Counting) allows us to share ownership
/// of these resources across multiple threads safely.
pub struct AppState {
    /// Database connection pool for PostgreSQL
    pub db: Database,

    /// Investment creation, admin writes, derived reads, settlement pass
    pub settlement: SettlementEngine,

    /// Referral commission derivation, payout and export
    pub commissions: CommissionService,

    /// Application configuration
    pub config: AppConfig,
}

/// Main entry point for the backend service.
///
/// This function:
/// 1. Loads configuration from environment
/// 2. Initializes database connection and runs migrations
/// 3. Initializes the settlement and commission services
/// 4. Spawns the background settlement scheduler
/// 5. Launches the HTTP server
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // =========================================
    // STEP 1: Initialize Logging
    // =========================================
    // Set up structured logging with tracing
    // This gives us nice formatted logs with timestamps
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("🚀 Starting Subscription Settlement Backend Service");

    // =========================================
    // STEP 2: Load Configuration
    // =========================================
    // Load from environment variables (from .env file)
    dotenvy::dotenv().ok(); // It's okay if .env doesn't exist

    let config = AppConfig::from_env()
        .expect("Failed to load configuration");

    info!("📋 Configuration loaded");
    info!("   Settlement interval: {}s", config.settlement_interval);
    info!("   Referral commission rate: {}%", config.referral_commission_rate);

    // =========================================
    // STEP 3: Initialize Database
    // =========================================
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    info!("🗄️  Database connected");

    // Run migrations to ensure schema is up to date
    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    info!("📦 Database migrations complete");

    // =========================================
    // STEP 4: Initialize Services
    // =========================================
    let settlement = SettlementEngine::new(db.clone(), config.clone());
    let commissions = CommissionService::new(db.clone(), config.clone());

    info!("🔧 Services initialized");

    // =========================================
    // STEP 5: Create Application State
    // =========================================
    let app_state = Arc::new(AppState {
        db: db.clone(),
        settlement: settlement.clone(),
        commissions,
        config: config.clone(),
    });

    // =========================================
    // STEP 6: Start Background Scheduler
    // =========================================
    // Spawn the settlement scheduler in the background. It matures due
    // investments on its own tick; the API can also trigger a pass.
    tokio::spawn(async move {
        settlement.start().await;
    });

    info!("⏱️  Settlement scheduler started");

    // =========================================
    // STEP 7: Start HTTP Server
    // =========================================
    let server_host = config.server_host.clone();
    let server_port = config.server_port;

    info!("🌐 Starting HTTP server on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        // The admin console and client dashboard are browser apps served
        // from other origins.
        let cors = Cors::permissive();

        App::new()
            // Attach shared application state
            .app_data(web::Data::new(app_state.clone()))

            // Add logging middleware
            .wrap(middleware::Logger::default())
            .wrap(cors)

            // Configure API routes
            .configure(api::configure_routes)
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .run()
    .await
}
